//! Methods for reading and writing delimited (CSV/TSV) files while keeping track of all the
//! info needed to generate good error messages.

use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    ops::Range,
    path::Path,
    sync::Arc,
};

use context_error::{BoxedError, Context, CreateError};
use flate2::bufread::GzDecoder;
use itertools::Itertools;

use crate::{QuantError, QuantResult, helper_functions::check_extension};

/// A single line in a CSV file
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CsvLine {
    line_index: usize,
    line: String,
    fields: Vec<(Arc<String>, Range<usize>)>,
}

impl CsvLine {
    /// Get the line index (0 based)
    pub const fn line_index(&self) -> usize {
        self.line_index
    }

    /// Get the context applicable to the specified column
    pub fn column_context(&self, column: usize) -> Context<'static> {
        Context::line(
            Some(self.line_index as u32),
            &self.line,
            self.fields[column].1.start,
            self.fields[column].1.len(),
        )
        .to_owned()
    }

    /// Parse a numeric column, empty cells and cells containing `-` or `NaN` are missing values.
    /// # Errors
    /// If the cell is not empty and not a valid number.
    pub fn parse_optional_number(&self, column: usize) -> QuantResult<Option<f64>> {
        let text = self[column].trim();
        if text.is_empty() || text == "-" || text.eq_ignore_ascii_case("nan") {
            Ok(None)
        } else {
            text.parse::<f64>().map(Some).map_err(|err| {
                BoxedError::new(
                    QuantError::FileCouldNotBeParsed,
                    "Invalid number",
                    format!(
                        "The column '{}' should contain a number, but this could not be parsed: {err}",
                        self.fields[column].0
                    ),
                    self.column_context(column),
                )
            })
        }
    }
}

impl std::ops::Index<usize> for CsvLine {
    type Output = str;
    fn index(&self, index: usize) -> &str {
        &self.line[self.fields[index].1.clone()]
    }
}

/// Parse a CSV file into an iterator with the parsed lines. Files ending in `.gz` are
/// decompressed on the fly.
/// # Errors
/// If the file cannot be opened it returns `Err` with the error.
/// If any single line cannot be read it returns an error for that line.
pub fn parse_csv(
    path: impl AsRef<Path>,
    separator: u8,
) -> QuantResult<CsvLineIter<Box<dyn std::io::Read>>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        BoxedError::new(
            QuantError::FileCouldNotBeOpened,
            "Could not open file",
            e.to_string(),
            Context::default().source(path.to_string_lossy()).to_owned(),
        )
    })?;
    let reader: Box<dyn std::io::Read> = if check_extension(path, "gz") {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(file)
    };
    parse_csv_raw(reader, separator)
}

/// Parse a CSV file from a raw reader. A first line of the form `sep=;` overrides the separator.
/// # Errors
/// If the first line could not be read as a header line.
/// Or if the 'sep=C' uses a character that is more than 1 byte wide in utf8.
pub fn parse_csv_raw<T: std::io::Read>(
    reader: T,
    mut separator: u8,
) -> QuantResult<CsvLineIter<T>> {
    let reader = BufReader::new(reader);
    let mut lines = reader.lines().enumerate().peekable();
    if let Some(sep) = lines
        .peek()
        .and_then(|(_, l)| l.as_ref().ok())
        .and_then(|l| l.strip_prefix("sep="))
        .map(ToString::to_string)
    {
        if let Some(c) = sep.chars().next() {
            if c.len_utf8() == 1 {
                separator = c as u8;
            } else {
                return Err(BoxedError::new(
                    QuantError::FileCouldNotBeParsed,
                    "Unicode value separators not supported",
                    "This is a character that takes more than 1 byte to represent in Unicode, this is not supported in parsing CSV files.",
                    Context::line(Some(0), format!("sep={sep}"), 4, sep.len()).to_owned(),
                ));
            }
        }
        // Actually consume this line
        let _unused = lines.next();
    }
    let (_, header_line) = lines.next().ok_or_else(|| {
        BoxedError::small(
            QuantError::FileCouldNotBeParsed,
            "Could not parse csv file",
            "The file is empty",
        )
    })?;
    let header_line = header_line.map_err(|err| {
        BoxedError::small(
            QuantError::FileCouldNotBeParsed,
            "Could not read header line",
            err.to_string(),
        )
    })?;
    let header = csv_separate(&header_line, separator)?
        .into_iter()
        .map(|r| Arc::new(header_line[r].to_string()))
        .collect();

    Ok(CsvLineIter {
        lines,
        header,
        separator,
    })
}

/// An iterator returning CSV lines
#[derive(Debug)]
pub struct CsvLineIter<T: std::io::Read> {
    lines: std::iter::Peekable<std::iter::Enumerate<std::io::Lines<BufReader<T>>>>,
    header: Vec<Arc<String>>,
    separator: u8,
}

impl<T: std::io::Read> CsvLineIter<T> {
    /// The column headers
    pub fn header(&self) -> &[Arc<String>] {
        &self.header
    }
}

impl<T: std::io::Read> Iterator for CsvLineIter<T> {
    type Item = QuantResult<CsvLine>;
    fn next(&mut self) -> Option<Self::Item> {
        let (line_index, line) = loop {
            let (line_index, line) = self.lines.next()?;
            match line {
                Ok(line) if line.trim().is_empty() => (), // Skip empty lines
                Ok(line) => break (line_index, line),
                Err(err) => {
                    return Some(Err(BoxedError::new(
                        QuantError::FileCouldNotBeParsed,
                        "Could not read line",
                        err.to_string(),
                        Context::default().line_index(line_index as u32).to_owned(),
                    )));
                }
            }
        };
        Some(csv_separate(&line, self.separator).and_then(|row| {
            if self.header.len() == row.len() {
                Ok(CsvLine {
                    line_index,
                    line,
                    fields: self.header.iter().cloned().zip(row).collect(),
                })
            } else {
                Err(BoxedError::new(
                    QuantError::FileCouldNotBeParsed,
                    "Incorrect number of columns",
                    format!(
                        "It does not have the correct number of columns. {} columns were expected but {} were found.",
                        self.header.len(),
                        row.len()
                    ),
                    Context::full_line(line_index as u32, &line).to_owned(),
                ))
            }
        }))
    }
}

/// Split a line in the ranges for all fields, fields can be quoted with single or double quotes.
/// # Errors
/// If the line is empty.
pub(crate) fn csv_separate(line: &str, separator: u8) -> QuantResult<Vec<Range<usize>>> {
    if line.is_empty() {
        return Err(BoxedError::small(
            QuantError::FileCouldNotBeParsed,
            "Empty line",
            "The line is empty",
        ));
    }
    let mut enclosed = None;
    let mut was_enclosed = false;
    let mut row = Vec::new();
    let mut start = None;
    let mut last_non_whitespace = None;
    for (index, ch) in line.bytes().enumerate() {
        match (ch, enclosed, start) {
            (b'\"' | b'\'', None, None) => {
                enclosed = Some(ch);
                start = Some(index + 1);
            }
            (c, Some(e), Some(s)) if c == e => {
                enclosed = None;
                row.push(s..index);
                start = None;
                last_non_whitespace = None;
                was_enclosed = true;
            }
            (sep, None, Some(s)) if sep == separator => {
                if sep.is_ascii_whitespace() {
                    row.push(s..last_non_whitespace.unwrap_or(index));
                } else {
                    row.push(s..last_non_whitespace.unwrap_or(index).min(index));
                }
                start = None;
                last_non_whitespace = None;
                was_enclosed = false;
            }
            (sep, None, None) if sep == separator => {
                if !was_enclosed {
                    // An empty field, a separator directly after an enclosed field is skipped
                    row.push(index..index);
                }
                was_enclosed = false;
            }
            (c, None, _) if c.is_ascii_whitespace() => (),
            (_, _, None) => {
                start = Some(index);
                last_non_whitespace = Some(index + 1);
            }
            _ => last_non_whitespace = Some(index + 1),
        }
    }
    if let Some(s) = start {
        row.push(s..last_non_whitespace.unwrap_or(line.len()));
    } else if !was_enclosed {
        row.push(line.len()..line.len());
    }
    Ok(row)
}

/// Write a CSV file. It fills empty columns with empty space, ensures the correct amount of
/// columns on each line, and wraps any separator containing values and headers in double quotes
/// (") while replacing any double quotes in those fields with single quotes (').
/// # Errors
/// If the `Write` implementation errors.
pub fn write_csv(
    mut f: impl Write,
    data: impl IntoIterator<Item = impl IntoIterator<Item = (String, String)>>,
    separator: char,
) -> Result<(), std::io::Error> {
    let mut order: Vec<String> = Vec::new();
    let sorted: Vec<Vec<String>> = data
        .into_iter()
        .map(|row| {
            let mut new_row = vec![String::new(); order.len()];
            for (column, mut value) in row {
                if value.contains(separator) {
                    value = format!("\"{}\"", value.replace('\"', "\'"));
                }
                if let Some(index) = order.iter().position(|i| *i == column) {
                    new_row[index] = value;
                } else {
                    order.push(column);
                    new_row.push(value);
                }
            }
            new_row
        })
        .collect_vec();
    let separator = separator.to_string();
    writeln!(
        f,
        "{}",
        order
            .iter()
            .map(|column| if column.contains(&separator) {
                format!("\"{}\"", column.replace('\"', "\'"))
            } else {
                column.clone()
            })
            .join(&separator)
    )?;
    for row in sorted {
        let len = order.len() - row.len();
        writeln!(
            f,
            "{}",
            row.into_iter()
                .chain(std::iter::repeat_n(String::new(), len))
                .join(&separator)
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[expect(clippy::missing_panics_doc)]
mod tests {
    use super::*;

    #[test]
    fn separate_fields() {
        let line = "P1,\"K.AAK.C\",,12.5";
        let ranges = csv_separate(line, b',').unwrap();
        let fields = ranges.into_iter().map(|r| &line[r]).collect_vec();
        assert_eq!(fields, ["P1", "K.AAK.C", "", "12.5"]);
    }

    #[test]
    fn separate_trailing_empty() {
        let line = "a\tb\t";
        let fields = csv_separate(line, b'\t')
            .unwrap()
            .into_iter()
            .map(|r| &line[r])
            .collect_vec();
        assert_eq!(fields, ["a", "b", ""]);
    }

    #[test]
    fn parse_with_sep_line() {
        let text = "sep=;\nAccession;Area A\nP1;1.5\n\nP2;-\n";
        let lines = parse_csv_raw(text.as_bytes(), b',')
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(&lines[0][0], "P1");
        assert_eq!(lines[0].parse_optional_number(1).unwrap(), Some(1.5));
        assert_eq!(lines[1].parse_optional_number(1).unwrap(), None);
        assert_eq!(lines[1].line_index(), 4);
    }

    #[test]
    fn wrong_column_count() {
        let text = "a,b\n1,2,3\n";
        let mut lines = parse_csv_raw(text.as_bytes(), b',').unwrap();
        assert!(lines.next().unwrap().is_err());
    }

    #[test]
    fn invalid_number() {
        let text = "Area A\nabc\n";
        let line = parse_csv_raw(text.as_bytes(), b',')
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert!(line.parse_optional_number(0).is_err());
    }

    #[test]
    fn write_fills_columns() {
        let mut out = Vec::new();
        write_csv(
            &mut out,
            [
                vec![("a".to_string(), "1".to_string())],
                vec![
                    ("a".to_string(), "2".to_string()),
                    ("b".to_string(), "x,y".to_string()),
                ],
            ],
            ',',
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a,b\n1,\n2,\"x,y\"\n");
    }
}
