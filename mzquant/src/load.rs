//! Build a [`QuantitationTable`] out of the delimited exports of a search engine.
//!
//! Every file needs an accession and a peptide column, all other columns are classified with a
//! [`TableLayout`]. Columns that are not recognised are ignored.

use std::path::Path;

use context_error::{BoxedError, Context, CreateError};
use itertools::Itertools;

use crate::{
    ColumnKind, QuantError, QuantResult, QuantRow, QuantitationTable, TableLayout,
    csv::{CsvLine, parse_csv, parse_csv_raw},
    helper_functions::check_extension,
};

/// Read a single result file. Files ending in `.tsv`, `.tab` or `.txt` (optionally followed by
/// `.gz`) are read as tab separated, all others as comma separated. A first line of `sep=C`
/// overrides the separator.
/// # Errors
/// If the file could not be opened or read, if it lacks the accession or peptide column, or if
/// any numeric cell could not be parsed.
pub fn read_file(path: impl AsRef<Path>, layout: &TableLayout) -> QuantResult<QuantitationTable> {
    let path = path.as_ref();
    log::debug!("Reading quantitation table {}", path.display());
    let lines = parse_csv(path, separator_for(path))?;
    let header = lines.header().iter().map(|h| h.to_string()).collect_vec();
    build_table(&header, lines, layout, &path.to_string_lossy())
}

/// Read a result table from any reader with the given separator.
/// # Errors
/// If the data could not be read, if it lacks the accession or peptide column, or if any numeric
/// cell could not be parsed.
pub fn read_reader(
    reader: impl std::io::Read,
    separator: u8,
    layout: &TableLayout,
) -> QuantResult<QuantitationTable> {
    let lines = parse_csv_raw(reader, separator)?;
    let header = lines.header().iter().map(|h| h.to_string()).collect_vec();
    build_table(&header, lines, layout, "")
}

/// Read all result files of one experimental group and stack them in a single table, see
/// [`QuantitationTable::concatenate`].
/// # Errors
/// If any of the files gives an error, see [`read_file`].
pub fn read_files(
    paths: impl IntoIterator<Item = impl AsRef<Path>>,
    layout: &TableLayout,
) -> QuantResult<QuantitationTable> {
    let tables = paths
        .into_iter()
        .map(|path| read_file(path, layout))
        .collect::<QuantResult<Vec<_>>>()?;
    Ok(QuantitationTable::concatenate(tables))
}

fn separator_for(path: &Path) -> u8 {
    let path = if check_extension(path, "gz") {
        path.with_extension("")
    } else {
        path.to_path_buf()
    };
    if ["tsv", "tab", "txt"]
        .iter()
        .any(|extension| check_extension(&path, extension))
    {
        b'\t'
    } else {
        b','
    }
}

fn build_table(
    header: &[String],
    lines: impl Iterator<Item = QuantResult<CsvLine>>,
    layout: &TableLayout,
    source: &str,
) -> QuantResult<QuantitationTable> {
    let find = |name: &str, is: &dyn Fn(&str) -> bool| {
        header.iter().position(|h| is(h)).ok_or_else(|| {
            BoxedError::new(
                QuantError::MissingColumn,
                format!("Missing {name} column"),
                format!(
                    "None of the columns is recognised as the {name} column, the columns are: {}",
                    header.iter().join(", ")
                ),
                Context::default().source(source.to_string()).to_owned(),
            )
        })
    };
    let accession = find("accession", &|h: &str| layout.is_accession(h))?;
    let peptide = find("peptide", &|h: &str| layout.is_peptide(h))?;

    let classified = header
        .iter()
        .enumerate()
        .filter_map(|(index, h)| layout.classify(h).map(|kind| (index, kind)))
        .collect_vec();
    let columns = ColumnKind::ALL.map(|kind| {
        classified
            .iter()
            .filter(|(_, k)| *k == kind)
            .map(|(index, _)| *index)
            .collect_vec()
    });
    let names = |kind: usize| {
        columns[kind]
            .iter()
            .map(|index| header[*index].trim().to_string())
            .collect_vec()
    };

    let mut rows = Vec::new();
    for line in lines {
        let line = line?;
        let values = |kind: usize| {
            columns[kind]
                .iter()
                .map(|index| line.parse_optional_number(*index))
                .collect::<QuantResult<Vec<_>>>()
        };
        rows.push(QuantRow::new(
            line[accession].trim(),
            line[peptide].trim(),
            values(0)?,
            values(1)?,
            values(2)?,
        ));
    }
    log::debug!(
        "Read {} rows with {} area, {} spectral count, and {} confidence columns",
        rows.len(),
        columns[0].len(),
        columns[1].len(),
        columns[2].len()
    );
    QuantitationTable::new(names(0), names(1), names(2), rows)
}
