//! The in memory quantitation table, the shared store all protein and peptide views point into.

use std::collections::{BTreeMap, BTreeSet};

use context_error::{BoxedError, Context, CreateError};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{QuantError, QuantResult};

/// The kind of a numeric sample column.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum ColumnKind {
    /// Area under the curve of the precursor
    Area,
    /// The number of spectra matched
    SpectralCount,
    /// The search engine confidence score (-10lgP for PEAKS)
    Confidence,
}

impl ColumnKind {
    /// All kinds, in the order they are stored in a [`QuantRow`].
    pub const ALL: [Self; 3] = [Self::Area, Self::SpectralCount, Self::Confidence];
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Area => "area",
                Self::SpectralCount => "spectral count",
                Self::Confidence => "confidence",
            }
        )
    }
}

/// Which column headers of a result file hold what data. The key columns are matched on the
/// full header, the sample columns on a prefix of the header. All matching ignores case.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableLayout {
    /// Headers of the protein accession column
    pub accession: Vec<String>,
    /// Headers of the peptide sequence column
    pub peptide: Vec<String>,
    /// Prefixes of the area columns
    pub area: Vec<String>,
    /// Prefixes of the spectral count columns
    pub spectral_count: Vec<String>,
    /// Prefixes of the confidence columns
    pub confidence: Vec<String>,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            accession: vec!["Accession".to_string(), "Protein Accession".to_string()],
            peptide: vec!["Peptide".to_string()],
            area: vec!["Area".to_string()],
            spectral_count: vec!["Spectral".to_string(), "#Spectra".to_string()],
            confidence: vec!["-10lgP".to_string()],
        }
    }
}

impl TableLayout {
    /// See if this header is the accession column
    pub fn is_accession(&self, header: &str) -> bool {
        self.accession
            .iter()
            .any(|name| name.eq_ignore_ascii_case(header.trim()))
    }

    /// See if this header is the peptide column
    pub fn is_peptide(&self, header: &str) -> bool {
        self.peptide
            .iter()
            .any(|name| name.eq_ignore_ascii_case(header.trim()))
    }

    /// Determine the kind of sample column, if the header does not match any prefix this is not
    /// a numeric sample column and it will be ignored.
    pub fn classify(&self, header: &str) -> Option<ColumnKind> {
        let header = header.trim();
        let matches = |prefixes: &[String]| {
            prefixes.iter().any(|prefix| {
                header
                    .get(..prefix.len())
                    .is_some_and(|start| start.eq_ignore_ascii_case(prefix))
            })
        };
        if self.is_accession(header) || self.is_peptide(header) {
            None
        } else if matches(&self.confidence) {
            Some(ColumnKind::Confidence)
        } else if matches(&self.spectral_count) {
            Some(ColumnKind::SpectralCount)
        } else if matches(&self.area) {
            Some(ColumnKind::Area)
        } else {
            None
        }
    }
}

/// A single observation of a peptide for a protein, with one value per sample column.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct QuantRow {
    /// The protein accession
    pub accession: String,
    /// The peptide sequence
    pub peptide: String,
    /// One value per area column of the table
    pub areas: Vec<Option<f64>>,
    /// One value per spectral count column of the table
    pub spectral_counts: Vec<Option<f64>>,
    /// One value per confidence column of the table
    pub confidences: Vec<Option<f64>>,
}

impl QuantRow {
    /// Create a new row
    pub fn new(
        accession: impl Into<String>,
        peptide: impl Into<String>,
        areas: Vec<Option<f64>>,
        spectral_counts: Vec<Option<f64>>,
        confidences: Vec<Option<f64>>,
    ) -> Self {
        Self {
            accession: accession.into(),
            peptide: peptide.into(),
            areas,
            spectral_counts,
            confidences,
        }
    }

    /// Get the values for the given kind of column
    pub fn values(&self, kind: ColumnKind) -> &[Option<f64>] {
        match kind {
            ColumnKind::Area => &self.areas,
            ColumnKind::SpectralCount => &self.spectral_counts,
            ColumnKind::Confidence => &self.confidences,
        }
    }

    fn values_mut(&mut self, kind: ColumnKind) -> &mut Vec<Option<f64>> {
        match kind {
            ColumnKind::Area => &mut self.areas,
            ColumnKind::SpectralCount => &mut self.spectral_counts,
            ColumnKind::Confidence => &mut self.confidences,
        }
    }
}

/// An immutable table of quantitation rows. The names of the sample columns are stored once on
/// the table, every row stores its values in the same column order.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "UncheckedTable")]
pub struct QuantitationTable {
    area_columns: Vec<String>,
    spectral_count_columns: Vec<String>,
    confidence_columns: Vec<String>,
    rows: Vec<QuantRow>,
}

/// The serialised form of a table, only turned into a table after checking the row widths.
#[derive(Deserialize)]
struct UncheckedTable {
    area_columns: Vec<String>,
    spectral_count_columns: Vec<String>,
    confidence_columns: Vec<String>,
    rows: Vec<QuantRow>,
}

impl TryFrom<UncheckedTable> for QuantitationTable {
    type Error = BoxedError<'static, QuantError>;

    fn try_from(value: UncheckedTable) -> Result<Self, Self::Error> {
        Self::new(
            value.area_columns,
            value.spectral_count_columns,
            value.confidence_columns,
            value.rows,
        )
    }
}

impl QuantitationTable {
    /// Create a table out of the column names and rows.
    /// # Errors
    /// If a column name occurs twice for the same kind of column, or if any row does not have
    /// exactly one value for each column.
    pub fn new(
        area_columns: Vec<String>,
        spectral_count_columns: Vec<String>,
        confidence_columns: Vec<String>,
        rows: Vec<QuantRow>,
    ) -> QuantResult<Self> {
        let table = Self {
            area_columns,
            spectral_count_columns,
            confidence_columns,
            rows,
        };
        for kind in ColumnKind::ALL {
            if let Some(name) = table.columns(kind).iter().duplicates().next() {
                return Err(BoxedError::new(
                    QuantError::InvalidTable,
                    "Duplicate column",
                    format!("The {kind} column '{name}' occurs more than once"),
                    Context::show(name.clone()),
                ));
            }
        }
        for (index, row) in table.rows.iter().enumerate() {
            for kind in ColumnKind::ALL {
                if row.values(kind).len() != table.columns(kind).len() {
                    return Err(BoxedError::new(
                        QuantError::InvalidTable,
                        "Invalid quantitation row",
                        format!(
                            "Row {index} ({} {}) has {} {kind} values but the table has {} {kind} columns",
                            row.accession,
                            row.peptide,
                            row.values(kind).len(),
                            table.columns(kind).len(),
                        ),
                        Context::none(),
                    ));
                }
            }
        }
        Ok(table)
    }

    /// The names of the columns of the given kind, in order
    pub fn columns(&self, kind: ColumnKind) -> &[String] {
        match kind {
            ColumnKind::Area => &self.area_columns,
            ColumnKind::SpectralCount => &self.spectral_count_columns,
            ColumnKind::Confidence => &self.confidence_columns,
        }
    }

    /// The names of the area columns, in order
    pub fn area_columns(&self) -> &[String] {
        &self.area_columns
    }

    /// The names of the spectral count columns, in order
    pub fn spectral_count_columns(&self) -> &[String] {
        &self.spectral_count_columns
    }

    /// The names of the confidence columns, in order
    pub fn confidence_columns(&self) -> &[String] {
        &self.confidence_columns
    }

    /// All rows
    pub fn rows(&self) -> &[QuantRow] {
        &self.rows
    }

    /// Get a single row
    pub fn row(&self, index: usize) -> Option<&QuantRow> {
        self.rows.get(index)
    }

    /// The number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All distinct accessions in order of first appearance
    pub fn accessions(&self) -> Vec<&str> {
        self.rows
            .iter()
            .map(|row| row.accession.as_str())
            .unique()
            .collect()
    }

    /// The indices of the rows with this accession
    pub fn indices_of(&self, accession: &str) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| (row.accession == accession).then_some(index))
            .collect()
    }

    /// Stack multiple tables, for example multiple result files from one experimental group. The
    /// columns are the union of all columns (by name, in order of first appearance), rows without
    /// a certain column get a missing value for that column.
    pub fn concatenate(tables: impl IntoIterator<Item = Self>) -> Self {
        let tables = tables.into_iter().collect_vec();
        let mut result = Self::default();
        for kind in ColumnKind::ALL {
            *result.columns_mut(kind) = tables
                .iter()
                .flat_map(|table| table.columns(kind).iter().cloned())
                .unique()
                .collect();
        }
        for table in tables {
            let mapping = ColumnKind::ALL.map(|kind| {
                table
                    .columns(kind)
                    .iter()
                    .map(|name| result.columns(kind).iter().position(|n| n == name))
                    .collect_vec()
            });
            for mut row in table.rows {
                for (kind, mapping) in ColumnKind::ALL.into_iter().zip(&mapping) {
                    let mut values = vec![None; result.columns(kind).len()];
                    for (value, target) in row.values(kind).iter().zip(mapping) {
                        if let Some(target) = target {
                            values[*target] = *value;
                        }
                    }
                    *row.values_mut(kind) = values;
                }
                result.rows.push(row);
            }
        }
        result
    }

    /// Combine the tables of two experimental groups with a full outer join on (accession,
    /// peptide). Sample columns that exist in both tables get the respective suffix, the others
    /// keep their name. The columns of `left` come before those of `right`. The resulting rows
    /// are ordered on (accession, peptide), a key present in only one table gets missing values
    /// for the columns of the other table. A key that is present multiple times in a table
    /// results in all combinations of the matching rows of both tables.
    pub fn merge<'a>(left: &'a Self, right: &'a Self, suffixes: (&str, &str)) -> Self {
        let mut result = Self::default();
        for kind in ColumnKind::ALL {
            let (l, r) = (left.columns(kind), right.columns(kind));
            let suffixed = |names: &[String], other: &[String], suffix: &str| {
                names
                    .iter()
                    .map(|name| {
                        if other.contains(name) {
                            format!("{name}{suffix}")
                        } else {
                            name.clone()
                        }
                    })
                    .collect_vec()
            };
            let mut columns = suffixed(l, r, suffixes.0);
            columns.extend(suffixed(r, l, suffixes.1));
            *result.columns_mut(kind) = columns;
        }

        let group = |table: &'_ Self| {
            let mut map: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
            for (index, row) in table.rows.iter().enumerate() {
                map.entry((row.accession.clone(), row.peptide.clone()))
                    .or_default()
                    .push(index);
            }
            map
        };
        let left_groups = group(left);
        let right_groups = group(right);
        let keys: BTreeSet<&(String, String)> =
            left_groups.keys().chain(right_groups.keys()).collect();

        for key in keys {
            let options = |groups: &BTreeMap<(String, String), Vec<usize>>, table: &'a Self| {
                groups.get(key).map_or_else(
                    || vec![None],
                    |indices| indices.iter().map(|i| Some(&table.rows[*i])).collect_vec(),
                )
            };
            for (l, r) in options(&left_groups, left)
                .into_iter()
                .cartesian_product(options(&right_groups, right))
            {
                let mut row = QuantRow {
                    accession: key.0.clone(),
                    peptide: key.1.clone(),
                    ..QuantRow::default()
                };
                for kind in ColumnKind::ALL {
                    let half = |side: Option<&QuantRow>, table: &Self| {
                        side.map_or_else(
                            || vec![None; table.columns(kind).len()],
                            |row| row.values(kind).to_vec(),
                        )
                    };
                    let mut values = half(l, left);
                    values.extend(half(r, right));
                    *row.values_mut(kind) = values;
                }
                result.rows.push(row);
            }
        }
        result
    }

    fn columns_mut(&mut self, kind: ColumnKind) -> &mut Vec<String> {
        match kind {
            ColumnKind::Area => &mut self.area_columns,
            ColumnKind::SpectralCount => &mut self.spectral_count_columns,
            ColumnKind::Confidence => &mut self.confidence_columns,
        }
    }

    /// Write the given rows as a tab separated table, with missing values shown as `NaN`.
    pub(crate) fn write_rows(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        indices: &[usize],
    ) -> std::fmt::Result {
        let columns = ColumnKind::ALL
            .iter()
            .flat_map(|kind| self.columns(*kind))
            .join("\t");
        writeln!(f, "\tAccession\tPeptide\t{columns}")?;
        for index in indices {
            let row = &self.rows[*index];
            let values = ColumnKind::ALL
                .iter()
                .flat_map(|kind| row.values(*kind))
                .map(|value| value.map_or_else(|| "NaN".to_string(), |v| v.to_string()))
                .join("\t");
            writeln!(f, "{index}\t{}\t{}\t{values}", row.accession, row.peptide)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for QuantitationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_rows(f, &(0..self.rows.len()).collect_vec())
    }
}
