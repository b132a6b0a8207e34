//! A view on the rows of a single peptide of a [`Protein`].

use context_error::{BoxedError, Context, CreateError};

use crate::{
    ColumnKind, Protein, QuantError, QuantResult, QuantRow,
    helper_functions::{column_means, column_nonzero_counts},
};

/// A peptide of a protein, all rows of the protein with the same peptide sequence
#[derive(Clone, Debug)]
pub struct Peptide<'protein, 'table> {
    protein: &'protein Protein<'table>,
    sequence: String,
    rows: Vec<usize>,
}

impl<'protein, 'table> Peptide<'protein, 'table> {
    /// Select the rows of the protein with this peptide sequence.
    /// # Errors
    /// If the protein does not have any row with this peptide.
    pub fn new(protein: &'protein Protein<'table>, sequence: &str) -> QuantResult<Self> {
        let rows = protein.rows_with_peptide(sequence);
        if rows.is_empty() {
            Err(BoxedError::new(
                QuantError::NotFound,
                "Peptide not observed",
                format!("The peptide is not observed for protein {}", protein.id()),
                Context::show(sequence.to_string()),
            ))
        } else {
            Ok(Self::from_rows(protein, sequence, rows))
        }
    }

    pub(crate) fn from_rows(
        protein: &'protein Protein<'table>,
        sequence: &str,
        rows: Vec<usize>,
    ) -> Self {
        Self {
            protein,
            sequence: sequence.to_string(),
            rows,
        }
    }

    /// The protein this peptide belongs to
    pub const fn protein(&self) -> &'protein Protein<'table> {
        self.protein
    }

    /// The peptide sequence
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// The indices (in the table) of the rows of this peptide
    pub fn row_indices(&self) -> &[usize] {
        &self.rows
    }

    fn rows(&self) -> impl ExactSizeIterator<Item = &'table QuantRow> + '_ {
        let table = self.protein.table();
        self.rows.iter().map(move |index| &table.rows()[*index])
    }

    /// The first 0 based residue index where this peptide occurs in the protein sequence
    /// # Errors
    /// If the peptide does not occur in the protein sequence.
    pub fn start_position(&self) -> QuantResult<usize> {
        let protein = self.protein.sequence();
        protein
            .find(&self.sequence)
            .map(|offset| protein[..offset].chars().count())
            .ok_or_else(|| {
                BoxedError::new(
                    QuantError::NotFound,
                    "Peptide not in protein",
                    format!(
                        "The peptide does not occur in the sequence of protein {}",
                        self.protein.id()
                    ),
                    Context::show(self.sequence.clone()),
                )
            })
    }

    /// The 0 based residue index just after the end of this peptide in the protein sequence
    /// # Errors
    /// If the peptide does not occur in the protein sequence.
    pub fn end_position(&self) -> QuantResult<usize> {
        Ok(self.start_position()? + self.sequence.chars().count())
    }

    /// The residues of this peptide
    pub fn residue_array(&self) -> Vec<char> {
        self.sequence.chars().collect()
    }

    /// The mean of every area column, missing values count as zero
    pub fn mean_intensity(&self) -> Vec<f64> {
        column_means(
            self.rows(),
            ColumnKind::Area,
            self.protein.table().area_columns().len(),
        )
    }

    /// Check if exactly one area column has a nonzero value for this peptide
    pub fn is_unique(&self) -> bool {
        let counts = column_nonzero_counts(
            self.rows(),
            ColumnKind::Area,
            self.protein.table().area_columns().len(),
        );
        counts.into_iter().filter(|count| *count > 0).count() == 1
    }

    /// The area values of the first row of this peptide
    pub fn area_per_sample(&self) -> Vec<Option<f64>> {
        self.rows()
            .next()
            .map_or_else(Vec::new, |row| row.areas.clone())
    }
}

impl std::fmt::Display for Peptide<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} ({})", self.sequence, self.protein.id())?;
        self.protein.table().write_rows(f, &self.rows)
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::float_cmp)]
mod tests {
    use context_error::*;

    use super::*;
    use crate::{QuantitationTable, SequenceRecord};

    fn table() -> QuantitationTable {
        let row = |peptide: &str, areas: [Option<f64>; 3]| {
            QuantRow::new("P1", peptide, areas.to_vec(), Vec::new(), Vec::new())
        };
        QuantitationTable::new(
            vec!["Area A".to_string(), "Area B".to_string(), "Area C".to_string()],
            Vec::new(),
            Vec::new(),
            vec![
                row("CCK", [Some(120.0), Some(0.0), None]),
                row("DDK", [Some(120.0), Some(80.0), Some(0.0)]),
                row("WWK", [Some(1.0), None, None]),
                row("CCK", [Some(60.0), None, None]),
            ],
        )
        .unwrap()
    }

    fn protein(table: &QuantitationTable) -> Protein<'_> {
        Protein::with_record(table, "P1", SequenceRecord::new("sp|P1|TEST", "AAKCCKDDKCCK"))
    }

    #[test]
    fn positions() {
        let table = table();
        let protein = protein(&table);
        let peptide = protein.peptide("CCK").unwrap();
        assert_eq!(peptide.start_position().unwrap(), 3);
        assert_eq!(peptide.end_position().unwrap(), 6);
        assert_eq!(peptide.residue_array(), ['C', 'C', 'K']);
        let dd = protein.peptide("DDK").unwrap();
        assert_eq!(dd.end_position().unwrap() - dd.start_position().unwrap(), 3);
        assert!(
            protein
                .peptide("WWK")
                .unwrap()
                .start_position()
                .is_err_and(|e| matches!(e.get_kind(), QuantError::NotFound))
        );
        assert!(protein.peptide("WWK").unwrap().end_position().is_err());
    }

    #[test]
    fn not_observed() {
        let table = table();
        let protein = protein(&table);
        assert!(
            protein
                .peptide("AAK")
                .is_err_and(|e| matches!(e.get_kind(), QuantError::NotFound))
        );
    }

    #[test]
    fn intensities() {
        let table = table();
        let protein = protein(&table);
        let peptide = protein.peptide("CCK").unwrap();
        assert_eq!(peptide.row_indices(), [0, 3]);
        assert_eq!(peptide.mean_intensity(), [90.0, 0.0, 0.0]);
        assert_eq!(peptide.area_per_sample(), [Some(120.0), Some(0.0), None]);
        assert!(peptide.is_unique());
        assert!(!protein.peptide("DDK").unwrap().is_unique());
        assert_eq!(protein.peptides().len(), 3);
        assert!(peptide.to_string().starts_with("CCK (P1)\n"));
    }
}
