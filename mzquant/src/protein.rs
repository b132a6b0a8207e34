//! A view on all rows of a single protein in a [`QuantitationTable`].

use std::sync::Arc;

use context_error::{BoxedError, Context, CreateError};
use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::{
    ColumnKind, Peptide, QuantError, QuantResult, QuantRow, QuantitationTable,
    RetentionTimePredictor, SequenceCache, SequenceRecord, SequenceSource, TrivialNameParser,
    helper_functions::{column_means, column_nonzero_counts, column_sums, mean_of_present},
    protease::known_proteases,
};

/// A protein, all rows of a table with the same accession together with the sequence record of
/// that accession. This only stores the indices of its rows, so building many proteins over one
/// table is cheap.
#[derive(Clone, Debug)]
pub struct Protein<'table> {
    table: &'table QuantitationTable,
    accession: String,
    rows: Vec<usize>,
    record: Arc<SequenceRecord>,
}

impl<'table> Protein<'table> {
    /// Select the rows of this accession and retrieve its sequence record via the cache.
    /// # Errors
    /// If the sequence record could not be retrieved, see [`SequenceCache::get`].
    pub fn new<S: SequenceSource>(
        table: &'table QuantitationTable,
        accession: &str,
        cache: &mut SequenceCache<S>,
    ) -> QuantResult<Self> {
        let record = cache.get(accession)?;
        Ok(Self::with_record(table, accession, record))
    }

    /// Select the rows of this accession and use the given sequence record.
    pub fn with_record(
        table: &'table QuantitationTable,
        accession: &str,
        record: impl Into<Arc<SequenceRecord>>,
    ) -> Self {
        Self {
            table,
            accession: accession.to_string(),
            rows: table.indices_of(accession),
            record: record.into(),
        }
    }

    /// The accession
    pub fn id(&self) -> &str {
        &self.accession
    }

    /// The table this protein is a view on
    pub const fn table(&self) -> &'table QuantitationTable {
        self.table
    }

    /// The sequence record
    pub fn record(&self) -> &SequenceRecord {
        &self.record
    }

    /// The shared sequence record, to build views of the same protein on other tables
    pub fn shared_record(&self) -> Arc<SequenceRecord> {
        Arc::clone(&self.record)
    }

    /// The full protein sequence
    pub fn sequence(&self) -> &str {
        self.record.sequence()
    }

    /// The short display name, see [`TrivialNameParser`]
    pub fn trivial_name(&self, parser: TrivialNameParser) -> &str {
        parser.name(&self.record)
    }

    /// The indices (in the table) of the rows of this protein
    pub fn row_indices(&self) -> &[usize] {
        &self.rows
    }

    /// The rows of this protein
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &'table QuantRow> + '_ {
        let table = self.table;
        self.rows.iter().map(move |index| &table.rows()[*index])
    }

    /// The sum of every area column, missing values count as zero
    pub fn area_sum(&self) -> Vec<f64> {
        self.sums(ColumnKind::Area)
    }

    /// The mean of every area column, missing values count as zero
    pub fn area_mean(&self) -> Vec<f64> {
        self.means(ColumnKind::Area)
    }

    /// The sum of every spectral count column, missing values count as zero
    pub fn spectral_count_sum(&self) -> Vec<f64> {
        self.sums(ColumnKind::SpectralCount)
    }

    /// The mean of every spectral count column, missing values count as zero
    pub fn spectral_count_mean(&self) -> Vec<f64> {
        self.means(ColumnKind::SpectralCount)
    }

    /// The mean of every confidence column over the rows that have a value, `None` if no row
    /// has a value.
    pub fn confidence_mean(&self) -> Vec<Option<f64>> {
        (0..self.table.confidence_columns().len())
            .map(|column| mean_of_present(self.rows().map(|row| row.confidences[column])))
            .collect()
    }

    /// The number of rows with a nonzero area, for every area column
    pub fn peptide_count(&self) -> Vec<usize> {
        column_nonzero_counts(
            self.rows(),
            ColumnKind::Area,
            self.table.area_columns().len(),
        )
    }

    /// The fold change between the first two area columns of the three most intense rows. The
    /// rows are sorted on the area columns in column order (descending, missing as zero). The
    /// mean of the fold changes skips any undefined (0/0) fold change. An infinite mean is
    /// returned as 0 and a negative mean `m` as `-1/m`. If none of the fold changes is defined
    /// the result is NaN.
    /// # Errors
    /// If the table has fewer than two area columns.
    pub fn top_three_fold_change(&self) -> QuantResult<f64> {
        if self.table.area_columns().len() < 2 {
            return Err(BoxedError::new(
                QuantError::MissingColumn,
                "Not enough area columns",
                format!(
                    "The top three fold change needs at least two area columns but the table has {}",
                    self.table.area_columns().len()
                ),
                Context::show(self.accession.clone()),
            ));
        }
        let areas = |row: &QuantRow| {
            row.areas
                .iter()
                .map(|area| OrderedFloat(area.unwrap_or_default()))
                .collect_vec()
        };
        let fold_changes = self
            .rows()
            .sorted_by_cached_key(|row| std::cmp::Reverse(areas(row)))
            .take(3)
            .map(|row| {
                let (first, second) = (
                    row.areas[0].unwrap_or_default(),
                    row.areas[1].unwrap_or_default(),
                );
                first / second
            })
            .collect_vec();
        let mean = mean_of_present(
            fold_changes
                .iter()
                .map(|fold_change| (!fold_change.is_nan()).then_some(*fold_change)),
        )
        .unwrap_or(f64::NAN);
        log::debug!(
            "Top three fold changes for {}: {fold_changes:?} mean {mean}",
            self.accession
        );
        // A NaN mean passes through both cases unchanged
        Ok(if mean.is_infinite() && mean > 0.0 {
            0.0
        } else if mean < 0.0 {
            -1.0 / mean
        } else {
            mean
        })
    }

    /// The distinct peptide sequences of this protein, in order of first appearance
    pub fn peptide_sequences(&self) -> Vec<&'table str> {
        self.rows().map(|row| row.peptide.as_str()).unique().collect()
    }

    /// A view for every distinct peptide of this protein, in order of first appearance
    pub fn peptides(&self) -> Vec<Peptide<'_, 'table>> {
        self.peptide_sequences()
            .into_iter()
            .map(|sequence| Peptide::from_rows(self, sequence, self.rows_with_peptide(sequence)))
            .collect()
    }

    /// A view for a single peptide of this protein
    /// # Errors
    /// If there is no row for this peptide, see [`Peptide::new`].
    pub fn peptide(&self, sequence: &str) -> QuantResult<Peptide<'_, 'table>> {
        Peptide::new(self, sequence)
    }

    pub(crate) fn rows_with_peptide(&self, sequence: &str) -> Vec<usize> {
        self.rows
            .iter()
            .copied()
            .filter(|index| self.table.rows()[*index].peptide == sequence)
            .collect()
    }

    /// The range of predicted retention times of the observed peptides of this protein
    /// # Errors
    /// If this protein has no rows.
    pub fn retention_window(
        &self,
        predictor: &impl RetentionTimePredictor,
    ) -> QuantResult<(f64, f64)> {
        self.peptide_sequences()
            .into_iter()
            .map(|sequence| OrderedFloat(predictor.predict(sequence)))
            .minmax()
            .into_option()
            .map(|(min, max)| (min.0, max.0))
            .ok_or_else(|| {
                BoxedError::new(
                    QuantError::EmptyInput,
                    "No observed peptides",
                    "A retention time window needs at least one observed peptide",
                    Context::show(self.accession.clone()),
                )
            })
    }

    /// The distinct tryptic peptides (no missed cleavages) of the protein sequence with a
    /// predicted retention time strictly inside the [`Self::retention_window`].
    /// # Errors
    /// If this protein has no rows.
    pub fn observable_peptides(
        &self,
        predictor: &impl RetentionTimePredictor,
    ) -> QuantResult<Vec<&str>> {
        let (min, max) = self.retention_window(predictor)?;
        Ok(known_proteases::TRYPSIN
            .unique_digest(self.sequence(), 0, ..)
            .into_iter()
            .filter(|peptide| {
                let time = predictor.predict(peptide);
                min < time && time < max
            })
            .collect())
    }

    /// The exponentially modified protein abundance index for every area column:
    /// `base ^ (peptide count / number of distinct tryptic peptides) - 1`.
    ///
    /// The tryptic peptides that are observable according to the retention time window are
    /// determined, but the ratio uses all distinct tryptic peptides.
    /// # Errors
    /// If this protein has no rows, or if the sequence does not give any tryptic peptide.
    pub fn empai(
        &self,
        base: f64,
        predictor: &impl RetentionTimePredictor,
    ) -> QuantResult<Vec<f64>> {
        let observable = self.observable_peptides(predictor)?;
        let tryptic = known_proteases::TRYPSIN.unique_digest(self.sequence(), 0, ..);
        if tryptic.is_empty() {
            return Err(BoxedError::new(
                QuantError::EmptyInput,
                "No tryptic peptides",
                "The protein sequence is empty so there are no tryptic peptides",
                Context::show(self.accession.clone()),
            ));
        }
        // The observable peptides are only reported, the ratio is over all tryptic peptides
        log::debug!(
            "{}: {} of {} tryptic peptides are observable",
            self.accession,
            observable.len(),
            tryptic.len()
        );
        let total = tryptic.len() as f64;
        Ok(self
            .peptide_count()
            .into_iter()
            .map(|count| base.powf(count as f64 / total) - 1.0)
            .collect())
    }

    /// The ratio of this protein's area sums to another protein's area sums, the area columns
    /// are matched on name. An area column that the other protein does not have gives NaN.
    pub fn fold_change(&self, other: &Protein<'_>) -> Vec<f64> {
        let own = self.area_sum();
        let others = other.area_sum();
        self.table
            .area_columns()
            .iter()
            .zip(own)
            .map(|(name, sum)| {
                other
                    .table
                    .area_columns()
                    .iter()
                    .position(|n| n == name)
                    .map_or(f64::NAN, |index| sum / others[index])
            })
            .collect()
    }

    fn sums(&self, kind: ColumnKind) -> Vec<f64> {
        column_sums(self.rows(), kind, self.table.columns(kind).len())
    }

    fn means(&self, kind: ColumnKind) -> Vec<f64> {
        column_means(self.rows(), kind, self.table.columns(kind).len())
    }
}

impl std::fmt::Display for Protein<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.record.header())?;
        self.table.write_rows(f, &self.rows)
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::float_cmp)]
mod tests {
    use context_error::*;

    use super::*;
    use crate::AdditiveRetentionModel;

    fn table(rows: &[(&str, &str, [Option<f64>; 2])]) -> QuantitationTable {
        QuantitationTable::new(
            vec!["Area S1".to_string(), "Area S2".to_string()],
            vec!["#Spectra S1".to_string(), "#Spectra S2".to_string()],
            vec!["-10lgP".to_string()],
            rows.iter()
                .map(|(accession, peptide, areas)| {
                    QuantRow::new(
                        *accession,
                        *peptide,
                        areas.to_vec(),
                        areas.iter().map(|a| a.map(|_| 1.0)).collect(),
                        vec![areas[0].map(|_| 50.0)],
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    fn record(sequence: &str) -> SequenceRecord {
        SequenceRecord::new(">sp|P1|TEST_HUMAN Test", sequence)
    }

    #[test]
    fn aggregations() {
        let table = table(&[
            ("P1", "AAK", [Some(100.0), Some(50.0)]),
            ("P2", "CCK", [Some(7.0), Some(7.0)]),
            ("P1", "DDK", [None, Some(30.0)]),
        ]);
        let protein = Protein::with_record(&table, "P1", record("AAKDDK"));
        assert_eq!(protein.row_indices(), [0, 2]);
        assert_eq!(protein.area_sum(), [100.0, 80.0]);
        assert_eq!(protein.area_mean(), [50.0, 40.0]);
        assert_eq!(protein.spectral_count_sum(), [1.0, 2.0]);
        assert_eq!(protein.spectral_count_mean(), [0.5, 1.0]);
        assert_eq!(protein.confidence_mean(), [Some(50.0)]);
        assert_eq!(protein.peptide_count(), [1, 2]);
        assert_eq!(protein.peptide_sequences(), ["AAK", "DDK"]);
        assert_eq!(protein.trivial_name(TrivialNameParser::default()), "TEST_HUMAN");
    }

    #[test]
    fn without_rows() {
        let table = table(&[("P2", "CCK", [Some(7.0), Some(7.0)])]);
        let protein = Protein::with_record(&table, "P1", record("AAK"));
        assert_eq!(protein.area_sum(), [0.0, 0.0]);
        assert!(protein.area_mean().iter().all(|m| m.is_nan()));
        assert_eq!(protein.confidence_mean(), [None]);
        assert!(
            protein
                .empai(10.0, &AdditiveRetentionModel::default())
                .is_err_and(|e| matches!(e.get_kind(), QuantError::EmptyInput))
        );
        assert!(protein.top_three_fold_change().unwrap().is_nan());
    }

    #[test]
    fn top_three_infinite_is_zero() {
        let table = table(&[
            ("P1", "AAK", [Some(100.0), Some(50.0)]),
            ("P1", "CCK", [Some(80.0), Some(40.0)]),
            ("P1", "DDK", [Some(60.0), Some(0.0)]),
        ]);
        let protein = Protein::with_record(&table, "P1", record("AAKCCKDDK"));
        assert_eq!(protein.top_three_fold_change().unwrap(), 0.0);
    }

    #[test]
    fn top_three_takes_most_intense() {
        let table = table(&[
            ("P1", "AAK", [Some(10.0), Some(100.0)]),
            ("P1", "CCK", [Some(80.0), Some(40.0)]),
            ("P1", "DDK", [None, None]),
            ("P1", "EEK", [Some(60.0), Some(20.0)]),
            ("P1", "FFK", [Some(40.0), Some(10.0)]),
        ]);
        let protein = Protein::with_record(&table, "P1", record(""));
        // Rows 80/40, 60/20, 40/10
        assert_eq!(protein.top_three_fold_change().unwrap(), 3.0);
    }

    #[test]
    fn top_three_skips_undefined() {
        let table = table(&[
            ("P1", "AAK", [Some(30.0), Some(10.0)]),
            ("P1", "CCK", [None, None]),
        ]);
        let protein = Protein::with_record(&table, "P1", record(""));
        assert_eq!(protein.top_three_fold_change().unwrap(), 3.0);

        let table = self::table(&[("P1", "CCK", [Some(0.0), None])]);
        let protein = Protein::with_record(&table, "P1", record(""));
        // The undefined mean is kept as NaN
        assert!(protein.top_three_fold_change().unwrap().is_nan());
    }

    #[test]
    fn top_three_negative() {
        let table = table(&[("P1", "AAK", [Some(-20.0), Some(5.0)])]);
        let protein = Protein::with_record(&table, "P1", record(""));
        assert_eq!(protein.top_three_fold_change().unwrap(), 0.25);
    }

    #[test]
    fn top_three_needs_two_columns() {
        let table = QuantitationTable::new(
            vec!["Area S1".to_string()],
            Vec::new(),
            Vec::new(),
            vec![QuantRow::new("P1", "AAK", vec![Some(1.0)], Vec::new(), Vec::new())],
        )
        .unwrap();
        let protein = Protein::with_record(&table, "P1", record("AAK"));
        assert!(
            protein
                .top_three_fold_change()
                .is_err_and(|e| matches!(e.get_kind(), QuantError::MissingColumn))
        );
    }

    #[test]
    fn fold_change_by_name() {
        let a = table(&[("P1", "AAK", [Some(200.0), Some(100.0)])]);
        let b = table(&[("P1", "AAK", [Some(100.0), Some(50.0)])]);
        let c = QuantitationTable::new(
            vec!["Area S2".to_string()],
            Vec::new(),
            Vec::new(),
            vec![QuantRow::new("P1", "AAK", vec![Some(0.0)], Vec::new(), Vec::new())],
        )
        .unwrap();
        let pa = Protein::with_record(&a, "P1", record("AAK"));
        let pb = Protein::with_record(&b, "P1", record("AAK"));
        let pc = Protein::with_record(&c, "P1", record("AAK"));
        assert_eq!(pa.fold_change(&pb), [2.0, 2.0]);
        let partial = pa.fold_change(&pc);
        assert!(partial[0].is_nan());
        assert_eq!(partial[1], f64::INFINITY);
    }

    #[test]
    fn empai_uses_all_tryptic_peptides() {
        let table = table(&[
            ("P1", "AAK", [Some(1.0), Some(1.0)]),
            ("P1", "CCK", [Some(1.0), None]),
            ("P1", "DDK", [Some(1.0), Some(0.0)]),
        ]);
        let protein = Protein::with_record(&table, "P1", record("AAKCCKDDKEEKFFKGGKHHKIIKLLKMMR"));
        let model = AdditiveRetentionModel::default();
        let empai = protein.empai(2.0, &model).unwrap();
        assert!((empai[0] - (2.0f64.powf(0.3) - 1.0)).abs() < 1e-12);
        assert!((empai[1] - (2.0f64.powf(0.1) - 1.0)).abs() < 1e-12);
        // The window is DDK (-1.7) to CCK (3.1), the edges are not observable
        assert_eq!(protein.observable_peptides(&model).unwrap(), ["AAK", "EEK"]);
        let (min, max) = protein.retention_window(&model).unwrap();
        assert!((min + 1.7).abs() < 1e-9 && (max - 3.1).abs() < 1e-9);
    }

    #[test]
    fn empai_without_tryptic_peptides() {
        let table = table(&[("P1", "AAK", [Some(1.0), Some(1.0)])]);
        let protein = Protein::with_record(&table, "P1", record(""));
        assert!(
            protein
                .empai(10.0, &AdditiveRetentionModel::default())
                .is_err_and(|e| matches!(e.get_kind(), QuantError::EmptyInput))
        );
    }

    #[test]
    fn retrieve_through_cache() {
        let table = table(&[("P1", "AAK", [Some(1.0), Some(1.0)])]);
        let mut cache = SequenceCache::new(|accession: &str| -> QuantResult<String> {
            Ok(format!(">sp|{accession}|NAME_HUMAN\nMAAKR\n"))
        });
        let protein = Protein::new(&table, "P1", &mut cache).unwrap();
        assert_eq!(protein.sequence(), "MAAKR");
        assert_eq!(protein.id(), "P1");
        assert!(protein.to_string().starts_with("sp|P1|NAME_HUMAN\n"));
        let other = Protein::with_record(&table, "P1", protein.shared_record());
        assert!(Arc::ptr_eq(&other.shared_record(), &cache.get("P1").unwrap()));
    }
}
