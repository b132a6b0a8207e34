//! One summary row per protein of the merged groups.

use mzquant::{AdditiveRetentionModel, prelude::*};

/// The settings for the per protein statistics
#[derive(Clone, Copy, Debug)]
pub(crate) struct Settings {
    pub(crate) empai_base: f64,
    pub(crate) trivial_name: TrivialNameParser,
}

/// The two experimental groups and their outer join.
#[derive(Debug)]
pub(crate) struct Groups {
    pub(crate) first: QuantitationTable,
    pub(crate) second: QuantitationTable,
    pub(crate) merged: QuantitationTable,
}

impl Groups {
    pub(crate) const SUFFIXES: (&'static str, &'static str) = ("_g1", "_g2");

    pub(crate) fn new(first: QuantitationTable, second: QuantitationTable) -> Self {
        let merged = QuantitationTable::merge(&first, &second, Self::SUFFIXES);
        Self {
            first,
            second,
            merged,
        }
    }
}

/// Summarise all proteins as (column, value) pairs. Proteins for which the sequence could not be
/// retrieved are skipped with a warning.
pub(crate) fn summarise<S: SequenceSource>(
    groups: &Groups,
    cache: &mut SequenceCache<S>,
    settings: Settings,
) -> Vec<Vec<(String, String)>> {
    let predictor = AdditiveRetentionModel::default();
    let mut summary = Vec::new();
    for accession in groups.merged.accessions() {
        let protein = match Protein::new(&groups.merged, accession, cache) {
            Ok(protein) => protein,
            Err(error) => {
                log::warn!("Skipping {accession}: {error}");
                continue;
            }
        };
        let mut row = vec![
            ("Accession".to_string(), accession.to_string()),
            (
                "Name".to_string(),
                protein.trivial_name(settings.trivial_name).to_string(),
            ),
            (
                "Peptides".to_string(),
                protein.peptide_sequences().len().to_string(),
            ),
            ("Rows".to_string(), protein.rows().len().to_string()),
        ];
        let columns = groups.merged.area_columns();
        row.extend(
            columns
                .iter()
                .zip(protein.area_sum())
                .map(|(name, sum)| (format!("Area sum {name}"), sum.to_string())),
        );
        row.extend(
            columns
                .iter()
                .zip(protein.peptide_count())
                .map(|(name, count)| (format!("Peptide count {name}"), count.to_string())),
        );

        // Both groups share the sample names so the area columns line up
        let first = Protein::with_record(&groups.first, accession, protein.shared_record());
        let second = Protein::with_record(&groups.second, accession, protein.shared_record());
        if !first.row_indices().is_empty() && !second.row_indices().is_empty() {
            row.extend(
                groups
                    .first
                    .area_columns()
                    .iter()
                    .zip(first.fold_change(&second))
                    .map(|(name, fc)| (format!("Fold change {name}"), fc.to_string())),
            );
        }

        match protein.top_three_fold_change() {
            Ok(fc) => row.push(("Top three fold change".to_string(), fc.to_string())),
            Err(error) => log::debug!("No top three fold change for {accession}: {error}"),
        }
        match protein.empai(settings.empai_base, &predictor) {
            Ok(empai) => row.extend(
                columns
                    .iter()
                    .zip(empai)
                    .map(|(name, value)| (format!("emPAI {name}"), value.to_string())),
            ),
            Err(error) => log::debug!("No emPAI for {accession}: {error}"),
        }
        summary.push(row);
    }
    log::info!(
        "Summarised {} of {} proteins",
        summary.len(),
        groups.merged.accessions().len()
    );
    summary
}

#[cfg(test)]
#[expect(clippy::missing_panics_doc)]
mod tests {
    use context_error::*;
    use mzquant::{QuantError, TableLayout, load};

    use super::*;

    const FIRST: &str = "Protein Accession,Peptide,Area A,#Spectra A\n\
        P11111,AAK,100,2\n\
        P11111,CCK,50,1\n\
        P22222,LLK,10,1\n";
    const SECOND: &str = "Protein Accession,Peptide,Area A,#Spectra A\n\
        P11111,AAK,25,1\n\
        P99999,WWK,5,1\n";

    fn groups() -> Groups {
        let layout = TableLayout::default();
        Groups::new(
            load::read_reader(FIRST.as_bytes(), b',', &layout).unwrap(),
            load::read_reader(SECOND.as_bytes(), b',', &layout).unwrap(),
        )
    }

    fn source(accession: &str) -> QuantResult<String> {
        match accession {
            "P11111" => Ok(">sp|P11111|ONE_HUMAN One\nAAKCCKDDKEEK\n".to_string()),
            "P22222" => Ok(">sp|P22222|TWO_HUMAN Two\nLLKR\n".to_string()),
            _ => Err(BoxedError::small(
                QuantError::NetworkFailure,
                "Could not retrieve sequence",
                "Unknown accession",
            )),
        }
    }

    fn value<'a>(row: &'a [(String, String)], column: &str) -> Option<&'a str> {
        row.iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    #[test]
    fn summary_rows() {
        let groups = groups();
        let mut cache = SequenceCache::new(source);
        let summary = summarise(
            &groups,
            &mut cache,
            Settings {
                empai_base: 10.0,
                trivial_name: TrivialNameParser::default(),
            },
        );
        // P99999 cannot be retrieved
        assert_eq!(summary.len(), 2);

        let first = &summary[0];
        assert_eq!(value(first, "Accession"), Some("P11111"));
        assert_eq!(value(first, "Name"), Some("ONE_HUMAN"));
        assert_eq!(value(first, "Peptides"), Some("2"));
        assert_eq!(value(first, "Rows"), Some("2"));
        assert_eq!(value(first, "Area sum Area A_g1"), Some("150"));
        assert_eq!(value(first, "Area sum Area A_g2"), Some("25"));
        assert_eq!(value(first, "Peptide count Area A_g2"), Some("1"));
        assert_eq!(value(first, "Fold change Area A"), Some("6"));
        // 100/25, then CCK gives 50/0
        assert_eq!(value(first, "Top three fold change"), Some("0"));
        assert!(value(first, "emPAI Area A_g1").is_some());

        let second = &summary[1];
        assert_eq!(value(second, "Accession"), Some("P22222"));
        assert_eq!(value(second, "Fold change Area A"), None);
    }

    #[test]
    fn summary_as_csv() {
        let groups = groups();
        let mut cache = SequenceCache::new(source);
        let summary = summarise(
            &groups,
            &mut cache,
            Settings {
                empai_base: 2.0,
                trivial_name: TrivialNameParser::RecordName,
            },
        );
        let mut out = Vec::new();
        mzquant::csv::write_csv(&mut out, summary, ',').unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert!(
            lines
                .next()
                .unwrap()
                .starts_with("Accession,Name,Peptides,Rows,Area sum Area A_g1")
        );
        assert!(lines.next().unwrap().starts_with("P11111,sp|P11111|ONE_HUMAN,2,2,"));
        assert_eq!(lines.count(), 1);
    }
}
