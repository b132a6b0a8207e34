//! In silico digestion of protein sequences.

use std::{ops::RangeBounds, sync::LazyLock};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// The one letter codes of all residues a protein sequence can contain.
pub const ALL_RESIDUES: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S',
    'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

/// A single pattern a protease recognises. Each position is identified by an option, a none
/// means that there is no specificity at this position. If there is a specificity at a certain
/// position any residue that is contained in the set is allowed.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct CleavageSite {
    /// The residues n terminal of the cut site.
    pub before: Vec<Option<Vec<char>>>,
    /// The residues c terminal of the cut site.
    pub after: Vec<Option<Vec<char>>>,
}

impl CleavageSite {
    /// A site that cuts exactly between the specified options before the site and the
    /// specified options after the site.
    pub fn between_options(before: Vec<char>, after: Vec<char>) -> Self {
        Self {
            before: vec![Some(before)],
            after: vec![Some(after)],
        }
    }

    /// A site that cuts exactly between the specified stretches of residues.
    pub fn between_stretches(before: &str, after: &str) -> Self {
        Self {
            before: before.chars().map(|c| Some(vec![c])).collect_vec(),
            after: after.chars().map(|c| Some(vec![c])).collect_vec(),
        }
    }

    fn matches_at(&self, slice: &[char]) -> bool {
        debug_assert!(slice.len() == self.before.len() + self.after.len());
        slice
            .iter()
            .zip(self.before.iter().chain(self.after.iter()))
            .all(|(actual, pattern)| {
                pattern
                    .as_ref()
                    .is_none_or(|options| options.iter().any(|o| o.eq_ignore_ascii_case(actual)))
            })
    }
}

/// A protease defined by its ability to cut at any site identified by the right residues at the
/// n and c terminal side. A protease can recognise multiple patterns, a cut is made wherever any
/// of them matches.
///
/// A standard set of proteases can be found here [`known_proteases`].
///
/// ```rust
/// use mzquant::protease::known_proteases;
///
/// let trypsin = &known_proteases::TRYPSIN;
/// assert_eq!(trypsin.match_locations("SIADIRGRKM"), vec![6, 8, 9]);
/// // Only allow peptides ranging from 4 to 40 residues long
/// assert_eq!(trypsin.digest("SIADIRGGKSLAIEGCRTKM", 0, 4..40), ["SIADIR", "SLAIEGCR"]);
/// ```
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Protease {
    /// All patterns this protease cuts at.
    pub sites: Vec<CleavageSite>,
}

impl Protease {
    /// Define a protease that cuts at any of the given sites.
    pub const fn new(sites: Vec<CleavageSite>) -> Self {
        Self { sites }
    }

    /// Define a protease that cuts exactly between the specified options before the site and the
    /// specified options after the site.
    pub fn between_options(before: Vec<char>, after: Vec<char>) -> Self {
        Self::new(vec![CleavageSite::between_options(before, after)])
    }

    /// Add another site this protease cuts at.
    #[must_use]
    pub fn with_site(mut self, site: CleavageSite) -> Self {
        self.sites.push(site);
        self
    }

    /// Helper function to get a list of all residues except the ones given
    pub fn get_exclusive(exclude: &[char]) -> Vec<char> {
        ALL_RESIDUES
            .iter()
            .copied()
            .filter(|r| !exclude.contains(r))
            .collect_vec()
    }

    /// All locations (in residues) in the given sequence where this protease could cut.
    /// Note if a cutsite is "after" the last element in the sequence, it will not report that,
    /// only the cutsites inside the sequence.
    pub fn match_locations(&self, sequence: &str) -> Vec<usize> {
        let residues = sequence.chars().collect_vec();
        self.locations(&residues)
    }

    fn locations(&self, residues: &[char]) -> Vec<usize> {
        let upper = residues.len().saturating_sub(1);
        (1..=upper)
            .filter(|i| {
                self.sites.iter().any(|site| {
                    *i >= site.before.len()
                        && i + site.after.len() <= residues.len()
                        && site.matches_at(&residues[i - site.before.len()..i + site.after.len()])
                })
            })
            .collect_vec()
    }

    /// Digest this sequence with the given maximal number of missed cleavages. Only peptides
    /// with a length (in residues) in the size range are returned, in order of their start
    /// position and then their length.
    pub fn digest<'a>(
        &self,
        sequence: &'a str,
        max_missed_cleavages: usize,
        size_range: impl RangeBounds<usize>,
    ) -> Vec<&'a str> {
        let offsets = sequence
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(sequence.len()))
            .collect_vec();
        let residues = sequence.chars().collect_vec();
        let mut sites = vec![0];
        sites.extend(self.locations(&residues));
        sites.push(residues.len());

        let mut result = Vec::new();
        for (index, start) in sites.iter().enumerate() {
            for end in sites.iter().skip(index + 1).take(max_missed_cleavages + 1) {
                if end > start && size_range.contains(&(end - start)) {
                    result.push(&sequence[offsets[*start]..offsets[*end]]);
                }
            }
        }
        result
    }

    /// The distinct peptides of a digest, in order of first appearance.
    pub fn unique_digest<'a>(
        &self,
        sequence: &'a str,
        max_missed_cleavages: usize,
        size_range: impl RangeBounds<usize>,
    ) -> Vec<&'a str> {
        self.digest(sequence, max_missed_cleavages, size_range)
            .into_iter()
            .unique()
            .collect_vec()
    }
}

/// Well known proteases
pub mod known_proteases {
    use super::*;

    /// `Trypsin` cuts after Lysine (K) or Arginine (R), unless followed by Proline (P). Following
    /// the ExPASy rule it does cut WK|P and MR|P.
    pub static TRYPSIN: LazyLock<Protease> = LazyLock::new(|| {
        Protease::between_options(vec!['K', 'R'], Protease::get_exclusive(&['P']))
            .with_site(CleavageSite::between_stretches("WK", "P"))
            .with_site(CleavageSite::between_stretches("MR", "P"))
    });

}
