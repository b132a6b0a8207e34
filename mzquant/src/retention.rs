//! Retention time prediction for peptides.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Predicts the retention time of a peptide. Any prediction has to be pure: the same sequence
/// always gives the same value.
pub trait RetentionTimePredictor {
    /// Predict the retention time of the given sequence, in arbitrary units
    fn predict(&self, sequence: &str) -> f64;
}

impl<F: Fn(&str) -> f64> RetentionTimePredictor for F {
    fn predict(&self, sequence: &str) -> f64 {
        self(sequence)
    }
}

/// An additive retention model, the retention time is the sum of the coefficients of all
/// residues and the termini, corrected for the length of the peptide:
/// `sum * (1 + chain_length * ln(length)) + constant`.
/// Residues without a coefficient contribute nothing.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AdditiveRetentionModel {
    /// The retention coefficient per (uppercase) residue
    pub coefficients: HashMap<char, f64>,
    /// Added for the N terminus
    pub n_term: f64,
    /// Added for the C terminus
    pub c_term: f64,
    /// The length correction factor
    pub chain_length: f64,
    /// The offset of the model
    pub constant: f64,
}

impl AdditiveRetentionModel {
    /// The retention coefficients of Guo et al. (1986) for reversed phase chromatography at
    /// pH 2.0, without length correction.
    pub fn guo_ph_2_0() -> Self {
        Self {
            coefficients: [
                ('W', 8.8),
                ('F', 8.1),
                ('L', 8.1),
                ('I', 7.4),
                ('M', 5.5),
                ('V', 5.0),
                ('Y', 4.5),
                ('C', 2.6),
                ('P', 2.0),
                ('A', 2.0),
                ('E', 1.1),
                ('T', 0.6),
                ('D', 0.2),
                ('Q', 0.0),
                ('S', -0.2),
                ('G', -0.2),
                ('R', -0.6),
                ('N', -0.6),
                ('H', -2.1),
                ('K', -2.1),
            ]
            .into_iter()
            .collect(),
            n_term: 0.0,
            c_term: 0.0,
            chain_length: 0.0,
            constant: 0.0,
        }
    }
}

impl Default for AdditiveRetentionModel {
    fn default() -> Self {
        Self::guo_ph_2_0()
    }
}

impl RetentionTimePredictor for AdditiveRetentionModel {
    fn predict(&self, sequence: &str) -> f64 {
        let length = sequence.chars().count();
        if length == 0 {
            return self.constant;
        }
        let sum = sequence
            .chars()
            .filter_map(|c| self.coefficients.get(&c.to_ascii_uppercase()))
            .sum::<f64>()
            + self.n_term
            + self.c_term;
        sum.mul_add(self.chain_length * (length as f64).ln(), sum) + self.constant
    }
}
