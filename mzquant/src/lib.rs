//! # Protein and peptide quantitation
//! This library computes protein and peptide level abundance statistics out of the
//! protein-peptide exports of proteomics search engines. Start by loading one or more result
//! files into a [`QuantitationTable`] ([`load::read_files`]), merge the tables of two
//! experimental groups with [`QuantitationTable::merge`], and build [`Protein`] views on top of
//! the result.
//!
//! Handles:
//! * Per sample aggregations ([`Protein::area_sum`], [`Protein::peptide_count`], [`Peptide::mean_intensity`])
//! * Relative abundance ([`Protein::fold_change`], [`Protein::top_three_fold_change`], [`Protein::empai`])
//! * Locating peptides in the protein sequence ([`Peptide::start_position`], [`Peptide::end_position`])
//!
//! Protein sequences are retrieved with a [`SequenceSource`] via a [`SequenceCache`] that keeps
//! every record in memory and, when given a directory, stores the records on disk so the next run
//! does not need to download them again.
//!
//! # Features
//! * `http` turns on downloading sequences from UniProt ([`UniProtSource`]), as this pulls in
//!   `reqwest` this is made optional to prevent relying on too many dependencies.
//! * `coloured-errors` turns on coloured error messages.

pub mod csv;
mod error;
mod fasta;
mod fetch;
mod helper_functions;
pub mod load;
mod peptide;
pub mod protease;
mod protein;
mod retention;
mod table;

pub use error::*;
pub use fasta::*;
pub use fetch::*;
pub use peptide::*;
pub use protease::Protease;
pub use protein::*;
pub use retention::*;
pub use table::*;

/// A subset of the types and traits that are envisioned to be used the most, importing this is a good starting point for working with the crate
pub mod prelude {
    pub use crate::{
        Peptide, Protein, QuantError, QuantResult, QuantitationTable, RetentionTimePredictor,
        SequenceCache, SequenceSource, TrivialNameParser,
    };
}
