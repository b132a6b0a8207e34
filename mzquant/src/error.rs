//! The [`QuantError`] which makes it easy for downstream users of the error type to match on the exact error.

use context_error::{BoxedError, ErrorKind};

/// The kind of any error returned by this crate.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum QuantError {
    /// A peptide is not present in the protein sequence or not observed for the protein
    NotFound,
    /// A statistic needs at least one value but none were available
    EmptyInput,
    /// A column needed for a statistic or to build a table is missing
    MissingColumn,
    /// The rows of a table do not agree with its columns
    InvalidTable,
    /// The accession cannot be used to retrieve or store a sequence
    InvalidAccession,
    /// The sequence database could not be reached or returned an error status
    NetworkFailure,
    /// The FASTA text could not be parsed or contained no records
    InvalidFasta,
    /// A file could not be opened
    FileCouldNotBeOpened,
    /// A file could be opened but its content is invalid
    #[default]
    FileCouldNotBeParsed,
    /// The on disk sequence cache could not be read or written
    CacheFailure,
    /// A configuration value is invalid
    InvalidConfig,
}

impl ErrorKind for QuantError {
    type Settings = ();
    fn descriptor(&self) -> &'static str {
        "error"
    }
    fn ignored(&self, _settings: Self::Settings) -> bool {
        false
    }
    fn is_error(&self, _settings: Self::Settings) -> bool {
        true
    }
}

/// The result of any fallible operation in this crate.
pub type QuantResult<T> = Result<T, BoxedError<'static, QuantError>>;
