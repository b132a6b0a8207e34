//! The TOML configuration file, every value can be overridden on the command line.
//!
//! ```toml
//! # pept-compare.toml
//! [fetch]
//! base_url = "https://rest.uniprot.org/uniprotkb"
//! timeout_seconds = 30
//! cache_dir = "sequences"
//! no_cache = false
//!
//! [analysis]
//! empai_base = 10
//! trivial_name = "pipe-field:2"
//!
//! [columns]
//! area = ["Area"]
//! spectral_count = ["#Spectra"]
//! ```

use std::path::{Path, PathBuf};

use context_error::{BoxedError, Context, CreateError};
use mzquant::{QuantError, QuantResult, TableLayout, TrivialNameParser};
use serde::Deserialize;

/// Root of a `pept-compare.toml` file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// How sequences are retrieved
    #[serde(default)]
    pub(crate) fetch: FetchConfig,
    /// The statistics
    #[serde(default)]
    pub(crate) analysis: AnalysisConfig,
    /// Which columns of the result files hold what data
    #[serde(default)]
    pub(crate) columns: TableLayout,
}

/// The `[fetch]` section
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FetchConfig {
    /// The UniProt REST endpoint
    pub(crate) base_url: Option<String>,
    /// The timeout for a single request
    pub(crate) timeout_seconds: Option<u64>,
    /// Where to store retrieved sequences
    pub(crate) cache_dir: Option<PathBuf>,
    /// Keep retrieved sequences in memory only
    pub(crate) no_cache: Option<bool>,
}

/// The `[analysis]` section
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AnalysisConfig {
    /// The base of the emPAI exponent
    pub(crate) empai_base: Option<f64>,
    /// How to name proteins
    pub(crate) trivial_name: Option<TrivialNameParser>,
}

impl Config {
    /// Load the configuration from a TOML file.
    pub(crate) fn from_file(path: &Path) -> QuantResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BoxedError::new(
                QuantError::FileCouldNotBeOpened,
                "Could not read configuration file",
                e.to_string(),
                Context::default().source(path.to_string_lossy()).to_owned(),
            )
        })?;
        Self::parse(&content).map_err(|e| {
            BoxedError::new(
                QuantError::InvalidConfig,
                "Invalid configuration file",
                "The configuration file could not be parsed",
                Context::default().source(path.to_string_lossy()).to_owned(),
            )
            .add_underlying_error(e)
        })
    }

    /// Parse the configuration from TOML text.
    pub(crate) fn parse(content: &str) -> QuantResult<Self> {
        toml::from_str(content).map_err(|e| {
            BoxedError::new(
                QuantError::InvalidConfig,
                "Invalid configuration",
                e.message().to_string(),
                e.span().map_or_else(
                    || Context::show(content.to_string()).to_owned(),
                    |span| {
                        let line_index = content[..span.start].matches('\n').count();
                        let line_start = content[..span.start].rfind('\n').map_or(0, |i| i + 1);
                        let line = content[line_start..].lines().next().unwrap_or_default();
                        Context::line(
                            Some(line_index as u32),
                            line.to_string(),
                            span.start - line_start,
                            span.len()
                                .min(line.len().saturating_sub(span.start - line_start)),
                        )
                        .to_owned()
                    },
                ),
            )
        })
    }
}
