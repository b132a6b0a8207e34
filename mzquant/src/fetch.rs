//! Retrieving protein sequences by accession, with an in memory and on disk cache.

use std::{
    collections::HashMap,
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use context_error::{BoxedError, Context, CreateError};
use directories::ProjectDirs;
use flate2::{Compression, bufread::GzDecoder, write::GzEncoder};

use crate::{QuantError, QuantResult, SequenceRecord};

/// A source of protein sequences, returning the FASTA text for an accession.
///
/// Any closure `Fn(&str) -> QuantResult<String>` is a source as well, which makes it easy to use
/// a local database or a fixed set of sequences.
/// ```rust
/// use mzquant::{SequenceCache, SequenceSource};
///
/// let source = |accession: &str| -> mzquant::QuantResult<String> {
///     Ok(format!(">{accession}\nAAKCCK\n"))
/// };
/// let mut cache = SequenceCache::new(source);
/// assert_eq!(cache.get("P1").unwrap().sequence(), "AAKCCK");
/// ```
pub trait SequenceSource {
    /// Get the FASTA text for this accession.
    /// # Errors
    /// If the sequence could not be retrieved.
    fn fetch(&self, accession: &str) -> QuantResult<String>;
}

impl<F: Fn(&str) -> QuantResult<String>> SequenceSource for F {
    fn fetch(&self, accession: &str) -> QuantResult<String> {
        self(accession)
    }
}

/// Retrieves sequences from the UniProt REST API (`<base url>/<accession>.fasta`).
#[cfg(feature = "http")]
#[derive(Clone, Debug)]
pub struct UniProtSource {
    base_url: reqwest::Url,
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl UniProtSource {
    /// The current UniProt knowledge base REST endpoint
    pub const DEFAULT_BASE_URL: &'static str = "https://rest.uniprot.org/uniprotkb";

    /// Create a new source at the given base URL with the given timeout for every request.
    /// # Errors
    /// If the URL is not a valid HTTP(s) URL or if the HTTP client could not be created.
    pub fn new(base_url: &str, timeout: std::time::Duration) -> QuantResult<Self> {
        let base = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = reqwest::Url::parse(&base).map_err(|e| {
            BoxedError::new(
                QuantError::InvalidConfig,
                "Invalid sequence database URL",
                e.to_string(),
                Context::show(base_url.to_string()).to_owned(),
            )
        })?;
        if !base_url.scheme().starts_with("http") {
            return Err(BoxedError::new(
                QuantError::InvalidConfig,
                "Invalid sequence database URL",
                "Only HTTP(s) URLs are supported",
                Context::show(base_url.to_string()).to_owned(),
            ));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                BoxedError::small(
                    QuantError::NetworkFailure,
                    "Could not create HTTP client",
                    e.to_string(),
                )
            })?;
        Ok(Self { base_url, client })
    }

    /// The URL that is requested for this accession
    /// # Errors
    /// If the accession is not valid, see [`validate_accession`].
    pub fn url(&self, accession: &str) -> QuantResult<reqwest::Url> {
        validate_accession(accession)?;
        self.base_url
            .join(&format!("{accession}.fasta"))
            .map_err(|e| {
                BoxedError::new(
                    QuantError::InvalidAccession,
                    "Invalid accession",
                    e.to_string(),
                    Context::show(accession.to_string()).to_owned(),
                )
            })
    }
}

#[cfg(feature = "http")]
impl SequenceSource for UniProtSource {
    fn fetch(&self, accession: &str) -> QuantResult<String> {
        let url = self.url(accession)?;
        let network_error = |e: reqwest::Error| {
            BoxedError::new(
                QuantError::NetworkFailure,
                "Could not retrieve sequence",
                e.to_string(),
                Context::none().source(url.to_string()).to_owned(),
            )
        };
        self.client
            .get(url.clone())
            .send()
            .map_err(network_error)?
            .error_for_status()
            .map_err(network_error)?
            .text()
            .map_err(network_error)
    }
}

/// Check that an accession can safely be used in a URL and as a file name. Only ASCII letters,
/// digits, `-`, `_`, and `.` are allowed, and it cannot start with a `.`.
/// # Errors
/// If the accession is empty or contains any other character.
pub fn validate_accession(accession: &str) -> QuantResult<()> {
    if let Some((offset, c)) = accession
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        Err(BoxedError::new(
            QuantError::InvalidAccession,
            "Invalid accession",
            format!("The character '{c}' is not allowed in an accession"),
            Context::line(None, accession, offset, c.len_utf8()).to_owned(),
        ))
    } else if accession.is_empty() || accession.starts_with('.') {
        Err(BoxedError::new(
            QuantError::InvalidAccession,
            "Invalid accession",
            "An accession cannot be empty or start with a '.'",
            Context::show(accession.to_string()).to_owned(),
        ))
    } else {
        Ok(())
    }
}

/// Retrieves sequence records from a [`SequenceSource`] at most once per accession. All records
/// are kept in memory for the lifetime of the cache. With a directory set every retrieved record
/// is stored as `<accession>.fasta.gz`, so any later cache using the same directory does not
/// have to retrieve it again.
#[derive(Debug)]
pub struct SequenceCache<S> {
    source: S,
    directory: Option<PathBuf>,
    records: HashMap<String, Arc<SequenceRecord>>,
}

impl<S: SequenceSource> SequenceCache<S> {
    /// A cache that only keeps the records in memory.
    pub fn new(source: S) -> Self {
        Self {
            source,
            directory: None,
            records: HashMap::new(),
        }
    }

    /// A cache that additionally stores the records in the given directory.
    pub fn with_directory(source: S, directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
            ..Self::new(source)
        }
    }

    /// A cache that stores the records in the platform cache directory, see
    /// [`Self::default_directory`]. If no such directory exists the records are only kept in
    /// memory.
    pub fn with_default_directory(source: S) -> Self {
        Self {
            directory: Self::default_directory(),
            ..Self::new(source)
        }
    }

    /// The platform specific cache directory for sequences
    pub fn default_directory() -> Option<PathBuf> {
        ProjectDirs::from("org", "rusteomics", "mzquant").map(|p| p.cache_dir().join("sequences"))
    }

    /// The directory used to store the records
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// The underlying source
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Get the record for this accession. It is taken from memory, then from the cache directory,
    /// and only otherwise retrieved from the source. A cache entry that cannot be read is ignored.
    /// # Errors
    /// If the accession is not valid, if the source failed, or if the source did not return
    /// valid FASTA.
    pub fn get(&mut self, accession: &str) -> QuantResult<Arc<SequenceRecord>> {
        if let Some(record) = self.records.get(accession) {
            log::debug!("Sequence for {accession} found in memory");
            return Ok(record.clone());
        }
        validate_accession(accession)?;

        let path = self
            .directory
            .as_ref()
            .map(|dir| dir.join(format!("{accession}.fasta.gz")));
        if let Some(path) = path.as_deref().filter(|p| p.exists()) {
            match read_cached(path) {
                Ok(record) => {
                    log::debug!("Sequence for {accession} read from {}", path.display());
                    return Ok(self.insert(accession, record));
                }
                Err(error) => log::warn!("Ignoring sequence cache entry for {accession}: {error}"),
            }
        }

        log::info!("Retrieving sequence for {accession}");
        let record = SequenceRecord::from_fasta(&self.source.fetch(accession)?)?;
        let identifier = record.identifier();
        if identifier.accession() != accession {
            log::debug!(
                "Sequence retrieved for {accession} is identified as {}",
                identifier.accession()
            );
        }
        if let Some(path) = path
            && let Err(error) = write_cached(&path, &record)
        {
            log::warn!("Could not store sequence for {accession}: {error}");
        }
        Ok(self.insert(accession, record))
    }

    /// Store a record for an accession, without touching the cache directory.
    pub fn insert(&mut self, accession: &str, record: SequenceRecord) -> Arc<SequenceRecord> {
        let record = Arc::new(record);
        self.records.insert(accession.to_string(), record.clone());
        record
    }

    /// Check if a record for this accession is in memory
    pub fn contains(&self, accession: &str) -> bool {
        self.records.contains_key(accession)
    }

    /// The number of records in memory
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if there are no records in memory
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn cache_error(
    short: &str,
    error: impl std::fmt::Display,
    path: &Path,
) -> BoxedError<'static, QuantError> {
    BoxedError::new(
        QuantError::CacheFailure,
        short.to_string(),
        error.to_string(),
        Context::none().source(path.to_string_lossy()).to_owned(),
    )
}

fn read_cached(path: &Path) -> QuantResult<SequenceRecord> {
    let file = std::fs::File::open(path)
        .map_err(|e| cache_error("Sequence cache entry could not be opened", e, path))?;
    let mut text = String::new();
    GzDecoder::new(BufReader::new(file))
        .read_to_string(&mut text)
        .map_err(|e| cache_error("Sequence cache entry could not be read", e, path))?;
    SequenceRecord::from_fasta(&text).map_err(|e| {
        cache_error("Sequence cache entry could not be parsed", "Invalid FASTA", path)
            .add_underlying_error(e)
    })
}

/// Write to a temporary file first, so a partially written entry never has the final name.
fn write_cached(path: &Path, record: &SequenceRecord) -> QuantResult<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| cache_error("Sequence cache directory could not be made", e, dir))?;
    }
    let temporary = path.with_extension("gz.partial");
    let file = std::fs::File::create(&temporary)
        .map_err(|e| cache_error("Sequence cache entry could not be made", e, &temporary))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    record
        .write(&mut encoder)
        .and_then(|()| encoder.finish()?.flush())
        .map_err(|e| cache_error("Sequence cache entry could not be written", e, &temporary))?;
    std::fs::rename(&temporary, path)
        .map_err(|e| cache_error("Sequence cache entry could not be stored", e, path))
}
