//! Compare the protein abundances of two groups of search engine result files

use std::{fs::File, io::BufWriter, path::PathBuf, process::ExitCode, time::Duration};

use clap::Parser;
use context_error::{BoxedError, Context, CreateError};
use mzquant::{
    QuantError, QuantResult, SequenceCache, SequenceSource, TrivialNameParser, UniProtSource,
    load,
};

mod config;
mod summary;

use config::Config;
use summary::{Groups, Settings};

/// The command line interface arguments
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// The result files of the first group
    #[arg(long, num_args = 1.., required = true)]
    group1: Vec<PathBuf>,
    /// The result files of the second group, fold changes are given as group 1 over group 2
    #[arg(long, num_args = 1.., required = true)]
    group2: Vec<PathBuf>,
    /// The output path for the resulting summary csv file
    #[arg(short, long, default_value = "summary.csv")]
    output: PathBuf,
    /// A TOML configuration file, any value given on the command line takes precedence
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Do not download sequences, only use the sequences already in the cache
    #[arg(long)]
    offline: bool,
    /// The UniProt REST endpoint
    #[arg(long)]
    base_url: Option<String>,
    /// Where to store retrieved sequences, defaults to the platform cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Keep retrieved sequences in memory only
    #[arg(long)]
    no_cache: bool,
    /// The base of the emPAI exponent
    #[arg(long)]
    empai_base: Option<f64>,
    /// How to name proteins: `header`, `record-name`, or `pipe-field:N`
    #[arg(long, value_parser = parse_trivial_name)]
    trivial_name: Option<TrivialNameParser>,
    /// Show more log messages, can be given multiple times
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Where sequences come from when they are not cached
#[derive(Debug)]
enum Source {
    Online(UniProtSource),
    Offline,
}

impl SequenceSource for Source {
    fn fetch(&self, accession: &str) -> QuantResult<String> {
        match self {
            Self::Online(source) => source.fetch(accession),
            Self::Offline => Err(BoxedError::new(
                QuantError::NetworkFailure,
                "Sequence not cached",
                "Running offline and this sequence is not present in the cache",
                Context::show(accession.to_string()),
            )),
        }
    }
}

fn parse_trivial_name(value: &str) -> Result<TrivialNameParser, String> {
    value.parse().map_err(|e: BoxedError<'static, QuantError>| e.to_string())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> ExitCode {
    let args = Cli::parse();
    init_logging(args.verbose);
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> QuantResult<()> {
    let config = args
        .config
        .as_deref()
        .map_or_else(|| Ok(Config::default()), Config::from_file)?;

    let first = load::read_files(&args.group1, &config.columns)?;
    let second = load::read_files(&args.group2, &config.columns)?;
    log::info!(
        "Loaded {} rows for group 1 and {} rows for group 2",
        first.len(),
        second.len()
    );
    let groups = Groups::new(first, second);

    let source = if args.offline {
        Source::Offline
    } else {
        Source::Online(UniProtSource::new(
            args.base_url
                .as_deref()
                .or(config.fetch.base_url.as_deref())
                .unwrap_or(UniProtSource::DEFAULT_BASE_URL),
            Duration::from_secs(config.fetch.timeout_seconds.unwrap_or(30)),
        )?)
    };
    let mut cache = if args.no_cache || config.fetch.no_cache.unwrap_or_default() {
        SequenceCache::new(source)
    } else if let Some(directory) = args.cache_dir.or(config.fetch.cache_dir) {
        SequenceCache::with_directory(source, directory)
    } else {
        SequenceCache::with_default_directory(source)
    };
    if let Some(directory) = cache.directory() {
        log::info!("Caching sequences in {}", directory.display());
    }

    let settings = Settings {
        empai_base: args
            .empai_base
            .or(config.analysis.empai_base)
            .unwrap_or(10.0),
        trivial_name: args
            .trivial_name
            .or(config.analysis.trivial_name)
            .unwrap_or_default(),
    };
    let summary = summary::summarise(&groups, &mut cache, settings);

    let file = File::create(&args.output).map_err(|e| {
        BoxedError::new(
            QuantError::FileCouldNotBeOpened,
            "Could not create output file",
            e.to_string(),
            Context::default()
                .source(args.output.to_string_lossy())
                .to_owned(),
        )
    })?;
    mzquant::csv::write_csv(BufWriter::new(file), summary, ',').map_err(|e| {
        BoxedError::new(
            QuantError::FileCouldNotBeOpened,
            "Could not write output file",
            e.to_string(),
            Context::default()
                .source(args.output.to_string_lossy())
                .to_owned(),
        )
    })?;
    log::info!("Written summary to {}", args.output.display());
    Ok(())
}

#[cfg(test)]
#[expect(clippy::missing_panics_doc)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_arguments() {
        let args = Cli::try_parse_from([
            "pept-compare",
            "--group1",
            "a.csv",
            "b.csv",
            "--group2",
            "c.csv",
            "--trivial-name",
            "pipe-field:1",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.group1.len(), 2);
        assert_eq!(args.group2, [PathBuf::from("c.csv")]);
        assert_eq!(args.output, PathBuf::from("summary.csv"));
        assert_eq!(args.trivial_name, Some(TrivialNameParser::PipeField(1)));
        assert_eq!(args.verbose, 2);
        assert!(Cli::try_parse_from(["pept-compare", "--group1", "a.csv"]).is_err());
    }

    #[test]
    fn offline_source() {
        assert!(Source::Offline.fetch("P69905").is_err());
    }

    #[test]
    fn end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.tsv");
        std::fs::write(&first, "Protein Accession,Peptide,Area A\nP11111,AAK,20\n").unwrap();
        std::fs::write(&second, "Protein Accession\tPeptide\tArea A\nP11111\tAAK\t10\n").unwrap();
        let cache_dir = dir.path().join("cache");
        SequenceCache::with_directory(
            |_: &str| -> QuantResult<String> {
                Ok(">sp|P11111|ONE_HUMAN One\nAAKCCK\n".to_string())
            },
            &cache_dir,
        )
        .get("P11111")
        .unwrap();
        let output = dir.path().join("out.csv");
        let args = Cli {
            group1: vec![first],
            group2: vec![second],
            output: output.clone(),
            config: None,
            offline: true,
            base_url: None,
            cache_dir: Some(cache_dir),
            no_cache: false,
            empai_base: None,
            trivial_name: None,
            verbose: 0,
        };
        run(args).unwrap();
        let text = std::fs::read_to_string(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("P11111,ONE_HUMAN,1,1,20,10,"));
    }
}
