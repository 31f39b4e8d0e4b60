//! Command-line interface components.

use crate::config::LoaderConfig;
use crate::loader::discovery::DirectoryWalker;
use crate::loader::{LoadOutcome, Source, TimeRangeLoader};
use crate::models::{FileKind, ListDiagnostic};
use crate::output::{CompressionAlgorithm, write_table};
use crate::schema::ColumnSpec;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing::debug;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Parser, Debug)]
#[command(name = "instrument-reader")]
#[command(about = "Load time windows from TOA5 and STR instrument files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the rows in a time window and optionally write them out
    Load(LoadArgs),
    /// List the files a directory walk finds
    List(ListArgs),
    /// Show the time span each file covers
    Coverage(CoverageArgs),
}

#[derive(clap::Args, Debug)]
pub struct LoadArgs {
    /// A directory to search, or one or more files
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<PathBuf>,

    /// File format (str, toa5); inferred from file extensions when omitted
    #[arg(short, long, value_parser = parse_kind)]
    pub format: Option<FileKind>,

    /// Window start, YYYY-MM-DD[ HH:MM:SS] (default: earliest record)
    #[arg(long, value_parser = parse_datetime)]
    pub from: Option<NaiveDateTime>,

    /// Window end, inclusive (default: latest record)
    #[arg(long, value_parser = parse_datetime)]
    pub to: Option<NaiveDateTime>,

    /// Columns to keep: comma separated names, /regex/, or * for all
    #[arg(short, long, default_value = "*")]
    pub columns: String,

    /// Maximum directory depth, counting the source directory as 1
    #[arg(short, long, default_value_t = crate::constants::DEFAULT_MAX_DEPTH)]
    pub depth: usize,

    /// Regex a file base name must match (e.g. one TOA5 table)
    #[arg(long)]
    pub root: Option<String>,

    /// Name of the timestamp column in the output
    #[arg(long, default_value = crate::constants::DEFAULT_TIME_COLUMN)]
    pub time_column: String,

    /// Write the table here (.parquet or .csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Parquet compression algorithm (snappy, zstd, lz4, none)
    #[arg(long, default_value = "snappy")]
    pub compression: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Directories to walk
    #[arg(value_name = "DIR", required = true)]
    pub dirs: Vec<PathBuf>,

    /// Maximum directory depth, counting the given directories as 1
    #[arg(short, long, default_value_t = crate::constants::DEFAULT_MAX_DEPTH)]
    pub depth: usize,

    /// Regex the full file path must match
    #[arg(long)]
    pub filter: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct CoverageArgs {
    /// A directory to search, or one or more files
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<PathBuf>,

    /// File format (str, toa5); inferred from file extensions when omitted
    #[arg(short, long, value_parser = parse_kind)]
    pub format: Option<FileKind>,

    /// Maximum directory depth, counting the source directory as 1
    #[arg(short, long, default_value_t = crate::constants::DEFAULT_MAX_DEPTH)]
    pub depth: usize,

    /// Regex a file base name must match
    #[arg(long)]
    pub root: Option<String>,
}

impl Args {
    /// Get the log level based on verbosity
    pub fn get_log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

/// Parse a window bound; a bare date means midnight
pub fn parse_datetime(value: &str) -> std::result::Result<NaiveDateTime, String> {
    let value = value.trim();
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("'{}' is not YYYY-MM-DD[ HH:MM:SS]", value))
}

fn parse_kind(value: &str) -> std::result::Result<FileKind, String> {
    FileKind::from_name(value).ok_or_else(|| format!("unknown format '{}' (use str or toa5)", value))
}

/// Pick the file kind from the flag or, failing that, the sources' extensions
pub fn resolve_kind(format: Option<FileKind>, sources: &[PathBuf]) -> Result<FileKind> {
    if let Some(kind) = format {
        return Ok(kind);
    }
    let kinds: Vec<Option<FileKind>> = sources.iter().map(|p| FileKind::from_path(p)).collect();
    match kinds.first() {
        Some(Some(kind)) if kinds.iter().all(|k| *k == Some(*kind)) => Ok(*kind),
        _ => anyhow::bail!("cannot infer the file format from the sources; pass --format str|toa5"),
    }
}

/// Set up structured logging
pub fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("instrument_reader={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("Failed to initialise logging")?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Run the selected command
pub fn run(args: Args) -> Result<()> {
    setup_logging(&args)?;

    match &args.command {
        Some(Command::Load(load)) => run_load(load),
        Some(Command::List(list)) => run_list(list),
        Some(Command::Coverage(coverage)) => run_coverage(coverage),
        None => Ok(()),
    }
}

fn run_load(args: &LoadArgs) -> Result<()> {
    let kind = resolve_kind(args.format, &args.sources)?;
    let mut config = LoaderConfig::default()
        .with_max_depth(args.depth)
        .with_time_column(&args.time_column);
    if let Some(root) = &args.root {
        config = config.with_root_filter(root);
    }
    let compression = CompressionAlgorithm::from_name(&args.compression)
        .with_context(|| format!("Unknown compression algorithm '{}'", args.compression))?;
    let columns = ColumnSpec::parse(&args.columns).context("Invalid --columns")?;

    let loader = TimeRangeLoader::new(kind).with_config(config);
    let source = Source::from_paths(&args.sources);
    let mindate = args.from.unwrap_or(NaiveDateTime::MIN);
    let maxdate = args.to.unwrap_or(NaiveDateTime::MAX);

    let outcome = loader
        .load(&source, mindate, maxdate, &columns)
        .context("Failed to load instrument files")?;

    print_load_summary(&outcome);

    if let Some(path) = &args.output {
        let rows = write_table(&outcome.table, path, compression)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!(
            "{} {} rows to {}",
            "Wrote".bright_green().bold(),
            rows,
            path.display().to_string().bright_cyan()
        );
    }
    Ok(())
}

fn run_list(args: &ListArgs) -> Result<()> {
    let mut config = LoaderConfig::default().with_max_depth(args.depth);
    if let Some(filter) = &args.filter {
        config = config.with_name_filter(filter);
    }
    config.validate().context("Invalid list options")?;

    let walker = DirectoryWalker::new(config.max_depth)
        .with_name_filter(config.compiled_name_filter()?);
    let result = walker.walk(&args.dirs);

    for file in &result.files {
        println!("{}", file.display());
    }
    print_diagnostics(&result.diagnostics);
    println!(
        "{} {} files in {} directories",
        "Found".bright_green().bold(),
        result.files.len(),
        result.dirs.len()
    );
    Ok(())
}

fn run_coverage(args: &CoverageArgs) -> Result<()> {
    let kind = resolve_kind(args.format, &args.sources)?;
    let mut config = LoaderConfig::default().with_max_depth(args.depth);
    if let Some(root) = &args.root {
        config = config.with_root_filter(root);
    }
    config.validate().context("Invalid coverage options")?;

    let loader = TimeRangeLoader::new(kind).with_config(config);
    let (files, diagnostics) = loader
        .candidates(&Source::from_paths(&args.sources))
        .context("Failed to find instrument files")?;
    let coverages = loader
        .scan_coverage(&files)
        .context("Failed to read file headers")?;

    for file in &coverages {
        println!(
            "{}  {}  {}",
            file.coverage.min_time.to_string().bright_yellow(),
            file.coverage.end().to_string().bright_yellow(),
            file.path.display()
        );
    }
    print_diagnostics(&diagnostics);
    Ok(())
}

fn print_load_summary(outcome: &LoadOutcome) {
    let table = &outcome.table;

    println!("{}", "Load summary".bright_green().bold());
    println!("  Files loaded: {}", outcome.files_loaded.len());
    for file in &outcome.files_loaded {
        println!("    {}", file.path.display().to_string().bright_black());
    }
    println!("  Rows: {}", table.len().to_string().bright_yellow());
    match table.coverage() {
        Some(span) => println!("  Span: {} .. {}", span.min_time, span.end()),
        None => println!("  Span: {}", "no rows in window".bright_black()),
    }
    println!(
        "  Columns: {} {}",
        table.time_column.bright_cyan(),
        table.column_names().join(", ")
    );
    print_diagnostics(&outcome.diagnostics);
}

fn print_diagnostics(diagnostics: &[ListDiagnostic]) {
    for diagnostic in diagnostics {
        eprintln!(
            "{} {}: {}",
            "Skipped".yellow().bold(),
            diagnostic.path.display(),
            diagnostic.message
        );
    }
}
