//! mixscan - Identify the contents of Westwood MIX archives
//!
//! This tool opens MIX archives, recovers entry filenames where it can and
//! reports what each entry contains.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use mixscan_core::{
    Classification, Container, GameVariant, NameDatabase, ScanReport, Scanner, ScannerConfig,
    SnifferConfig,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Identify the contents of Westwood MIX archives
#[derive(Parser, Debug)]
#[command(name = "mixscan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// File with candidate filenames, one per line ('#' starts a comment)
    #[arg(short, long, env = "MIXSCAN_NAMES")]
    names: Option<PathBuf>,

    /// Game whose template limits apply to raw map data
    #[arg(long, value_enum, default_value = "td")]
    game: Game,

    /// Try mission and map detectors before everything else
    #[arg(long)]
    prefer_missions: bool,

    /// Worker threads per archive (0 = one per CPU)
    #[arg(short, long, default_value = "1")]
    workers: usize,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Also scan archives nested inside other archives
    #[arg(short, long)]
    recursive: bool,

    /// Print a BLAKE3 digest of the report after it
    #[arg(long)]
    digest: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single archive
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory to search for .mix files
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Game selection
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Game {
    /// Tiberian Dawn
    Td,
    /// Red Alert
    Ra,
    /// Sole Survivor
    Sole,
}

impl From<Game> for GameVariant {
    fn from(game: Game) -> Self {
        match game {
            Game::Td => GameVariant::TiberianDawn,
            Game::Ra => GameVariant::RedAlert,
            Game::Sole => GameVariant::SoleSurvivor,
        }
    }
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Aligned columns for reading
    Table,
    /// Tab-separated values (for scripting)
    Tsv,
    /// JSON array of archive reports
    Json,
}

/// Report for one archive, labelled with its path
#[derive(Debug, Serialize)]
struct ArchiveReport {
    #[serde(rename = "archive")]
    label: String,
    #[serde(flatten)]
    report: ScanReport,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("Failed to install Ctrl-C handler")?;

    let candidates = match cli.names {
        Some(ref path) => load_candidates(path)?,
        None => Vec::new(),
    };

    // Dispatch based on input mode
    let reports = if let Some(ref file) = cli.input.file {
        process_single_file(&cli, file, &candidates, &cancel)?
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, directory, &candidates, &cancel)?
    } else {
        bail!("Either --file or --directory must be specified")
    };

    let rendered = render(&reports, cli.format)?;
    print!("{rendered}");
    if cli.digest {
        println!("blake3 {}", blake3::hash(rendered.as_bytes()).to_hex());
    }

    if reports.iter().any(|r| r.report.cancelled) {
        warn!("Scan interrupted; the report is incomplete");
    }
    Ok(())
}

/// Reads a candidate list, skipping blank lines and comments
fn load_candidates(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read name list: {}", path.display()))?;
    let names: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();
    info!("Loaded {} candidate names from {}", names.len(), path.display());
    Ok(names)
}

fn scanner_for(cli: &Cli) -> Scanner {
    let sniffer = SnifferConfig::new()
        .prefer_missions(cli.prefer_missions)
        .active_variant(cli.game.into());
    Scanner::with_config(ScannerConfig::new().sniffer(sniffer).workers(cli.workers))
}

/// Process a single archive
fn process_single_file(
    cli: &Cli,
    file: &Path,
    candidates: &[String],
    cancel: &AtomicBool,
) -> Result<Vec<ArchiveReport>> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    let scanner = scanner_for(cli);
    process_archive(&scanner, file, candidates, cli.recursive, cancel)
}

/// Process every .mix file below a directory
fn process_directory(
    cli: &Cli,
    directory: &Path,
    candidates: &[String],
    cancel: &AtomicBool,
) -> Result<Vec<ArchiveReport>> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let scanner = scanner_for(cli);
    let mut reports = Vec::new();
    let mut archives_processed = 0;

    // Walk the directory in a stable order
    for entry in WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if cancel.load(Ordering::SeqCst) {
            break;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if !is_mix_file(path) {
            trace!("Skipping non-archive: {}", path.display());
            continue;
        }

        debug!("Processing archive: {}", path.display());
        match process_archive(&scanner, path, candidates, cli.recursive, cancel) {
            Ok(found) => reports.extend(found),
            // Log error but continue with other archives
            Err(e) => warn!("Error processing {}: {:#}", path.display(), e),
        }
        archives_processed += 1;
    }

    info!("Processed {} archives", archives_processed);
    Ok(reports)
}

/// Returns true if the path has a `.mix` extension
fn is_mix_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mix"))
}

/// Opens and scans one archive file
fn process_archive(
    scanner: &Scanner,
    path: &Path,
    candidates: &[String],
    recursive: bool,
    cancel: &AtomicBool,
) -> Result<Vec<ArchiveReport>> {
    let container = Container::open(path)
        .with_context(|| format!("Failed to open archive: {}", path.display()))?;

    let mut reports = Vec::new();
    scan_tree(
        scanner,
        &container,
        path.display().to_string(),
        candidates,
        recursive,
        cancel,
        &mut reports,
    );
    Ok(reports)
}

/// Scans a container and, when asked, every container nested inside it
fn scan_tree(
    scanner: &Scanner,
    container: &Container,
    label: String,
    candidates: &[String],
    recursive: bool,
    cancel: &AtomicBool,
    reports: &mut Vec<ArchiveReport>,
) {
    if container.directory_sealed() {
        warn!("{}: directory is encrypted, no entries can be listed", label);
    }

    let names = NameDatabase::resolve(container, candidates);
    let report = scanner.scan_parallel(container, &names, || cancel.load(Ordering::SeqCst));
    info!(
        "{}: {} entries, {} named",
        label,
        report.len(),
        names.len()
    );

    let nested: Vec<_> = if recursive {
        report
            .rows
            .iter()
            .filter(|row| row.classification == Classification::NestedContainer)
            .map(|row| (row.name.clone(), row.entry()))
            .collect()
    } else {
        Vec::new()
    };
    reports.push(ArchiveReport {
        label: label.clone(),
        report,
    });

    for (name, entry) in nested {
        if cancel.load(Ordering::SeqCst) {
            return;
        }
        match container.open_nested(&entry) {
            Ok(child) => scan_tree(
                scanner,
                &child,
                format!("{label}/{name}"),
                candidates,
                recursive,
                cancel,
                reports,
            ),
            Err(e) if e.is_recoverable() => {
                warn!("{}/{}: cannot open nested archive: {}", label, name, e)
            }
            Err(e) => error!("{}/{}: {}", label, name, e),
        }
    }
}

fn render(reports: &[ArchiveReport], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(reports)),
        OutputFormat::Tsv => Ok(render_tsv(reports)),
        OutputFormat::Json => render_json(reports),
    }
}

fn render_table(reports: &[ArchiveReport]) -> String {
    let mut out = String::new();
    for archive in reports {
        let report = &archive.report;
        out.push_str(&format!("{} ({} entries)\n", archive.label, report.len()));
        let width = report
            .rows
            .iter()
            .map(|row| row.name.len())
            .max()
            .unwrap_or(0)
            .max(8);
        for row in &report.rows {
            out.push_str(&format!(
                "  {:<width$}  {:<8} {:>9}  {}\n",
                row.name,
                row.classification.label(),
                row.length,
                row.description,
            ));
        }
        if report.cancelled {
            out.push_str("  (interrupted)\n");
        }
        out.push('\n');
    }
    out
}

fn render_tsv(reports: &[ArchiveReport]) -> String {
    let mut out = String::from("archive\tname\tkey\ttype\tlength\tdescription\n");
    for archive in reports {
        for row in &archive.report.rows {
            out.push_str(&format!(
                "{}\t{}\t{:08X}\t{}\t{}\t{}\n",
                archive.label,
                row.name,
                row.key,
                row.classification.label(),
                row.length,
                row.description.replace('\t', " "),
            ));
        }
    }
    out
}

fn render_json(reports: &[ArchiveReport]) -> Result<String> {
    let mut text = serde_json::to_string_pretty(reports).context("Failed to serialize report")?;
    text.push('\n');
    Ok(text)
}
