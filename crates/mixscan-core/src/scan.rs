//! Scanning a whole container into a sorted report.
//!
//! Each entry is read, classified and named independently. Rows are only
//! appended once complete, so a cancelled scan returns a shorter report but
//! never a half-built row.
//!
//! ```no_run
//! use mixscan_core::{Container, NameDatabase, Scanner};
//!
//! let mix = Container::open("conquer.mix")?;
//! let names = NameDatabase::resolve(&mix, ["rules.ini", "conquer.eng"]);
//! let report = Scanner::new().scan(&mix, &names, || false);
//! for row in &report.rows {
//!     println!("{}\t{}\t{}", row.name, row.classification, row.description);
//! }
//! # Ok::<(), mixscan_core::Error>(())
//! ```

use crate::container::{Container, ContainerEntry};
use crate::hash::name_key;
use crate::names::{parse_xcc_names, NameDatabase, XCC_TAG_NAME};
use crate::sniff::{Classification, ClassifyStrategy, Identification, Sniffer, SnifferConfig};
use crossbeam_channel::bounded;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::thread;
use tracing::{debug, trace};

/// One classified entry
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReportRow {
    /// Entry key
    pub key: u32,
    /// Resolved name, or the key in hex
    pub name: String,
    /// Detected type
    pub classification: Classification,
    /// One-line summary; empty for unknown entries
    pub description: String,
    /// Offset within the data area
    pub offset: u32,
    /// Payload length
    pub length: u32,
}

impl ReportRow {
    /// The directory record this row was built from
    pub fn entry(&self) -> ContainerEntry {
        ContainerEntry {
            key: self.key,
            offset: self.offset,
            length: self.length,
        }
    }
}

/// Result of a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScanReport {
    /// Rows in explorer order
    pub rows: Vec<ReportRow>,
    /// True if the scan stopped before every entry was classified
    pub cancelled: bool,
}

impl ScanReport {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the report has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Finds a row by display name, ignoring case
    pub fn find(&self, name: &str) -> Option<&ReportRow> {
        self.rows.iter().find(|row| row.name.eq_ignore_ascii_case(name))
    }

    /// Number of rows per classification, in order of first appearance
    pub fn counts(&self) -> IndexMap<Classification, usize> {
        let mut counts = IndexMap::new();
        for row in &self.rows {
            *counts.entry(row.classification).or_insert(0) += 1;
        }
        counts
    }
}

/// Configuration for the scanner
#[derive(Debug, Clone, Default)]
pub struct ScannerConfig {
    /// Detector settings
    pub sniffer: SnifferConfig,
    /// Worker threads for [`Scanner::scan_parallel`] (0 = one per CPU)
    pub workers: usize,
}

impl ScannerConfig {
    /// Creates a new scanner config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the detector settings
    pub fn sniffer(mut self, sniffer: SnifferConfig) -> Self {
        self.sniffer = sniffer;
        self
    }

    /// Sets the number of worker threads
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

/// Classifies and names every entry of a container
#[derive(Debug, Clone)]
pub struct Scanner<S = Sniffer> {
    config: ScannerConfig,
    strategy: S,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    /// Creates a scanner with the default detector cascade
    pub fn new() -> Self {
        Self::with_config(ScannerConfig::default())
    }

    /// Creates a scanner whose cascade follows `config.sniffer`
    pub fn with_config(config: ScannerConfig) -> Self {
        let strategy = Sniffer::with_config(config.sniffer.clone());
        Self { config, strategy }
    }
}

impl<S: ClassifyStrategy> Scanner<S> {
    /// Creates a scanner around a custom classification strategy
    pub fn with_strategy(config: ScannerConfig, strategy: S) -> Self {
        Self { config, strategy }
    }

    /// Returns the configuration
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    fn classify(&self, container: &Container, entry: &ContainerEntry) -> Identification {
        let data = match container.read_entry(entry) {
            Ok(data) => data,
            Err(e) => {
                trace!("Entry {:08X} unreadable: {}", entry.key, e);
                return Identification::unknown();
            }
        };
        if entry.key == name_key(XCC_TAG_NAME) && parse_xcc_names(&data).is_some() {
            return Identification::new(Classification::NameTable, "XCC filenames database");
        }
        self.strategy.classify(&data)
    }

    fn build_row(
        &self,
        container: &Container,
        names: &NameDatabase,
        entry: &ContainerEntry,
    ) -> ReportRow {
        let found = self.classify(container, entry);
        ReportRow {
            key: entry.key,
            name: names.display_name(entry.key),
            classification: found.classification,
            description: found.description,
            offset: entry.offset,
            length: entry.length,
        }
    }

    /// Resolves names from the embedded table and `candidates`, then scans.
    pub fn scan_with_candidates<I, T>(
        &self,
        container: &Container,
        candidates: I,
        cancel: impl Fn() -> bool,
    ) -> ScanReport
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let names = NameDatabase::resolve(container, candidates);
        self.scan(container, &names, cancel)
    }

    /// Scans every entry on the calling thread.
    ///
    /// `cancel` is polled once before each entry; once it returns true the
    /// rows built so far are returned with `cancelled` set.
    pub fn scan(
        &self,
        container: &Container,
        names: &NameDatabase,
        cancel: impl Fn() -> bool,
    ) -> ScanReport {
        let mut rows = Vec::with_capacity(container.len());
        let mut cancelled = false;
        for entry in container.entries() {
            if cancel() {
                debug!("Scan cancelled after {} of {} entries", rows.len(), container.len());
                cancelled = true;
                break;
            }
            rows.push(self.build_row(container, names, entry));
        }
        sort_rows(&mut rows);
        ScanReport { rows, cancelled }
    }

    fn worker_count(&self) -> usize {
        match self.config.workers {
            0 => thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        }
    }

    /// Scans entries on a pool of worker threads.
    ///
    /// Produces the same report as [`Scanner::scan`]. Every worker polls
    /// `cancel` before taking the next entry.
    pub fn scan_parallel(
        &self,
        container: &Container,
        names: &NameDatabase,
        cancel: impl Fn() -> bool + Sync,
    ) -> ScanReport {
        let workers = self.worker_count().min(container.len());
        if workers <= 1 {
            return self.scan(container, names, cancel);
        }
        debug!("Scanning {} entries on {} workers", container.len(), workers);

        let (job_tx, job_rx) = bounded::<&ContainerEntry>(container.len());
        for entry in container.entries() {
            if job_tx.send(entry).is_err() {
                break;
            }
        }
        drop(job_tx);

        let (row_tx, row_rx) = bounded::<ReportRow>(container.len());
        let stopped = AtomicBool::new(false);
        let stopped = &stopped;
        let cancel = &cancel;

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let row_tx = row_tx.clone();
                scope.spawn(move || {
                    for entry in job_rx.iter() {
                        if stopped.load(AtomicOrdering::Relaxed) || cancel() {
                            stopped.store(true, AtomicOrdering::Relaxed);
                            break;
                        }
                        if row_tx.send(self.build_row(container, names, entry)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(row_tx);

        let mut rows: Vec<ReportRow> = row_rx.iter().collect();
        let cancelled = stopped.load(AtomicOrdering::Relaxed);
        if cancelled {
            debug!("Scan cancelled after {} of {} entries", rows.len(), container.len());
        }
        sort_rows(&mut rows);
        ScanReport { rows, cancelled }
    }
}

fn sort_rows(rows: &mut [ReportRow]) {
    rows.sort_by(|a, b| explorer_cmp(&a.name, &b.name).then(a.key.cmp(&b.key)));
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        run.push(c);
    }
    run
}

/// Compares two digit runs by value without parsing
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        let ord = match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                cmp_digit_runs(&take_digits(&mut a), &take_digits(&mut b))
            }
            (Some(x), Some(y)) => {
                a.next();
                b.next();
                x.to_lowercase().cmp(y.to_lowercase())
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}

/// File-explorer style ordering.
///
/// Case-insensitive, with runs of digits compared by numeric value, so
/// `map2` sorts before `map10`. Names that only differ in case or leading
/// zeros fall back to ordinal order, which keeps the ordering total.
pub fn explorer_cmp(a: &str, b: &str) -> Ordering {
    natural_cmp(a, b).then_with(|| a.cmp(b))
}
