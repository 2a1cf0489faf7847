//! # mixscan-core
//!
//! A library for inspecting Westwood MIX archives.
//!
//! This crate provides the core functionality for:
//! - Reading MIX container directories and entry payloads without copying
//! - Recovering filenames from the key checksums the archives store
//! - Identifying what each entry contains (sprites, templates, maps, text...)
//! - Producing a sorted, per-entry report for a whole archive
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`hash`]: The filename checksum used as entry key
//! - [`container`]: Directory parsing and bounded entry access
//! - [`names`]: Filename recovery from embedded and external name lists
//! - [`sniff`]: The content detector cascade
//! - [`catalog`]: Per-game theater, house and template tables
//! - [`scan`]: Whole-container scanning and report ordering
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use mixscan_core::{Container, NameDatabase, Scanner};
//!
//! let mix = Container::open("general.mix")?;
//! let names = NameDatabase::resolve(&mix, ["rules.ini", "conquer.eng"]);
//!
//! let report = Scanner::new().scan(&mix, &names, || false);
//! for row in &report.rows {
//!     println!("{:<16} {:<8} {}", row.name, row.classification, row.description);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`ClassifyStrategy`]: Replace the detector cascade
//! - [`GameCatalog::modify_or_add_theater`]: Register mod theaters
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod catalog;
pub mod container;
pub mod error;
pub mod hash;
pub mod names;
pub mod scan;
pub mod sniff;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export primary types for convenience
pub use catalog::{GameCatalog, GameVariant, TheaterType};
pub use container::{Container, ContainerEntry, ContainerFlags, ContainerInfo};
pub use error::{Error, Result};
pub use hash::{format_key, name_key};
pub use names::{NameDatabase, NameSource, XCC_TAG_NAME};
pub use scan::{explorer_cmp, ReportRow, ScanReport, Scanner, ScannerConfig};
pub use sniff::{Classification, ClassifyStrategy, Identification, Sniffer, SnifferConfig};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
