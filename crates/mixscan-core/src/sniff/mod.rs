//! Content identification for container entries.
//!
//! ## Algorithm Overview
//!
//! Each entry is run through an ordered cascade of detectors. A detector is a
//! pure function from the entry's bytes to an optional [`Identification`];
//! the first detector that returns a match wins. The order puts the most
//! structurally strict formats first so that permissive detectors (text,
//! raw grids) cannot claim data a strict detector would also accept:
//!
//! 1. Sprite series (C&C SHP, Dune II SHP)
//! 2. Full-screen CPS image
//! 3. Tile templates (C&C, Red Alert)
//! 4. Font
//! 5. INI text, including map configurations
//! 6. Binary string table
//! 7. Plain text
//! 8. 6-bit palette
//! 9. Raw map grid
//!
//! If nothing matches, or the entry is too large to buffer, the bytes are
//! probed as a nested container. Anything left over is
//! [`Classification::Unknown`].
//!
//! ## Extensibility
//!
//! The [`ClassifyStrategy`] trait allows replacing the whole cascade:
//!
//! ```no_run
//! use mixscan_core::sniff::{ClassifyStrategy, Identification};
//!
//! struct Everything;
//!
//! impl ClassifyStrategy for Everything {
//!     fn classify(&self, _data: &[u8]) -> Identification {
//!         Identification::unknown()
//!     }
//! }
//! ```

mod font;
mod ini;
pub mod lcw;
mod raw;
mod sprite;
mod template;
mod text;

use crate::catalog::{GameCatalog, GameVariant};
use crate::container::{Container, ContainerEntry};
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;
use tracing::trace;

pub use ini::{IniFile, IniSection};
pub use text::decode_cp437;

/// Entries at or above this size skip the byte cascade (5 MiB)
pub const DEFAULT_MAX_BUFFERED_SIZE: usize = 0x50_0000;

/// Sprite encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SpriteKind {
    /// Tiberian Dawn / Red Alert keyframe SHP
    Td,
    /// Dune II SHP
    DuneII,
}

/// Tile template encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TemplateKind {
    /// Tiberian Dawn template
    Td,
    /// Red Alert template with land types
    Ra,
}

/// Raw map grid layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum MapGridLayout {
    /// 64x64 cells of `(template, icon)`
    Dense64,
    /// `(cell, template, icon, pad)` records on a 128x128 grid
    Sparse128,
}

/// What an entry was identified as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Classification {
    /// No detector matched
    Unknown,
    /// The entry is itself a container
    NestedContainer,
    /// Mission / map INI
    MapConfig(GameVariant),
    /// Any other INI text
    GenericConfig,
    /// Binary string table
    StringTable,
    /// Plain text
    PlainText,
    /// Frame-based sprite
    SpriteSeries(SpriteKind),
    /// Full-screen CPS bitmap
    SingleImage,
    /// Tile template
    TileTemplate(TemplateKind),
    /// Bitmap font
    Font,
    /// 768-byte 6-bit palette
    RawPalette,
    /// Headerless map cell data
    RawMap(MapGridLayout),
    /// Embedded XCC filename database
    NameTable,
}

impl Classification {
    /// Short label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Unknown => "Unknown",
            Classification::NestedContainer => "Mix",
            Classification::MapConfig(GameVariant::TiberianDawn) => "MapTd",
            Classification::MapConfig(GameVariant::RedAlert) => "MapRa",
            Classification::MapConfig(GameVariant::SoleSurvivor) => "MapSole",
            Classification::GenericConfig => "Ini",
            Classification::StringTable => "Strings",
            Classification::PlainText => "Text",
            Classification::SpriteSeries(SpriteKind::Td) => "ShpTd",
            Classification::SpriteSeries(SpriteKind::DuneII) => "ShpD2",
            Classification::SingleImage => "Cps",
            Classification::TileTemplate(TemplateKind::Td) => "TmpTd",
            Classification::TileTemplate(TemplateKind::Ra) => "TmpRa",
            Classification::Font => "Font",
            Classification::RawPalette => "Palette",
            Classification::RawMap(MapGridLayout::Dense64) => "Bin",
            Classification::RawMap(MapGridLayout::Sparse128) => "BinSole",
            Classification::NameTable => "XccNames",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification plus a one-line description
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Identification {
    /// The detected type
    pub classification: Classification,
    /// Human-readable summary
    pub description: String,
}

impl Identification {
    /// Creates a new identification
    pub fn new(classification: Classification, description: impl Into<String>) -> Self {
        Self {
            classification,
            description: description.into(),
        }
    }

    /// The result when nothing matches
    pub fn unknown() -> Self {
        Self::new(Classification::Unknown, String::new())
    }
}

/// Configuration for the sniffer
#[derive(Debug, Clone)]
pub struct SnifferConfig {
    /// Entries of this size or larger are only probed as containers
    pub max_buffered_size: usize,
    /// Run the INI and raw map detectors before everything else
    pub prefer_missions: bool,
    /// Game whose template limits apply to raw map grids
    pub active_variant: GameVariant,
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            max_buffered_size: DEFAULT_MAX_BUFFERED_SIZE,
            prefer_missions: false,
            active_variant: GameVariant::TiberianDawn,
        }
    }
}

impl SnifferConfig {
    /// Creates a new sniffer config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the buffering cutoff
    pub fn max_buffered_size(mut self, size: usize) -> Self {
        self.max_buffered_size = size;
        self
    }

    /// Sets whether mission detectors run first
    pub fn prefer_missions(mut self, prefer: bool) -> Self {
        self.prefer_missions = prefer;
        self
    }

    /// Sets the game used for raw map grids
    pub fn active_variant(mut self, variant: GameVariant) -> Self {
        self.active_variant = variant;
        self
    }
}

/// Read-only context handed to every detector
#[derive(Debug, Clone, Copy)]
pub struct SniffContext<'a> {
    /// Per-game lookup tables
    pub catalog: &'a GameCatalog,
    /// Sniffer configuration
    pub config: &'a SnifferConfig,
}

/// Signature of a detector
pub type DetectFn = fn(&[u8], &SniffContext<'_>) -> Option<Identification>;

/// A named detector in the cascade
#[derive(Clone, Copy)]
pub struct Detector {
    /// Identifier used in logs
    pub name: &'static str,
    /// The detection function
    pub detect: DetectFn,
}

impl fmt::Debug for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Detector").field(&self.name).finish()
    }
}

const SHP_TD: Detector = Detector {
    name: "shp-td",
    detect: sprite::detect_td_shp,
};
const SHP_D2: Detector = Detector {
    name: "shp-d2",
    detect: sprite::detect_d2_shp,
};
const CPS: Detector = Detector {
    name: "cps",
    detect: sprite::detect_cps,
};
const TMP_TD: Detector = Detector {
    name: "tmp-td",
    detect: template::detect_td_tmp,
};
const TMP_RA: Detector = Detector {
    name: "tmp-ra",
    detect: template::detect_ra_tmp,
};
const FONT: Detector = Detector {
    name: "font",
    detect: font::detect_font,
};
const INI: Detector = Detector {
    name: "ini",
    detect: ini::detect_ini,
};
const STRINGS: Detector = Detector {
    name: "strings",
    detect: text::detect_string_table,
};
const TEXT: Detector = Detector {
    name: "text",
    detect: text::detect_text,
};
const PALETTE: Detector = Detector {
    name: "palette",
    detect: raw::detect_palette,
};
const MAP_GRID: Detector = Detector {
    name: "map-grid",
    detect: raw::detect_map_grid,
};

/// Default cascade order
pub const DEFAULT_CASCADE: [Detector; 11] = [
    SHP_TD, SHP_D2, CPS, TMP_TD, TMP_RA, FONT, INI, STRINGS, TEXT, PALETTE, MAP_GRID,
];

/// Cascade order when missions are preferred
pub const MISSION_CASCADE: [Detector; 11] = [
    INI, MAP_GRID, SHP_TD, SHP_D2, CPS, TMP_TD, TMP_RA, FONT, STRINGS, TEXT, PALETTE,
];

/// Trait for implementing custom classification strategies
pub trait ClassifyStrategy: Send + Sync {
    /// Classify one entry's bytes
    fn classify(&self, data: &[u8]) -> Identification;
}

/// The default detector cascade
#[derive(Debug, Clone, Default)]
pub struct Sniffer {
    config: SnifferConfig,
    catalog: GameCatalog,
}

impl Sniffer {
    /// Creates a sniffer with default configuration and the classic catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sniffer with custom configuration
    pub fn with_config(config: SnifferConfig) -> Self {
        Self {
            config,
            catalog: GameCatalog::classic(),
        }
    }

    /// Replaces the catalog
    pub fn catalog(mut self, catalog: GameCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Returns the configuration
    pub fn config(&self) -> &SnifferConfig {
        &self.config
    }

    /// Returns the detectors in the order they will run
    pub fn cascade(&self) -> &'static [Detector] {
        if self.config.prefer_missions {
            &MISSION_CASCADE
        } else {
            &DEFAULT_CASCADE
        }
    }

    fn context(&self) -> SniffContext<'_> {
        SniffContext {
            catalog: &self.catalog,
            config: &self.config,
        }
    }

    /// Classifies an entry of a container
    pub fn classify_entry(&self, container: &Container, entry: &ContainerEntry) -> Identification {
        match container.read_entry(entry) {
            Ok(data) => self.classify(&data),
            Err(e) => {
                trace!("Entry {:08X} unreadable: {}", entry.key, e);
                Identification::unknown()
            }
        }
    }
}

impl ClassifyStrategy for Sniffer {
    fn classify(&self, data: &[u8]) -> Identification {
        if data.len() < self.config.max_buffered_size {
            let ctx = self.context();
            if let Some((detector, found)) = self
                .cascade()
                .iter()
                .find_map(|d| (d.detect)(data, &ctx).map(|found| (d, found)))
            {
                trace!("Matched {} ({} bytes)", detector.name, data.len());
                return found;
            }
        } else {
            trace!("Skipping cascade for {} byte entry", data.len());
        }

        detect_nested(data).unwrap_or_else(Identification::unknown)
    }
}

/// Probes the bytes as a container and summarizes its header.
fn detect_nested(data: &[u8]) -> Option<Identification> {
    let info = Container::inspect(data).ok()?;
    let description = if info.flags.encrypted {
        "Mix file; new format; encrypted.".to_string()
    } else if info.flags.new_format {
        format!("Mix file; new format; not encrypted; {} files.", info.entries)
    } else {
        format!("Mix file; {} files.", info.entries)
    };
    Some(Identification::new(
        Classification::NestedContainer,
        description,
    ))
}

pub(crate) fn le_u16(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset.checked_add(2)?)
        .map(LittleEndian::read_u16)
}

pub(crate) fn le_u32(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset.checked_add(4)?)
        .map(LittleEndian::read_u32)
}

/// Appends "s" for counts other than one
pub(crate) fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
