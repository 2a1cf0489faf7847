//! INI parsing and mission detection.
//!
//! Section and key lookups ignore ASCII case but keep the first spelling and
//! the original order, so a parsed file can be listed as it was written.

use super::text::decode_cp437;
use super::{Classification, Identification, SniffContext};
use crate::catalog::{GameCatalog, GameVariant};
use indexmap::IndexMap;

/// One `[Section]` of an INI file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniSection {
    name: String,
    entries: IndexMap<String, (String, String)>,
}

impl IniSection {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: IndexMap::new(),
        }
    }

    /// Section name as first written
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a value, ignoring key case
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    /// Returns true if the key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    /// Key/value pairs in file order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the section has no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, key: &str, value: &str) {
        self.entries.insert(
            key.to_ascii_lowercase(),
            (key.to_string(), value.to_string()),
        );
    }
}

/// A parsed INI file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniFile {
    sections: IndexMap<String, IniSection>,
}

impl IniFile {
    /// Parses INI text.
    ///
    /// Parsing never fails. `;` starts a comment, lines that are neither a
    /// section header nor `key=value` are skipped, and keys before the first
    /// section are dropped. Repeated sections are merged and a repeated key
    /// keeps its first position with the last value.
    pub fn parse(text: &str) -> Self {
        let mut ini = Self::default();
        let mut current: Option<String> = None;

        for line in text.lines() {
            let line = match line.find(';') {
                Some(comment) => &line[..comment],
                None => line,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                if let Some(end) = rest.find(']') {
                    let name = rest[..end].trim();
                    let folded = name.to_ascii_lowercase();
                    ini.sections
                        .entry(folded.clone())
                        .or_insert_with(|| IniSection::new(name));
                    current = Some(folded);
                    continue;
                }
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            if let Some(section) = current.as_ref().and_then(|s| ini.sections.get_mut(s)) {
                section.insert(key, value.trim());
            }
        }

        ini
    }

    /// Looks up a section, ignoring case
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.get(&name.to_ascii_lowercase())
    }

    /// Sections in file order
    pub fn sections(&self) -> impl Iterator<Item = &IniSection> {
        self.sections.values()
    }

    /// Number of sections
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Returns true if no section was found
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn has_control_chars(&self) -> bool {
        let bad = |s: &str| s.chars().any(|c| u32::from(c) < 0x20);
        self.sections().any(|section| {
            bad(section.name()) || section.iter().any(|(key, value)| bad(key) || bad(value))
        })
    }
}

/// Decides which game a mission belongs to
fn map_variant(ini: &IniFile, basic: &IniSection) -> GameVariant {
    if ini.section("Crates").is_some() {
        GameVariant::SoleSurvivor
    } else if ini.section("MapPack").is_some() || basic.contains_key("NewINIFormat") {
        GameVariant::RedAlert
    } else {
        GameVariant::TiberianDawn
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn describe_map(
    ini: &IniFile,
    map: &IniSection,
    basic: &IniSection,
    catalog: &GameCatalog,
) -> Identification {
    let variant = map_variant(ini, basic);
    let width = map.get("Width").unwrap_or("?");
    let height = map.get("Height").unwrap_or("?");
    let theater = map.get("Theater").unwrap_or("?");
    let theater = catalog
        .find_theater(variant, theater)
        .map_or(theater, |t| t.name.as_str());

    let mut parts = vec![format!("{width}x{height}"), theater.to_string()];

    // Multiplayer maps only name their player house when they carry a briefing
    if variant != GameVariant::SoleSurvivor {
        let briefed = ini.section("Briefing").is_some_and(|s| !s.is_empty());
        let player = basic
            .get("Player")
            .filter(|p| briefed || !starts_with_ignore_case(p, "Multi"));
        if let Some(player) = player {
            parts.push(catalog.find_house(variant, player).unwrap_or(player).to_string());
        }
    }

    let mut description = format!("{} Map; {}", variant.short_name(), parts.join(", "));
    if let Some(name) = basic.get("Name").filter(|n| !n.is_empty()) {
        description.push_str(&format!(": \"{name}\""));
    }
    Identification::new(Classification::MapConfig(variant), description)
}

/// INI text; missions are recognized by their `[Map]` and `[Basic]` sections.
pub(super) fn detect_ini(data: &[u8], ctx: &SniffContext<'_>) -> Option<Identification> {
    if !data.contains(&b'[') {
        return None;
    }
    let ini = IniFile::parse(&decode_cp437(data));
    if !ini.sections().any(|s| !s.is_empty()) {
        return None;
    }

    if let (Some(map), Some(basic)) = (ini.section("Map"), ini.section("Basic")) {
        return Some(describe_map(&ini, map, basic, ctx.catalog));
    }
    if ini.has_control_chars() {
        return None;
    }
    Some(Identification::new(Classification::GenericConfig, "INI file"))
}
