//! Filename recovery for container keys.
//!
//! A container only stores checksums. Names come from two places, in this
//! order:
//!
//! 1. An XCC filename database stored inside the container as
//!    `local mix database.dat`.
//! 2. A caller-supplied list of candidate names. A candidate is kept only if
//!    its checksum matches a key that is still unresolved.
//!
//! Names are never guessed; every stored name hashes to its key.

use crate::container::Container;
use crate::hash::{format_key, name_key};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Name under which the XCC database is stored
pub const XCC_TAG_NAME: &str = "local mix database.dat";

const XCC_SIGNATURE: &[u8] = b"XCC by Olaf van der Spek";
const XCC_SIZE_OFFSET: usize = 0x20;
const XCC_NAMES_OFFSET: usize = 0x34;
const XCC_MAX_SIZE: usize = 500_000;

/// Where a resolved name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum NameSource {
    /// The container's own XCC database
    Embedded,
    /// The caller's candidate list
    External,
}

/// Parses an XCC filename database.
///
/// Returns `None` unless the signature matches and the declared size equals
/// the buffer length. Names that are not ASCII are skipped.
pub fn parse_xcc_names(data: &[u8]) -> Option<Vec<String>> {
    if data.len() <= XCC_NAMES_OFFSET || data.len() >= XCC_MAX_SIZE {
        return None;
    }
    if !data.starts_with(XCC_SIGNATURE) {
        return None;
    }
    let declared = crate::sniff::le_u32(data, XCC_SIZE_OFFSET)?;
    if declared as usize != data.len() {
        return None;
    }

    let names = data[XCC_NAMES_OFFSET..]
        .split(|&b| b == 0)
        .filter(|name| !name.is_empty())
        .filter_map(|name| {
            if name.is_ascii() {
                // ASCII is always valid UTF-8
                std::str::from_utf8(name).ok().map(str::to_string)
            } else {
                trace!("Skipping non-ASCII name in XCC database");
                None
            }
        })
        .collect();
    Some(names)
}

/// Resolved names for the keys of one container
#[derive(Debug, Clone, Default)]
pub struct NameDatabase {
    names: HashMap<u32, (String, NameSource)>,
}

impl NameDatabase {
    /// Creates an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves names for a container.
    ///
    /// Never fails. A missing or damaged XCC database only means there are no
    /// embedded names; candidates are then matched against what is left.
    pub fn resolve<I, S>(container: &Container, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut db = Self::new();
        let embedded = db.insert_embedded(container);
        let external = db.insert_candidates(container, candidates);
        debug!(
            "Resolved {} of {} names ({} embedded, {} from candidates)",
            db.len(),
            container.len(),
            embedded,
            external
        );
        db
    }

    fn insert_embedded(&mut self, container: &Container) -> usize {
        let Some(entry) = container.find(XCC_TAG_NAME) else {
            return 0;
        };
        let names = match container.read_entry(entry) {
            Ok(data) => parse_xcc_names(&data),
            Err(e) => {
                debug!("XCC database unreadable: {}", e);
                None
            }
        };
        let Some(names) = names else {
            debug!("Entry {:08X} is not a valid XCC database", entry.key);
            return 0;
        };

        let mut added = self.insert(entry.key, XCC_TAG_NAME, NameSource::Embedded) as usize;
        for name in names {
            let key = name_key(&name);
            if container.contains(key) && self.insert(key, &name, NameSource::Embedded) {
                added += 1;
            }
        }
        added
    }

    /// Adds candidates whose checksum matches an unresolved key.
    ///
    /// Returns the number of newly resolved keys.
    pub fn insert_candidates<I, S>(&mut self, container: &Container, candidates: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for candidate in candidates {
            let name = candidate.as_ref();
            let key = name_key(name);
            if container.contains(key) && self.insert(key, name, NameSource::External) {
                trace!("Candidate {} matches {:08X}", name, key);
                added += 1;
            }
        }
        added
    }

    /// Stores a name unless the key already has one
    fn insert(&mut self, key: u32, name: &str, source: NameSource) -> bool {
        if self.names.contains_key(&key) {
            return false;
        }
        self.names.insert(key, (name.to_string(), source));
        true
    }

    /// The resolved name for a key
    pub fn name_for(&self, key: u32) -> Option<&str> {
        self.names.get(&key).map(|(name, _)| name.as_str())
    }

    /// The resolved name, or the key as eight uppercase hex digits
    pub fn display_name(&self, key: u32) -> String {
        match self.name_for(key) {
            Some(name) => name.to_string(),
            None => format_key(key),
        }
    }

    /// Where the name for a key came from
    pub fn source_of(&self, key: u32) -> Option<NameSource> {
        self.names.get(&key).map(|&(_, source)| source)
    }

    /// Number of resolved keys
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if nothing was resolved
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All resolved `(key, name)` pairs, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names.iter().map(|(&key, (name, _))| (key, name.as_str()))
    }
}
