//! Read-only access to MIX containers.
//!
//! A [`Container`] owns its backing bytes as a [`Bytes`] handle. Entry views
//! and nested containers are slices of that handle, so opening an entry or a
//! child container never copies payload bytes.
//!
//! ```no_run
//! use mixscan_core::Container;
//!
//! let mix = Container::open("conquer.mix")?;
//! for entry in mix.entries() {
//!     let data = mix.read_entry(entry)?;
//!     println!("{:08X}: {} bytes", entry.key, data.len());
//! }
//! # Ok::<(), mixscan_core::Error>(())
//! ```

mod header;

use crate::error::{Error, Result};
use crate::hash::name_key;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::io::{Cursor, Read};
use std::ops::Range;
use std::path::Path;
use tracing::{debug, trace};

pub use header::{ContainerFlags, FLAG_CHECKSUM, FLAG_ENCRYPTED};

/// One directory record of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ContainerEntry {
    /// Filename checksum
    pub key: u32,
    /// Offset relative to the start of the data area
    pub offset: u32,
    /// Payload length in bytes
    pub length: u32,
}

impl ContainerEntry {
    /// Returns the payload length as `usize`
    pub fn len(&self) -> usize {
        self.length as usize
    }

    /// Returns true if the entry has no payload
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Header summary produced by [`Container::inspect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Header flags
    pub flags: ContainerFlags,
    /// Number of readable directory records
    pub entries: usize,
}

/// An opened MIX container
#[derive(Clone)]
pub struct Container {
    data: Bytes,
    flags: ContainerFlags,
    data_start: usize,
    data_size: u32,
    entries: Vec<ContainerEntry>,
    index: HashMap<u32, usize>,
    depth: usize,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("size", &self.data.len())
            .field("flags", &self.flags)
            .field("entries", &self.entries.len())
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl Container {
    /// Opens a container over an in-memory buffer
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        Self::with_depth(data.into(), 0)
    }

    /// Reads a stream to its end and opens it as a container
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Self::from_bytes(buf)
    }

    /// Opens a container file from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
        debug!("Read {} bytes from {}", data.len(), path.display());
        Self::from_bytes(data)
    }

    /// Validates a header without taking ownership of the bytes
    pub fn inspect(data: &[u8]) -> Result<ContainerInfo> {
        let header = header::parse_header(data)?;
        Ok(ContainerInfo {
            flags: header.flags,
            entries: header.entries.len(),
        })
    }

    fn with_depth(data: Bytes, depth: usize) -> Result<Self> {
        let header = header::parse_header(&data)?;

        let index = header
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.key, i))
            .collect();

        debug!(
            "Opened container: {} entries, new format: {}, encrypted: {}, depth {}",
            header.entries.len(),
            header.flags.new_format,
            header.flags.encrypted,
            depth
        );

        Ok(Self {
            data,
            flags: header.flags,
            data_start: header.data_start,
            data_size: header.data_size,
            entries: header.entries,
            index,
            depth,
        })
    }

    /// Number of entries in the directory
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the directory is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Header flags
    pub fn flags(&self) -> ContainerFlags {
        self.flags
    }

    /// Returns true if the encryption flag is set
    pub fn has_encryption(&self) -> bool {
        self.flags.encrypted
    }

    /// Returns true if the header uses the newer layout
    pub fn is_new_format(&self) -> bool {
        self.flags.new_format
    }

    /// Returns true if the directory could not be read because it is encrypted
    pub fn directory_sealed(&self) -> bool {
        self.flags.encrypted
    }

    /// Size of the data area declared by the header
    pub fn data_size(&self) -> u32 {
        self.data_size
    }

    /// Nesting depth; zero for a container opened from a file or buffer
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Keys in directory order
    pub fn keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|e| e.key)
    }

    /// Directory records in directory order
    pub fn entries(&self) -> &[ContainerEntry] {
        &self.entries
    }

    /// All records for a key.
    ///
    /// Keys are unique within one directory, so this holds at most one
    /// record; callers should still treat it as a list.
    pub fn entry_info(&self, key: u32) -> &[ContainerEntry] {
        match self.index.get(&key) {
            Some(&i) => std::slice::from_ref(&self.entries[i]),
            None => &[],
        }
    }

    /// Looks up the record for a key
    pub fn entry(&self, key: u32) -> Result<&ContainerEntry> {
        self.index
            .get(&key)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| Error::not_found(key))
    }

    /// Looks up a record by filename
    pub fn find(&self, name: &str) -> Option<&ContainerEntry> {
        self.entry(name_key(name)).ok()
    }

    /// Returns true if a record exists for the key
    pub fn contains(&self, key: u32) -> bool {
        self.index.contains_key(&key)
    }

    fn entry_range(&self, entry: &ContainerEntry) -> Result<Range<usize>> {
        let start = self.data_start as u64 + u64::from(entry.offset);
        let end = start + u64::from(entry.length);
        if u64::from(entry.offset) + u64::from(entry.length) > u64::from(self.data_size)
            || end > self.data.len() as u64
        {
            return Err(Error::EntryOutOfBounds {
                key: entry.key,
                offset: entry.offset,
                length: entry.length,
                data_size: self.data_size,
            });
        }
        Ok(start as usize..end as usize)
    }

    /// Returns a zero-copy view of an entry's payload
    pub fn read_entry(&self, entry: &ContainerEntry) -> Result<Bytes> {
        let range = self.entry_range(entry)?;
        trace!("Reading entry {:08X} at {:?}", entry.key, range);
        Ok(self.data.slice(range))
    }

    /// Returns a zero-copy view of the payload stored under a key
    pub fn read(&self, key: u32) -> Result<Bytes> {
        let entry = *self.entry(key)?;
        self.read_entry(&entry)
    }

    /// Opens a bounded stream over an entry's payload.
    ///
    /// Reads and seeks on the returned cursor cannot leave the entry.
    pub fn open_entry(&self, entry: &ContainerEntry) -> Result<Cursor<Bytes>> {
        self.read_entry(entry).map(Cursor::new)
    }

    /// Opens a bounded stream over the payload stored under a key
    pub fn open_key(&self, key: u32) -> Result<Cursor<Bytes>> {
        self.read(key).map(Cursor::new)
    }

    /// Opens an entry of this container as a child container.
    ///
    /// The child's backing buffer is a view into this container's buffer.
    pub fn open_nested(&self, entry: &ContainerEntry) -> Result<Container> {
        let view = self.read_entry(entry)?;
        Self::with_depth(view, self.depth + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MixBuilder;
    use std::io::{Seek, SeekFrom};

    fn sample() -> Container {
        let data = MixBuilder::new()
            .named("rules.ini", b"[General]\r\n")
            .entry(0x1234_5678, b"payload")
            .build();
        Container::from_bytes(data).unwrap()
    }

    #[test]
    fn test_directory_access() {
        let mix = sample();
        assert_eq!(mix.len(), 2);
        assert!(!mix.has_encryption());
        assert!(!mix.is_new_format());
        assert_eq!(
            mix.keys().collect::<Vec<_>>(),
            vec![name_key("rules.ini"), 0x1234_5678]
        );
        assert_eq!(mix.entry_info(0x1234_5678).len(), 1);
        assert!(mix.entry_info(0xDEAD_BEEF).is_empty());
    }

    #[test]
    fn test_read_by_name_and_key() {
        let mix = sample();
        let entry = *mix.find("RULES.INI").unwrap();
        assert_eq!(&mix.read_entry(&entry).unwrap()[..], b"[General]\r\n");
        assert_eq!(&mix.read(0x1234_5678).unwrap()[..], b"payload");
    }

    #[test]
    fn test_missing_key() {
        let mix = sample();
        assert!(matches!(
            mix.read(0xDEAD_BEEF),
            Err(Error::NotFound { key: 0xDEAD_BEEF })
        ));
    }

    #[test]
    fn test_open_entry_is_bounded() {
        let mix = sample();
        let mut stream = mix.open_key(0x1234_5678).unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"payload");

        stream.seek(SeekFrom::Start(100)).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_foreign_entry_rejected() {
        let mix = sample();
        let bogus = ContainerEntry {
            key: 1,
            offset: 0,
            length: 10_000,
        };
        assert!(mix.read_entry(&bogus).is_err());
    }

    #[test]
    fn test_nested_container() {
        let inner = MixBuilder::new()
            .entry(1, b"one")
            .entry(2, b"two")
            .build();
        let outer = MixBuilder::new()
            .entry(0x77, b"filler")
            .entry(0x99, &inner)
            .build();

        let mix = Container::from_bytes(outer).unwrap();
        let entry = *mix.entry(0x99).unwrap();
        let child = mix.open_nested(&entry).unwrap();
        assert_eq!(child.depth(), 1);
        assert_eq!(child.len(), 2);
        assert_eq!(&child.read(2).unwrap()[..], b"two");
    }

    #[test]
    fn test_nested_open_failure() {
        let mix = sample();
        let entry = *mix.entry(0x1234_5678).unwrap();
        assert!(mix.open_nested(&entry).unwrap_err().is_format_error());
    }

    #[test]
    fn test_truncated_encrypted_container() {
        let err = Container::from_bytes(vec![0, 0, 2, 0]).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_inspect() {
        let data = MixBuilder::new().checksum().entry(1, b"x").build();
        let info = Container::inspect(&data).unwrap();
        assert!(info.flags.new_format);
        assert!(info.flags.checksum);
        assert_eq!(info.entries, 1);
        assert!(Container::inspect(b"not a mix").is_err());
    }

    #[test]
    fn test_from_reader() {
        let data = MixBuilder::new().entry(3, b"abc").build();
        let mix = Container::from_reader(std::io::Cursor::new(data)).unwrap();
        assert_eq!(&mix.read(3).unwrap()[..], b"abc");
    }

    #[test]
    fn test_open_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mix");
        std::fs::write(&path, MixBuilder::new().entry(5, b"x").build()).unwrap();
        let mix = Container::open(&path).unwrap();
        assert_eq!(mix.len(), 1);

        let missing = Container::open(dir.path().join("absent.mix"));
        assert!(matches!(missing, Err(Error::FileRead { .. })));
    }
}
