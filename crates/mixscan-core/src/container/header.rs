//! MIX directory header parsing.
//!
//! Two layouts exist, both little-endian:
//!
//! ```text
//! legacy:  u16 count (!= 0) | u32 data_size | count * {u32 key, u32 offset, u32 length}
//! new:     u16 0 | u16 flags | legacy body, or 80-byte key block + Blowfish blocks
//! ```
//!
//! Offsets in directory records are relative to the start of the data area,
//! which follows the directory immediately.

use super::ContainerEntry;
use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::collections::HashSet;

/// Size of one directory record
pub(crate) const RECORD_SIZE: usize = 12;

/// Size of the `count` + `data_size` body header
const BODY_HEADER_SIZE: usize = 6;

/// Size of the SHA-1 trailer appended when [`FLAG_CHECKSUM`] is set
pub(crate) const CHECKSUM_SIZE: usize = 20;

/// Size of the RSA-wrapped Blowfish key that precedes an encrypted directory
const KEY_BLOCK_SIZE: usize = 80;

/// Size of the first Blowfish block, which holds the encrypted body header
const CIPHER_BLOCK_SIZE: usize = 8;

/// New-format flag: a SHA-1 digest trails the data area
pub const FLAG_CHECKSUM: u16 = 0x0001;

/// New-format flag: the directory is Blowfish-encrypted
pub const FLAG_ENCRYPTED: u16 = 0x0002;

/// Header flags of a container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ContainerFlags {
    /// Header starts with the zero word of the newer layout
    pub new_format: bool,
    /// Directory is encrypted
    pub encrypted: bool,
    /// A checksum trailer follows the data area
    pub checksum: bool,
}

/// Parsed directory header
#[derive(Debug, Clone)]
pub(crate) struct Header {
    pub(crate) flags: ContainerFlags,
    pub(crate) data_start: usize,
    pub(crate) data_size: u32,
    pub(crate) entries: Vec<ContainerEntry>,
}

impl Header {
    fn sealed(flags: ContainerFlags, data_start: usize) -> Self {
        Self {
            flags,
            data_start,
            data_size: 0,
            entries: Vec::new(),
        }
    }
}

/// Parses and validates the directory header of a container.
pub(crate) fn parse_header(data: &[u8]) -> Result<Header> {
    if data.len() < 2 {
        return Err(Error::invalid_header(0, "stream too short for a header"));
    }

    let first = LittleEndian::read_u16(&data[0..2]);
    let (flags, body_start) = if first != 0 {
        (ContainerFlags::default(), 0)
    } else {
        if data.len() < 4 {
            return Err(Error::invalid_header(2, "truncated flags word"));
        }
        let raw = LittleEndian::read_u16(&data[2..4]);
        if raw & !(FLAG_CHECKSUM | FLAG_ENCRYPTED) != 0 {
            return Err(Error::invalid_header(
                2,
                format!("unknown header flags 0x{raw:04X}"),
            ));
        }
        let flags = ContainerFlags {
            new_format: true,
            encrypted: raw & FLAG_ENCRYPTED != 0,
            checksum: raw & FLAG_CHECKSUM != 0,
        };
        (flags, 4)
    };

    if flags.encrypted {
        // The key block and directory are encrypted; report the flags only.
        if data.len() < body_start + KEY_BLOCK_SIZE + CIPHER_BLOCK_SIZE {
            return Err(Error::invalid_header(body_start, "truncated key block"));
        }
        return Ok(Header::sealed(flags, body_start));
    }

    let body = &data[body_start..];
    if body.len() < BODY_HEADER_SIZE {
        return Err(Error::invalid_header(body_start, "truncated directory header"));
    }

    let count = LittleEndian::read_u16(&body[0..2]) as usize;
    let data_size = LittleEndian::read_u32(&body[2..6]);
    let directory_end = body_start + BODY_HEADER_SIZE + count * RECORD_SIZE;
    if directory_end > data.len() {
        return Err(Error::invalid_header(
            body_start,
            format!(
                "directory of {count} records needs {directory_end} bytes, stream has {}",
                data.len()
            ),
        ));
    }

    let trailer = if flags.checksum { CHECKSUM_SIZE } else { 0 };
    let required = directory_end as u64 + u64::from(data_size) + trailer as u64;
    if required > data.len() as u64 {
        return Err(Error::invalid_header(
            body_start + 2,
            format!(
                "data area of {data_size} bytes exceeds stream length {}",
                data.len()
            ),
        ));
    }

    let mut entries = Vec::with_capacity(count);
    let mut seen = HashSet::with_capacity(count);
    for record in data[body_start + BODY_HEADER_SIZE..directory_end].chunks_exact(RECORD_SIZE) {
        let entry = ContainerEntry {
            key: LittleEndian::read_u32(&record[0..4]),
            offset: LittleEndian::read_u32(&record[4..8]),
            length: LittleEndian::read_u32(&record[8..12]),
        };
        if u64::from(entry.offset) + u64::from(entry.length) > u64::from(data_size) {
            return Err(Error::EntryOutOfBounds {
                key: entry.key,
                offset: entry.offset,
                length: entry.length,
                data_size,
            });
        }
        if !seen.insert(entry.key) {
            return Err(Error::DuplicateKey { key: entry.key });
        }
        entries.push(entry);
    }

    Ok(Header {
        flags,
        data_start: directory_end,
        data_size,
        entries,
    })
}
