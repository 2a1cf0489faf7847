//! Filename checksum used as the entry key in MIX archives.
//!
//! The archive stores no filenames, only a 32-bit key per entry. The key is
//! derived from the uppercased name, padded with NUL bytes to a multiple of
//! four and folded as little-endian words:
//!
//! ```text
//! acc = 0
//! for word in words:
//!     acc = rotl(acc, 1) + word   (wrapping)
//! ```
//!
//! Every lookup by name and all name recovery depend on this being exact.

use byteorder::{ByteOrder, LittleEndian};

/// Computes the archive key for a filename.
///
/// Case-insensitive over all of Unicode: the name is uppercased first, then
/// every non-ASCII character becomes a single `?` byte. Total over any input,
/// including the empty string.
pub fn name_key(name: &str) -> u32 {
    let mut padded: Vec<u8> = name
        .to_uppercase()
        .chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect();
    let rem = padded.len() % 4;
    if rem != 0 {
        padded.resize(padded.len() + 4 - rem, 0);
    }

    padded
        .chunks_exact(4)
        .map(LittleEndian::read_u32)
        .fold(0u32, |acc, word| acc.rotate_left(1).wrapping_add(word))
}

/// Formats a key the way unresolved entries are displayed.
pub fn format_key(key: u32) -> String {
    format!("{key:08X}")
}
