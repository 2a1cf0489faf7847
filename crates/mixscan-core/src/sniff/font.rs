//! 4-bit bitmap font detector.

use super::{le_u16, Classification, Identification, SniffContext};

const FONT_HEADER_SIZE: usize = 20;
const FONT_MAGIC: u16 = 0x0E;

/// C&C 4-bit font.
///
/// ```text
/// 0x00 u16 size            0x02 u8 0, u8 5
/// 0x04 u16 0x0E            0x06 u16 offset block (20)
/// 0x08 u16 width block     0x0A u16 data block
/// 0x0C u16 height block    0x0E u16 unknown
/// 0x10 u8 0                0x11 u8 last symbol
/// 0x12 u8 max height       0x13 u8 max width
/// ```
///
/// Glyphs are stored at 4 bits per pixel, rows padded to whole bytes. Each
/// height record is `{ u8 y offset, u8 height }`.
pub(super) fn detect_font(data: &[u8], _ctx: &SniffContext<'_>) -> Option<Identification> {
    if data.len() < FONT_HEADER_SIZE {
        return None;
    }
    if usize::from(le_u16(data, 0)?) != data.len() || data[2] != 0 || data[3] != 5 {
        return None;
    }
    if le_u16(data, 4)? != FONT_MAGIC || usize::from(le_u16(data, 6)?) != FONT_HEADER_SIZE {
        return None;
    }

    let width_block = usize::from(le_u16(data, 8)?);
    let data_block = usize::from(le_u16(data, 10)?);
    let height_block = usize::from(le_u16(data, 12)?);
    let count = usize::from(data[17]) + 1;
    let max_height = data[18];

    if width_block != FONT_HEADER_SIZE + count * 2
        || width_block + count > data.len()
        || height_block + count * 2 > data.len()
        || data_block > data.len()
    {
        return None;
    }

    let mut max_width = 0u8;
    for i in 0..count {
        let offset = usize::from(le_u16(data, FONT_HEADER_SIZE + i * 2)?);
        let width = data[width_block + i];
        let height = data[height_block + i * 2 + 1];
        if width == 0 || height == 0 {
            continue;
        }
        let size = usize::from(width).div_ceil(2) * usize::from(height);
        if offset + size > data.len() || height > max_height {
            return None;
        }
        max_width = max_width.max(width);
    }

    Some(Identification::new(
        Classification::Font,
        format!("Font; {} symbols, {}x{}", count, max_width, max_height),
    ))
}
