//! Builders for synthetic containers and payloads used by unit tests.

use crate::hash::name_key;

/// Assembles a MIX container in memory
#[derive(Debug, Default)]
pub(crate) struct MixBuilder {
    entries: Vec<(u32, Vec<u8>)>,
    new_format: bool,
    checksum: bool,
}

impl MixBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn new_format(mut self) -> Self {
        self.new_format = true;
        self
    }

    pub(crate) fn checksum(mut self) -> Self {
        self.new_format = true;
        self.checksum = true;
        self
    }

    pub(crate) fn entry(mut self, key: u32, data: &[u8]) -> Self {
        self.entries.push((key, data.to_vec()));
        self
    }

    pub(crate) fn named(self, name: &str, data: &[u8]) -> Self {
        self.entry(name_key(name), data)
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if self.new_format {
            let flags: u16 = if self.checksum { 0x0001 } else { 0 };
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&flags.to_le_bytes());
        }
        let data_size: usize = self.entries.iter().map(|(_, d)| d.len()).sum();
        out.extend_from_slice(&(self.entries.len() as u16).to_le_bytes());
        out.extend_from_slice(&(data_size as u32).to_le_bytes());

        let mut offset = 0u32;
        for (key, data) in &self.entries {
            out.extend_from_slice(&key.to_le_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            offset += data.len() as u32;
        }
        for (_, data) in &self.entries {
            out.extend_from_slice(data);
        }
        if self.checksum {
            out.extend_from_slice(&[0u8; 20]);
        }
        out
    }
}

/// Builds an XCC filename database entry
pub(crate) fn xcc_database(names: &[&str]) -> Vec<u8> {
    let mut out = b"XCC by Olaf van der Spek\x1a\x04\x17\x27\x10\x19\x80\x00".to_vec();
    out.resize(0x34, 0);
    for name in names {
        out.extend_from_slice(name.as_bytes());
        out.push(0);
    }
    let size = out.len() as u32;
    out[0x20..0x24].copy_from_slice(&size.to_le_bytes());
    out[0x30..0x34].copy_from_slice(&(names.len() as u32).to_le_bytes());
    out
}

/// Builds a Tiberian Dawn SHP whose frames are all raw LCW keyframes
pub(crate) fn td_shp(frames: usize, width: u16, height: u16) -> Vec<u8> {
    let header_len = 14 + (frames + 2) * 8;
    let frame_data: &[u8] = &[0x80];
    let mut out = Vec::new();
    for v in [frames as u16, 0, 0, width, height, 64, 0] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    for i in 0..frames {
        let offset = (header_len + i * frame_data.len()) as u32;
        out.extend_from_slice(&(offset | 0x8000_0000).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
    }
    let eof = (header_len + frames * frame_data.len()) as u32;
    out.extend_from_slice(&eof.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 8]);
    for _ in 0..frames {
        out.extend_from_slice(frame_data);
    }
    out
}

/// Builds a Dune II SHP with 16-bit offsets and uncompressed frames.
///
/// Every byte of the result is below 0x80, so it also decodes as UTF-8.
pub(crate) fn d2_shp(sizes: &[(u8, u8)]) -> Vec<u8> {
    let table_len = 2 + (sizes.len() + 1) * 2;
    let mut frames = Vec::new();
    let mut offsets = Vec::new();
    for &(width, height) in sizes {
        offsets.push(table_len + frames.len() - 2);
        let pixels = usize::from(width) * usize::from(height);
        let frame_size = 10 + pixels;
        frames.extend_from_slice(&2u16.to_le_bytes());
        frames.push(height);
        frames.extend_from_slice(&u16::from(width).to_le_bytes());
        frames.push(height);
        frames.extend_from_slice(&(frame_size as u16).to_le_bytes());
        frames.extend_from_slice(&(pixels as u16).to_le_bytes());
        frames.extend(std::iter::repeat(0x11).take(pixels));
    }
    offsets.push(table_len + frames.len() - 2);

    let mut out = (sizes.len() as u16).to_le_bytes().to_vec();
    for offset in offsets {
        out.extend_from_slice(&(offset as u16).to_le_bytes());
    }
    out.extend_from_slice(&frames);
    out
}

/// Builds an uncompressed 320x200 CPS image
pub(crate) fn cps_raw(with_palette: bool) -> Vec<u8> {
    let palette = if with_palette { 768usize } else { 0 };
    let total = 10 + palette + 64_000;
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&((total - 2) as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&64_000u32.to_le_bytes());
    out.extend_from_slice(&(palette as u16).to_le_bytes());
    out.resize(total, 0x2A);
    out
}

/// Builds a Tiberian Dawn template; `None` cells are empty
pub(crate) fn td_tmp(cells: &[Option<u8>]) -> Vec<u8> {
    let images = cells.iter().flatten().map(|&i| usize::from(i) + 1).max().unwrap_or(0);
    let img_start = 32usize;
    let index_start = img_start + images * 576;
    let index_end = index_start + cells.len();
    let mut out = Vec::new();
    for v in [24u16, 24, cells.len() as u16, 0] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    for v in [
        index_end as u32,
        img_start as u32,
        0,
        0x0D1A_FFFF,
        index_end as u32,
        index_start as u32,
    ] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.resize(index_start, 0x42);
    out.extend(cells.iter().map(|c| c.unwrap_or(0xFF)));
    out
}

/// Builds a Red Alert template with a `map_w` x `map_h` cell grid
pub(crate) fn ra_tmp(map_w: u16, map_h: u16, filled: usize) -> Vec<u8> {
    let cells = usize::from(map_w) * usize::from(map_h);
    let img_start = 40usize;
    let land_start = img_start + filled * 576;
    let index_start = land_start + cells;
    let index_end = index_start + cells;
    let mut out = Vec::new();
    for v in [24u16, 24, cells as u16, 0, map_w, map_h] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    for v in [
        index_end as u32,
        img_start as u32,
        0,
        0x2C73_0000,
        index_end as u32,
        land_start as u32,
        index_start as u32,
    ] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.resize(land_start, 0x42);
    out.extend((0..cells).map(|i| (i % 4) as u8));
    out.extend((0..cells).map(|i| if i < filled { i as u8 } else { 0xFF }));
    out
}

/// Builds a font with `widths.len()` glyphs of the given widths
pub(crate) fn font(widths: &[u8], height: u8) -> Vec<u8> {
    let count = widths.len();
    let offset_block = 20usize;
    let width_block = offset_block + count * 2;
    let height_block = width_block + count;
    let data_block = height_block + count * 2;

    let mut glyphs = Vec::new();
    let mut offsets = Vec::new();
    for &w in widths {
        offsets.push((data_block + glyphs.len()) as u16);
        let size = usize::from(w).div_ceil(2) * usize::from(height);
        glyphs.extend(std::iter::repeat(0x12).take(size));
    }
    let total = data_block + glyphs.len();

    let mut out = Vec::new();
    out.extend_from_slice(&(total as u16).to_le_bytes());
    out.push(0);
    out.push(5);
    for v in [
        0x0Eu16,
        offset_block as u16,
        width_block as u16,
        data_block as u16,
        height_block as u16,
        0x1012,
    ] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.push(0);
    out.push((count - 1) as u8);
    out.push(height);
    out.push(widths.iter().copied().max().unwrap_or(0));
    for offset in offsets {
        out.extend_from_slice(&offset.to_le_bytes());
    }
    out.extend_from_slice(widths);
    for _ in widths {
        out.push(0);
        out.push(height);
    }
    out.extend_from_slice(&glyphs);
    out
}

/// Builds a binary string table from `(id, text)` pairs
pub(crate) fn string_table(records: &[(&str, &str)]) -> Vec<u8> {
    let mut out = (records.len() as u32).to_le_bytes().to_vec();
    for (i, (id, text)) in records.iter().enumerate() {
        out.extend_from_slice(&(i as u32).to_le_bytes());
        out.extend_from_slice(&(text.encode_utf16().count() as u32).to_le_bytes());
        out.extend_from_slice(&(id.len() as u32).to_le_bytes());
    }
    for (_, text) in records {
        for unit in text.encode_utf16() {
            out.extend_from_slice(&unit.to_le_bytes());
        }
    }
    for (id, _) in records {
        out.extend_from_slice(id.as_bytes());
    }
    out
}

/// A 768-byte palette with every component below 0x40
pub(crate) fn palette() -> Vec<u8> {
    (0..768).map(|i| (i % 64) as u8).collect()
}
