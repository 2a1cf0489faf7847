//! Sprite series and full-screen image detectors.

use super::{
    le_u16, le_u32, lcw, plural, Classification, Identification, SniffContext, SpriteKind,
};

const SHP_HEADER_SIZE: usize = 14;
const SHP_RECORD_SIZE: usize = 8;

const FORMAT_LCW: u8 = 0x80;
const FORMAT_XOR_BASE: u8 = 0x40;
const FORMAT_XOR_PREV: u8 = 0x20;

/// C&C keyframe SHP.
///
/// ```text
/// u16 frames, u16 x, u16 y, u16 width, u16 height, u16 delta, u16 flags
/// (frames + 2) * { u24 offset, u8 format, u24 ref, u8 ref_format }
/// ```
///
/// The record after the last frame holds the file length.
pub(super) fn detect_td_shp(data: &[u8], _ctx: &SniffContext<'_>) -> Option<Identification> {
    let frames = usize::from(le_u16(data, 0)?);
    let width = le_u16(data, 6)?;
    let height = le_u16(data, 8)?;
    if frames == 0 || width == 0 || height == 0 {
        return None;
    }

    let header_end = SHP_HEADER_SIZE + (frames + 2) * SHP_RECORD_SIZE;
    if header_end > data.len() {
        return None;
    }

    let eof = le_u32(data, SHP_HEADER_SIZE + frames * SHP_RECORD_SIZE)?;
    if eof as usize != data.len() {
        return None;
    }

    let mut keyframes = Vec::new();
    let mut previous = header_end;
    for i in 0..frames {
        let record = SHP_HEADER_SIZE + i * SHP_RECORD_SIZE;
        let word = le_u32(data, record)?;
        let offset = (word & 0x00FF_FFFF) as usize;
        let format = (word >> 24) as u8;
        let reference = (le_u32(data, record + 4)? & 0x00FF_FFFF) as usize;

        if offset < previous || offset >= data.len() {
            return None;
        }
        match format {
            FORMAT_LCW => keyframes.push(offset),
            FORMAT_XOR_BASE if keyframes.contains(&reference) => {}
            FORMAT_XOR_PREV if i > 0 => {}
            _ => return None,
        }
        previous = offset;
    }

    Some(Identification::new(
        Classification::SpriteSeries(SpriteKind::Td),
        format!(
            "C&C SHP; {} frame{}, {}x{}",
            frames,
            plural(frames),
            width,
            height
        ),
    ))
}

const D2_FRAME_HEADER_SIZE: usize = 10;

/// Reads the Dune II offset table with the given entry width.
///
/// Offsets are relative to byte 2; the last one marks the end of the file.
fn d2_offsets(data: &[u8], frames: usize, width: usize) -> Option<Vec<usize>> {
    let table_end = 2 + (frames + 1) * width;
    if table_end > data.len() {
        return None;
    }
    let offsets = (0..=frames)
        .map(|i| {
            let at = 2 + i * width;
            let value = if width == 4 {
                le_u32(data, at)? as usize
            } else {
                usize::from(le_u16(data, at)?)
            };
            value.checked_add(2)
        })
        .collect::<Option<Vec<_>>>()?;

    let valid = offsets.last() == Some(&data.len())
        && offsets[0] >= table_end
        && offsets.windows(2).all(|w| w[0] < w[1]);
    valid.then_some(offsets)
}

/// Dune II SHP.
///
/// ```text
/// u16 frames
/// (frames + 1) * u32 offset   (u16 in the earliest releases)
/// per frame: u16 flags, u8 slices, u16 width, u8 height, u16 frame_size, u16 data_size
/// ```
pub(super) fn detect_d2_shp(data: &[u8], _ctx: &SniffContext<'_>) -> Option<Identification> {
    let frames = usize::from(le_u16(data, 0)?);
    if frames == 0 {
        return None;
    }

    let (max_width, max_height) = [4, 2]
        .into_iter()
        .find_map(|width| d2_frame_bounds(data, &d2_offsets(data, frames, width)?))?;

    Some(Identification::new(
        Classification::SpriteSeries(SpriteKind::DuneII),
        format!(
            "Dune II SHP; {} frame{}, {}x{}",
            frames,
            plural(frames),
            max_width,
            max_height
        ),
    ))
}

/// Validates every frame header and returns the largest width and height.
fn d2_frame_bounds(data: &[u8], offsets: &[usize]) -> Option<(u16, u8)> {
    let mut max_width = 0;
    let mut max_height = 0;
    for span in offsets.windows(2) {
        let frame = &data[span[0]..span[1]];
        if frame.len() < D2_FRAME_HEADER_SIZE {
            return None;
        }
        let flags = le_u16(frame, 0)?;
        let slices = frame[2];
        let width = le_u16(frame, 3)?;
        let height = frame[5];
        let frame_size = usize::from(le_u16(frame, 6)?);
        if flags > 7 || width == 0 || height == 0 || slices != height {
            return None;
        }
        if frame_size < D2_FRAME_HEADER_SIZE || frame_size > frame.len() {
            return None;
        }
        if flags & 0x01 != 0 {
            // Remap table; its size is stored in the first byte when flag 4 is set
            let remap = if flags & 0x04 != 0 {
                usize::from(*frame.get(D2_FRAME_HEADER_SIZE)?)
            } else {
                16
            };
            if D2_FRAME_HEADER_SIZE + remap > frame_size {
                return None;
            }
        }
        max_width = max_width.max(width);
        max_height = max_height.max(height);
    }
    Some((max_width, max_height))
}

const CPS_HEADER_SIZE: usize = 10;
const CPS_IMAGE_SIZE: usize = 320 * 200;
const CPS_PALETTE_SIZE: usize = 768;

/// Full-screen CPS image.
///
/// ```text
/// u16 size (file length - 2), u16 compression (0 = none, 4 = LCW),
/// u32 image size (64000), u16 palette size (0 or 768)
/// ```
pub(super) fn detect_cps(data: &[u8], _ctx: &SniffContext<'_>) -> Option<Identification> {
    let size = usize::from(le_u16(data, 0)?);
    let compression = le_u16(data, 2)?;
    let image_size = le_u32(data, 4)? as usize;
    let palette = usize::from(le_u16(data, 8)?);

    if size + 2 != data.len() || image_size != CPS_IMAGE_SIZE {
        return None;
    }
    if palette != 0 && palette != CPS_PALETTE_SIZE {
        return None;
    }
    let payload = data.get(CPS_HEADER_SIZE + palette..)?;

    let valid = match compression {
        0 => payload.len() == CPS_IMAGE_SIZE,
        4 => lcw::decode(payload, CPS_IMAGE_SIZE).is_some_and(|img| img.len() == CPS_IMAGE_SIZE),
        _ => false,
    };
    if !valid {
        return None;
    }

    let mut description = "CPS; 320x200".to_string();
    if palette != 0 {
        description.push_str("; with palette");
    }
    Some(Identification::new(Classification::SingleImage, description))
}
