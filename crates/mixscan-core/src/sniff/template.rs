//! Tile template detectors.
//!
//! Both games store 24x24 cell images followed by an index that maps grid
//! cells to images. `0xFF` in the index marks an empty cell.

use super::{le_u16, le_u32, plural, Classification, Identification, SniffContext, TemplateKind};

const CELL_SIZE: u16 = 24;
const CELL_BYTES: usize = 24 * 24;
const EMPTY_CELL: u8 = 0xFF;

const TD_HEADER_SIZE: usize = 32;
const TD_MAGIC: u32 = 0x0D1A_FFFF;

const RA_HEADER_SIZE: usize = 40;
const RA_MAGIC: u16 = 0x2C73;
const RA_MAX_LAND_TYPE: u8 = 15;

/// Returns true if every used index points at an image inside the data
fn images_fit(data: &[u8], img_start: usize, index: &[u8]) -> bool {
    index
        .iter()
        .filter(|&&b| b != EMPTY_CELL)
        .all(|&b| img_start + (usize::from(b) + 1) * CELL_BYTES <= data.len())
}

/// Tiberian Dawn template.
///
/// ```text
/// 0x00 u16 width (24)      0x02 u16 height (24)
/// 0x04 u16 count           0x06 u16 reserved
/// 0x08 u32 size            0x0C u32 image start
/// 0x10 u32 zero            0x14 u32 0x0D1AFFFF
/// 0x18 u32 index end       0x1C u32 index start
/// ```
pub(super) fn detect_td_tmp(data: &[u8], _ctx: &SniffContext<'_>) -> Option<Identification> {
    if data.len() < TD_HEADER_SIZE {
        return None;
    }
    if le_u16(data, 0)? != CELL_SIZE || le_u16(data, 2)? != CELL_SIZE {
        return None;
    }
    if le_u32(data, 16)? != 0 || le_u32(data, 20)? != TD_MAGIC {
        return None;
    }

    let img_start = le_u32(data, 12)? as usize;
    let index_end = le_u32(data, 24)? as usize;
    let index_start = le_u32(data, 28)? as usize;
    if img_start < TD_HEADER_SIZE
        || index_start < TD_HEADER_SIZE
        || index_start >= index_end
        || index_end > data.len()
    {
        return None;
    }
    if !images_fit(data, img_start, &data[index_start..index_end]) {
        return None;
    }

    let frames = index_end - index_start;
    Some(Identification::new(
        Classification::TileTemplate(TemplateKind::Td),
        format!("C&C Template; {} frame{}", frames, plural(frames)),
    ))
}

/// Red Alert template.
///
/// ```text
/// 0x00 u16 width (24)      0x02 u16 height (24)
/// 0x04 u16 count           0x06 u16 reserved
/// 0x08 u16 map width       0x0A u16 map height
/// 0x0C u32 size            0x10 u32 image start
/// 0x14 u32 zero            0x18 u16 zero, u16 0x2C73
/// 0x1C u32 index end       0x20 u32 land types
/// 0x24 u32 index start
/// ```
pub(super) fn detect_ra_tmp(data: &[u8], _ctx: &SniffContext<'_>) -> Option<Identification> {
    if data.len() < RA_HEADER_SIZE {
        return None;
    }
    if le_u16(data, 0)? != CELL_SIZE || le_u16(data, 2)? != CELL_SIZE {
        return None;
    }
    if le_u32(data, 20)? != 0 || le_u16(data, 26)? != RA_MAGIC {
        return None;
    }

    let map_width = le_u16(data, 8)?;
    let map_height = le_u16(data, 10)?;
    if map_width == 0 || map_height == 0 {
        return None;
    }

    let img_start = le_u32(data, 16)? as usize;
    let index_end = le_u32(data, 28)? as usize;
    let land_start = le_u32(data, 32)? as usize;
    let index_start = le_u32(data, 36)? as usize;
    if img_start < RA_HEADER_SIZE
        || index_start < RA_HEADER_SIZE
        || index_start >= index_end
        || index_end > data.len()
    {
        return None;
    }

    let cells = index_end - index_start;
    if cells != usize::from(map_width) * usize::from(map_height) {
        return None;
    }
    let land = data.get(land_start..land_start.checked_add(cells)?)?;
    let index = &data[index_start..index_end];
    if !images_fit(data, img_start, index) {
        return None;
    }
    let land_valid = index
        .iter()
        .zip(land)
        .filter(|(cell, _)| **cell != EMPTY_CELL)
        .all(|(_, &kind)| kind <= RA_MAX_LAND_TYPE);
    if !land_valid {
        return None;
    }

    Some(Identification::new(
        Classification::TileTemplate(TemplateKind::Ra),
        format!("RA Template; {}x{}", map_width, map_height),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::GameCatalog;
    use crate::sniff::{DetectFn, SnifferConfig};
    use crate::test_utils;

    fn run(detect: DetectFn, data: &[u8]) -> Option<Identification> {
        let catalog = GameCatalog::classic();
        let config = SnifferConfig::default();
        detect(
            data,
            &SniffContext {
                catalog: &catalog,
                config: &config,
            },
        )
    }

    #[test]
    fn test_td_template() {
        let data = test_utils::td_tmp(&[Some(0), Some(1), None, Some(2)]);
        let found = run(detect_td_tmp, &data).unwrap();
        assert_eq!(
            found.classification,
            Classification::TileTemplate(TemplateKind::Td)
        );
        assert_eq!(found.description, "C&C Template; 4 frames");

        let data = test_utils::td_tmp(&[Some(0)]);
        assert_eq!(
            run(detect_td_tmp, &data).unwrap().description,
            "C&C Template; 1 frame"
        );
    }

    #[test]
    fn test_td_template_rejects_missing_image() {
        let mut data = test_utils::td_tmp(&[Some(0), Some(1)]);
        // Point the last cell past the stored images
        let last = data.len() - 1;
        data[last] = 9;
        assert!(run(detect_td_tmp, &data).is_none());
    }

    #[test]
    fn test_td_template_rejects_wrong_cell_size() {
        let mut data = test_utils::td_tmp(&[Some(0)]);
        data[0] = 16;
        assert!(run(detect_td_tmp, &data).is_none());
    }

    #[test]
    fn test_ra_template() {
        let data = test_utils::ra_tmp(2, 3, 4);
        let found = run(detect_ra_tmp, &data).unwrap();
        assert_eq!(
            found.classification,
            Classification::TileTemplate(TemplateKind::Ra)
        );
        assert_eq!(found.description, "RA Template; 2x3");
    }

    #[test]
    fn test_ra_template_rejects_bad_land_type() {
        let mut data = test_utils::ra_tmp(2, 2, 2);
        let land_start = u32::from_le_bytes(data[32..36].try_into().unwrap()) as usize;
        data[land_start] = 16;
        assert!(run(detect_ra_tmp, &data).is_none());

        // Land type of an empty cell is not checked
        let mut data = test_utils::ra_tmp(2, 2, 2);
        data[land_start + 3] = 0x80;
        assert!(run(detect_ra_tmp, &data).is_some());
    }

    #[test]
    fn test_ra_template_rejects_grid_mismatch() {
        let mut data = test_utils::ra_tmp(2, 2, 1);
        data[8] = 3;
        assert!(run(detect_ra_tmp, &data).is_none());
    }

    #[test]
    fn test_templates_do_not_cross_match() {
        let td = test_utils::td_tmp(&[Some(0), None]);
        let ra = test_utils::ra_tmp(1, 2, 1);
        assert!(run(detect_ra_tmp, &td).is_none());
        assert!(run(detect_td_tmp, &ra).is_none());
    }
}
