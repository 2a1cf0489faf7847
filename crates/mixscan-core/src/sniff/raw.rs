//! Headerless formats recognized by size and value range alone.

use super::{le_u16, Classification, Identification, MapGridLayout, SniffContext};

const PALETTE_SIZE: usize = 768;
const PALETTE_LIMIT: u8 = 0x40;

/// Returns true for 256 RGB triplets with 6-bit components
pub(super) fn is_palette(data: &[u8]) -> bool {
    data.len() == PALETTE_SIZE && data.iter().all(|&b| b < PALETTE_LIMIT)
}

pub(super) fn detect_palette(data: &[u8], _ctx: &SniffContext<'_>) -> Option<Identification> {
    if !is_palette(data) {
        return None;
    }
    Some(Identification::new(
        Classification::RawPalette,
        "6-bit colour palette",
    ))
}

const DENSE_SIZE: usize = 64 * 64 * 2;
const SPARSE_RECORD_SIZE: usize = 4;
const SPARSE_CELLS: u16 = 128 * 128;
const NO_TEMPLATE: u8 = 0xFF;

/// Raw map cell data.
///
/// The dense layout stores `(template, icon)` for each of the 64x64 cells.
/// The sparse layout stores `(u16 cell, template, icon)` records for the
/// used cells of a 128x128 map. Templates are checked against the active
/// game's highest template id.
pub(super) fn detect_map_grid(data: &[u8], ctx: &SniffContext<'_>) -> Option<Identification> {
    let max_template = ctx.catalog.max_template_id(ctx.config.active_variant);
    let valid_template = |t: u8| t == NO_TEMPLATE || u16::from(t) <= max_template;

    if data.len() == DENSE_SIZE && data.iter().step_by(2).all(|&t| valid_template(t)) {
        return Some(Identification::new(
            Classification::RawMap(MapGridLayout::Dense64),
            "Tiberian Dawn 64x64 Map",
        ));
    }

    if data.is_empty() || data.len() % SPARSE_RECORD_SIZE != 0 {
        return None;
    }
    let sparse = data.chunks_exact(SPARSE_RECORD_SIZE).all(|record| {
        le_u16(record, 0).is_some_and(|cell| cell < SPARSE_CELLS) && valid_template(record[2])
    });
    if !sparse {
        return None;
    }
    Some(Identification::new(
        Classification::RawMap(MapGridLayout::Sparse128),
        "Tiberian Dawn / Sole Survivor 128x128 Map",
    ))
}
