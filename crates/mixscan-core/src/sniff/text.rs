//! Text detectors and the DOS code page used by the games.

use super::raw::is_palette;
use super::{le_u32, Classification, Identification, SniffContext};

/// Code page 437, bytes 0x80..=0xFF
const CP437_HIGH: [char; 128] = [
    '\u{00C7}', '\u{00FC}', '\u{00E9}', '\u{00E2}', '\u{00E4}', '\u{00E0}', '\u{00E5}', '\u{00E7}',
    '\u{00EA}', '\u{00EB}', '\u{00E8}', '\u{00EF}', '\u{00EE}', '\u{00EC}', '\u{00C4}', '\u{00C5}',
    '\u{00C9}', '\u{00E6}', '\u{00C6}', '\u{00F4}', '\u{00F6}', '\u{00F2}', '\u{00FB}', '\u{00F9}',
    '\u{00FF}', '\u{00D6}', '\u{00DC}', '\u{00A2}', '\u{00A3}', '\u{00A5}', '\u{20A7}', '\u{0192}',
    '\u{00E1}', '\u{00ED}', '\u{00F3}', '\u{00FA}', '\u{00F1}', '\u{00D1}', '\u{00AA}', '\u{00BA}',
    '\u{00BF}', '\u{2310}', '\u{00AC}', '\u{00BD}', '\u{00BC}', '\u{00A1}', '\u{00AB}', '\u{00BB}',
    '\u{2591}', '\u{2592}', '\u{2593}', '\u{2502}', '\u{2524}', '\u{2561}', '\u{2562}', '\u{2556}',
    '\u{2555}', '\u{2563}', '\u{2551}', '\u{2557}', '\u{255D}', '\u{255C}', '\u{255B}', '\u{2510}',
    '\u{2514}', '\u{2534}', '\u{252C}', '\u{251C}', '\u{2500}', '\u{253C}', '\u{255E}', '\u{255F}',
    '\u{255A}', '\u{2554}', '\u{2569}', '\u{2566}', '\u{2560}', '\u{2550}', '\u{256C}', '\u{2567}',
    '\u{2568}', '\u{2564}', '\u{2565}', '\u{2559}', '\u{2558}', '\u{2552}', '\u{2553}', '\u{256B}',
    '\u{256A}', '\u{2518}', '\u{250C}', '\u{2588}', '\u{2584}', '\u{258C}', '\u{2590}', '\u{2580}',
    '\u{03B1}', '\u{00DF}', '\u{0393}', '\u{03C0}', '\u{03A3}', '\u{03C3}', '\u{00B5}', '\u{03C4}',
    '\u{03A6}', '\u{0398}', '\u{03A9}', '\u{03B4}', '\u{221E}', '\u{03C6}', '\u{03B5}', '\u{2229}',
    '\u{2261}', '\u{00B1}', '\u{2265}', '\u{2264}', '\u{2320}', '\u{2321}', '\u{00F7}', '\u{2248}',
    '\u{00B0}', '\u{2219}', '\u{00B7}', '\u{221A}', '\u{207F}', '\u{00B2}', '\u{25A0}', '\u{00A0}',
];

/// Decodes bytes as code page 437.
///
/// Bytes below 0x80 map to ASCII, including control characters.
pub fn decode_cp437(data: &[u8]) -> String {
    data.iter()
        .map(|&b| {
            if b < 0x80 {
                char::from(b)
            } else {
                CP437_HIGH[usize::from(b - 0x80)]
            }
        })
        .collect()
}

/// Control bytes allowed in plain text: tab, LF and CR
fn is_text_control(c: u32) -> bool {
    c < 0x20 && !matches!(c, 0x09 | 0x0A | 0x0D)
}

/// Control units allowed in string tables also include the DOS arrow glyphs
fn is_string_control(c: u16) -> bool {
    c < 0x20 && !matches!(c, 0x09 | 0x0A | 0x0D | 0x10 | 0x11 | 0x1E | 0x1F)
}

const STRING_RECORD_SIZE: usize = 12;

/// Binary string table.
///
/// ```text
/// u32 count
/// count * { u32 key, u32 text_len (UTF-16 units), u32 id_len }
/// UTF-16LE text block
/// ASCII id block
/// ```
///
/// The blocks are packed, so their sizes must add up to the entry length.
pub(super) fn detect_string_table(data: &[u8], _ctx: &SniffContext<'_>) -> Option<Identification> {
    let count = le_u32(data, 0)? as usize;
    if count == 0 {
        return None;
    }
    let records_end = count
        .checked_mul(STRING_RECORD_SIZE)
        .and_then(|n| n.checked_add(4))?;
    if records_end > data.len() {
        return None;
    }

    let mut lengths = Vec::with_capacity(count);
    let mut text_size = 0usize;
    let mut id_size = 0usize;
    for i in 0..count {
        let record = 4 + i * STRING_RECORD_SIZE;
        let text_len = le_u32(data, record + 4)? as usize;
        let id_len = le_u32(data, record + 8)? as usize;
        text_size = text_size.checked_add(text_len.checked_mul(2)?)?;
        id_size = id_size.checked_add(id_len)?;
        lengths.push((text_len, id_len));
    }
    let total = records_end.checked_add(text_size)?.checked_add(id_size)?;
    if total != data.len() {
        return None;
    }

    let mut text_pos = records_end;
    let mut id_pos = records_end + text_size;
    let mut any_text = false;
    for (text_len, id_len) in lengths {
        let units: Vec<u16> = data[text_pos..text_pos + text_len * 2]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        if units.iter().any(|&u| is_string_control(u)) {
            return None;
        }
        if char::decode_utf16(units).any(|c| c.is_err()) {
            return None;
        }

        let id = &data[id_pos..id_pos + id_len];
        if id.is_empty() || !id.iter().all(|&b| (0x20..0x7F).contains(&b)) {
            return None;
        }

        any_text |= text_len > 0;
        text_pos += text_len * 2;
        id_pos += id_len;
    }
    if !any_text {
        return None;
    }

    Some(Identification::new(
        Classification::StringTable,
        format!("Strings File; {} entries", count),
    ))
}

const PREVIEW_CHARS: usize = 80;
const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// Decodes plain text, preferring strict UTF-8 over code page 437
fn decode_text(data: &[u8]) -> Option<String> {
    if let Ok(text) = std::str::from_utf8(data) {
        let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
        if !text.chars().any(|c| is_text_control(u32::from(c))) {
            return Some(text.trim_start_matches(['\r', '\n']).to_string());
        }
        return None;
    }
    if data.iter().any(|&b| is_text_control(u32::from(b))) {
        return None;
    }
    Some(decode_cp437(data).trim_start_matches(['\r', '\n']).to_string())
}

/// Plain ASCII, UTF-8 or code page 437 text.
///
/// The description quotes the first line, cut at 80 characters.
pub(super) fn detect_text(data: &[u8], _ctx: &SniffContext<'_>) -> Option<Identification> {
    // Palette components below 0x40 hold no letters; leave them to the palette check
    if data.is_empty() || is_palette(data) {
        return None;
    }
    let text = decode_text(data)?;

    let chars: Vec<char> = text.chars().collect();
    let cutoff = match chars.iter().position(|&c| c == '\n') {
        Some(line_end) if line_end <= PREVIEW_CHARS => line_end,
        _ => chars.len().min(PREVIEW_CHARS),
    };
    let preview: String = chars[..cutoff].iter().collect();
    let preview = preview.trim_end_matches(['\r', '\n']);

    Some(Identification::new(
        Classification::PlainText,
        format!("Text file: \"{preview}\""),
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
    fn test_cp437() {
        assert_eq!(decode_cp437(b"abc"), "abc");
        assert_eq!(decode_cp437(&[0x80, 0x9B, 0xB0, 0xE1, 0xFF]), "\u{C7}\u{A2}\u{2591}\u{DF}\u{A0}");
        assert_eq!(decode_cp437(&[0x10, 0x11]), "\u{10}\u{11}");
    }

    #[test]
    fn test_string_table() {
        let data = test_utils::string_table(&[
            ("TXT_NONE", ""),
            ("TXT_OK", "OK"),
            ("TXT_CANCEL", "Cancel\r\n\u{10}"),
        ]);
        let found = run(detect_string_table, &data).unwrap();
        assert_eq!(found.classification, Classification::StringTable);
        assert_eq!(found.description, "Strings File; 3 entries");
    }

    #[test]
    fn test_string_table_non_ascii_text() {
        let data = test_utils::string_table(&[("TXT_CAFE", "Caf\u{E9} \u{20AC}")]);
        assert!(run(detect_string_table, &data).is_some());
    }

    #[test]
    fn test_string_table_rejects_bad_layouts() {
        let data = test_utils::string_table(&[("A", "x")]);

        // Trailing byte breaks the exact size
        let mut longer = data.clone();
        longer.push(b'x');
        assert!(run(detect_string_table, &longer).is_none());

        // Control character in the text
        let data = test_utils::string_table(&[("A", "a\u{1}")]);
        assert!(run(detect_string_table, &data).is_none());

        // Empty id
        let data = test_utils::string_table(&[("", "text")]);
        assert!(run(detect_string_table, &data).is_none());

        // Only empty texts
        let data = test_utils::string_table(&[("A", ""), ("B", "")]);
        assert!(run(detect_string_table, &data).is_none());

        // Count that overflows the record table
        assert!(run(detect_string_table, &[0xFF, 0xFF, 0xFF, 0xFF, 0, 0]).is_none());
    }

    #[test]
    fn test_string_table_rejects_lone_surrogate() {
        let mut data = test_utils::string_table(&[("ID", "ab")]);
        let text_at = 4 + 12;
        data[text_at..text_at + 2].copy_from_slice(&0xD800u16.to_le_bytes());
        assert!(run(detect_string_table, &data).is_none());
    }

    #[test]
    fn test_text_preview() {
        let found = run(detect_text, b"\r\n\r\nFirst line\r\nSecond line\r\n").unwrap();
        assert_eq!(found.classification, Classification::PlainText);
        assert_eq!(found.description, "Text file: \"First line\"");
    }

    #[test]
    fn test_text_preview_cut_at_80() {
        let long = "x".repeat(100);
        let found = run(detect_text, long.as_bytes()).unwrap();
        assert_eq!(found.description, format!("Text file: \"{}\"", "x".repeat(80)));

        let late_break = format!("{}\nrest", "y".repeat(90));
        let found = run(detect_text, late_break.as_bytes()).unwrap();
        assert_eq!(found.description, format!("Text file: \"{}\"", "y".repeat(80)));
    }

    #[test]
    fn test_text_utf8_and_bom() {
        let found = run(detect_text, "\u{FEFF}Grüße\n".as_bytes()).unwrap();
        assert_eq!(found.description, "Text file: \"Grüße\"");
    }

    #[test]
    fn test_text_cp437_fallback() {
        let found = run(detect_text, &[b'C', b'a', b'f', 0x82, b'\n']).unwrap();
        assert_eq!(found.description, "Text file: \"Caf\u{E9}\"");
    }

    #[test]
    fn test_text_rejects_control_bytes() {
        assert!(run(detect_text, b"").is_none());
        assert!(run(detect_text, b"abc\x00def").is_none());
        assert!(run(detect_text, &[0x81, 0x1B, 0x41]).is_none());
        assert!(run(detect_text, b"tab\tand\rreturn").is_some());
    }

    #[test]
    fn test_text_leaves_printable_palette() {
        let palette: Vec<u8> = (0..768).map(|i| 0x20 + (i % 32) as u8).collect();
        assert!(run(detect_text, &palette).is_none());
        // Same bytes one short of a palette are still text
        assert!(run(detect_text, &palette[..767]).is_some());
    }
}
