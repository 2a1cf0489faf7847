//! LCW ("format 80") decompression.
//!
//! Command bytes:
//!
//! | Pattern               | Meaning                                        |
//! |-----------------------|------------------------------------------------|
//! | `0ccc pppp` `pppppppp` | copy `c + 3` bytes from `dst - p`             |
//! | `10cc cccc`            | copy `c` literal bytes; `c == 0` ends stream  |
//! | `11cc cccc` `u16 p`    | copy `c + 3` bytes from absolute `p`          |
//! | `0xFE` `u16 n` `u8 v`  | fill `n` bytes with `v`                       |
//! | `0xFF` `u16 n` `u16 p` | copy `n` bytes from absolute `p`              |

/// Decodes an LCW stream, producing at most `limit` bytes.
///
/// Returns `None` on any out-of-bounds read or reference, or if the output
/// would exceed `limit`.
pub fn decode(src: &[u8], limit: usize) -> Option<Vec<u8>> {
    let mut dst: Vec<u8> = Vec::with_capacity(limit);
    let mut pos = 0usize;

    let read_u8 = |pos: &mut usize| -> Option<u8> {
        let b = *src.get(*pos)?;
        *pos += 1;
        Some(b)
    };
    let read_u16 = |pos: &mut usize| -> Option<usize> {
        let lo = *src.get(*pos)?;
        let hi = *src.get(*pos + 1)?;
        *pos += 2;
        Some(usize::from(lo) | (usize::from(hi) << 8))
    };

    while pos < src.len() {
        let cmd = read_u8(&mut pos)?;
        if cmd & 0x80 == 0 {
            let count = usize::from((cmd & 0x70) >> 4) + 3;
            let rel = (usize::from(cmd & 0x0F) << 8) | usize::from(read_u8(&mut pos)?);
            let from = dst.len().checked_sub(rel)?;
            copy_back(&mut dst, from, count, limit)?;
        } else if cmd & 0x40 == 0 {
            let count = usize::from(cmd & 0x3F);
            if count == 0 {
                return Some(dst);
            }
            let lit = src.get(pos..pos + count)?;
            if dst.len() + count > limit {
                return None;
            }
            dst.extend_from_slice(lit);
            pos += count;
        } else if cmd == 0xFE {
            let count = read_u16(&mut pos)?;
            let value = read_u8(&mut pos)?;
            if dst.len() + count > limit {
                return None;
            }
            dst.resize(dst.len() + count, value);
        } else {
            let (count, from) = if cmd == 0xFF {
                let count = read_u16(&mut pos)?;
                (count, read_u16(&mut pos)?)
            } else {
                (usize::from(cmd & 0x3F) + 3, read_u16(&mut pos)?)
            };
            copy_back(&mut dst, from, count, limit)?;
        }
    }

    // Stream ran out without an end marker
    Some(dst)
}

/// Byte-wise copy so overlapping ranges repeat, as the original decoder does.
fn copy_back(dst: &mut Vec<u8>, from: usize, count: usize, limit: usize) -> Option<()> {
    if from >= dst.len() || dst.len() + count > limit {
        return None;
    }
    for i in 0..count {
        let b = dst[from + i];
        dst.push(b);
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_and_end() {
        let src = [0x83, b'a', b'b', b'c', 0x80];
        assert_eq!(decode(&src, 100).unwrap(), b"abc");
    }

    #[test]
    fn test_fill() {
        let src = [0xFE, 0x05, 0x00, 0x7A, 0x80];
        assert_eq!(decode(&src, 100).unwrap(), vec![0x7A; 5]);
    }

    #[test]
    fn test_relative_copy_overlaps() {
        // "ab", then copy 4 bytes from 2 back
        let src = [0x82, b'a', b'b', 0x10, 0x02, 0x80];
        assert_eq!(decode(&src, 100).unwrap(), b"ababab");
    }

    #[test]
    fn test_absolute_copy() {
        // "xyz", then copy 3 bytes from absolute 0
        let src = [0x83, b'x', b'y', b'z', 0xC0, 0x00, 0x00, 0x80];
        assert_eq!(decode(&src, 100).unwrap(), b"xyzxyz");

        let src = [0x82, b'q', b'r', 0xFF, 0x04, 0x00, 0x00, 0x00, 0x80];
        assert_eq!(decode(&src, 100).unwrap(), b"qrqrqr");
    }

    #[test]
    fn test_rejects_bad_references() {
        // Relative copy with nothing decoded yet
        assert!(decode(&[0x00, 0x01], 100).is_none());
        // Absolute copy beyond output
        assert!(decode(&[0x81, b'a', 0xC0, 0x05, 0x00], 100).is_none());
        // Truncated literal
        assert!(decode(&[0x85, b'a'], 100).is_none());
    }

    #[test]
    fn test_respects_limit() {
        let src = [0xFE, 0xFF, 0x00, 0x01, 0x80];
        assert!(decode(&src, 10).is_none());
    }
}
