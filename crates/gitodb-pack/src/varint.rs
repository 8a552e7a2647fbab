//! The three variable-length integer encodings used by packs.
//!
//! | Encoding | Where | First byte | Continuation |
//! |---|---|---|---|
//! | size | delta header | 7 value bits | `low7 << 7*i` |
//! | entry header | pack entry | 3 type bits + 4 value bits | `low7 << 4 + 7*(i-1)` |
//! | offset | OFS_DELTA base distance | 7 value bits | `((acc + 1) << 7) \| low7` |

use crate::cursor::{ByteCursor, CursorError};

const MSB: u8 = 0x80;
const LOW7: u8 = 0x7f;

/// Little-endian base-128 integer, as used for delta source and target lengths.
pub fn read_size(cur: &mut ByteCursor<'_>) -> Result<u64, CursorError> {
    let start = cur.position();
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = cur.read_u8()?;
        if shift > 63 || (shift > 0 && u64::from(byte & LOW7) >> (64 - shift) != 0) {
            return Err(CursorError::Overflow { at: start });
        }
        value |= u64::from(byte & LOW7) << shift;
        if byte & MSB == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Pack entry header: returns the 3-bit type code and the inflated size.
pub fn read_entry_header(cur: &mut ByteCursor<'_>) -> Result<(u8, u64), CursorError> {
    let start = cur.position();
    let first = cur.read_u8()?;
    let kind = (first >> 4) & 0x07;
    let mut size = u64::from(first & 0x0f);
    let mut shift = 4u32;
    let mut byte = first;
    while byte & MSB != 0 {
        byte = cur.read_u8()?;
        if shift > 63 || u64::from(byte & LOW7) >> (64 - shift) != 0 {
            return Err(CursorError::Overflow { at: start });
        }
        size |= u64::from(byte & LOW7) << shift;
        shift += 7;
    }
    Ok((kind, size))
}

/// Distance from an OFS_DELTA entry back to its base.
///
/// Big-endian base-128 where every continuation adds one before shifting,
/// so no two byte sequences encode the same distance.
pub fn read_offset(cur: &mut ByteCursor<'_>) -> Result<u64, CursorError> {
    let start = cur.position();
    let mut byte = cur.read_u8()?;
    let mut value = u64::from(byte & LOW7);
    while byte & MSB != 0 {
        byte = cur.read_u8()?;
        value = value
            .checked_add(1)
            .and_then(|v| v.checked_mul(1 << 7))
            .ok_or(CursorError::Overflow { at: start })?
            | u64::from(byte & LOW7);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{encode_entry_header, encode_offset, encode_size};
    use proptest::prelude::*;

    fn size(bytes: &[u8]) -> u64 {
        read_size(&mut ByteCursor::new(bytes)).unwrap()
    }

    #[test]
    fn known_two_byte_sizes() {
        assert_eq!(size(&[145, 46]), 5905);
        assert_eq!(size(&[137, 49]), 6281);
    }

    #[test]
    fn size_stops_at_clear_msb() {
        let data = [0x05, 0xff];
        let mut cur = ByteCursor::new(&data);
        assert_eq!(read_size(&mut cur).unwrap(), 5);
        assert_eq!(cur.position(), 1);
    }

    #[test]
    fn size_overflow_is_rejected() {
        let data = [0xff; 11];
        assert!(matches!(
            read_size(&mut ByteCursor::new(&data)).unwrap_err(),
            CursorError::Overflow { at: 0 }
        ));
    }

    #[test]
    fn truncated_size_is_rejected() {
        assert!(matches!(
            read_size(&mut ByteCursor::new(&[0x80])).unwrap_err(),
            CursorError::Truncated { .. }
        ));
    }

    #[test]
    fn entry_header_uses_four_bit_first_group() {
        // commit, size 0x2f2 = 754: 1001_0010 0010_1111
        let data = [0b1001_0010, 0b0010_1111];
        let (kind, size) = read_entry_header(&mut ByteCursor::new(&data)).unwrap();
        assert_eq!(kind, 1);
        assert_eq!(size, 2 | (0x2f << 4));
    }

    #[test]
    fn entry_header_single_byte() {
        // blob of 10 bytes
        let (kind, size) = read_entry_header(&mut ByteCursor::new(&[0x3a])).unwrap();
        assert_eq!((kind, size), (3, 10));
    }

    #[test]
    fn offset_adds_one_per_continuation() {
        // 0x80 0x00 is 128, not 0: the extra term keeps encodings distinct.
        assert_eq!(read_offset(&mut ByteCursor::new(&[0x80, 0x00])).unwrap(), 128);
        assert_eq!(read_offset(&mut ByteCursor::new(&[0x7f])).unwrap(), 127);
        assert_eq!(
            read_offset(&mut ByteCursor::new(&[0x80, 0x80, 0x00])).unwrap(),
            (128 + 1) * 128
        );
    }

    proptest! {
        #[test]
        fn offset_encoding_is_inverse(value in 0u64..(1 << 56)) {
            let bytes = encode_offset(value);
            let mut cur = ByteCursor::new(&bytes);
            prop_assert_eq!(read_offset(&mut cur).unwrap(), value);
            prop_assert!(cur.is_empty());
        }

        #[test]
        fn size_and_header_encodings_are_inverse(value in any::<u32>(), kind in 1u8..8) {
            let bytes = encode_size(u64::from(value));
            prop_assert_eq!(read_size(&mut ByteCursor::new(&bytes)).unwrap(), u64::from(value));

            let header = encode_entry_header(kind, u64::from(value));
            prop_assert_eq!(
                read_entry_header(&mut ByteCursor::new(&header)).unwrap(),
                (kind, u64::from(value))
            );
        }
    }
}
