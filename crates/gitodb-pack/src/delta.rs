//! Git delta programs.
//!
//! A delta is `<source length> <target length>` as size varints followed by
//! opcodes. An opcode with the top bit set copies a range of the base; bits
//! 0-3 say which little-endian offset bytes follow and bits 4-6 which length
//! bytes follow. Any other non-zero opcode inserts that many literal bytes.

use crate::cursor::ByteCursor;
use crate::error::DeltaError;
use crate::varint::read_size;

/// Copy length used when no length bytes are present.
pub const DEFAULT_COPY_LEN: u64 = 0x10000;

const COPY: u8 = 0x80;

/// The two lengths at the start of a delta.
pub fn header(delta: &[u8]) -> Result<(u64, u64), DeltaError> {
    let mut cur = ByteCursor::new(delta);
    Ok((read_size(&mut cur)?, read_size(&mut cur)?))
}

/// Apply a delta program to its base.
pub fn patch(base: &[u8], delta: &[u8]) -> Result<Vec<u8>, DeltaError> {
    let mut cur = ByteCursor::new(delta);
    let source_len = read_size(&mut cur)?;
    let target_len = read_size(&mut cur)?;
    if source_len != base.len() as u64 {
        return Err(DeltaError::SourceLength {
            expected: source_len,
            actual: base.len(),
        });
    }

    let mut out = Vec::with_capacity(target_len.min(1 << 26) as usize);
    while !cur.is_empty() {
        let at = cur.position();
        let op = cur.read_u8()?;

        if op & COPY != 0 {
            let mut offset = 0u64;
            for i in 0..4 {
                if op & (1 << i) != 0 {
                    offset |= u64::from(cur.read_u8()?) << (8 * i);
                }
            }
            let mut len = 0u64;
            for i in 0..3 {
                if op & (1 << (4 + i)) != 0 {
                    len |= u64::from(cur.read_u8()?) << (8 * i);
                }
            }
            if len == 0 {
                len = DEFAULT_COPY_LEN;
            }
            let end = offset + len;
            if end > base.len() as u64 {
                return Err(DeltaError::CopyOutOfRange {
                    offset,
                    len,
                    base_len: base.len(),
                });
            }
            out.extend_from_slice(&base[offset as usize..end as usize]);
        } else if op == 0 {
            return Err(DeltaError::ReservedOpcode { at });
        } else {
            out.extend_from_slice(cur.read_bytes(usize::from(op))?);
        }

        if out.len() as u64 > target_len {
            return Err(DeltaError::TargetLength {
                expected: target_len,
                actual: out.len(),
            });
        }
    }

    if out.len() as u64 != target_len {
        return Err(DeltaError::TargetLength {
            expected: target_len,
            actual: out.len(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::DeltaBuilder;

    const BASE: &[u8] = b"*.swp\n*.swo\n";

    #[test]
    fn copy_and_insert() {
        let delta = DeltaBuilder::new(BASE.len(), 19)
            .copy(0, 12)
            .insert(b"*.swn\n")
            .insert(b"!")
            .build();
        assert_eq!(patch(BASE, &delta).unwrap(), b"*.swp\n*.swo\n*.swn\n!");
    }

    #[test]
    fn hand_written_program() {
        // source 12, target 8, copy 6 bytes from offset 6, insert "ab"
        let delta = [12, 8, 0x80 | 0x01 | 0x10, 6, 6, 2, b'a', b'b'];
        assert_eq!(patch(BASE, &delta).unwrap(), b"*.swo\nab");
    }

    #[test]
    fn copy_without_offset_bytes_starts_at_zero() {
        // 0x90: no offset bytes, one length byte
        let delta = [12, 5, 0x90, 5];
        assert_eq!(patch(BASE, &delta).unwrap(), b"*.swp");
    }

    #[test]
    fn zero_length_copy_means_64k() {
        let base: Vec<u8> = (0..0x10000u32).map(|i| (i % 256) as u8).collect();
        let mut delta = crate::testing::encode_size(base.len() as u64);
        delta.extend(crate::testing::encode_size(0x10000));
        delta.push(0x80);
        assert_eq!(patch(&base, &delta).unwrap(), base);
    }

    #[test]
    fn reserved_opcode_is_rejected() {
        let delta = [12, 1, 0x00];
        assert_eq!(
            patch(BASE, &delta).unwrap_err(),
            DeltaError::ReservedOpcode { at: 2 }
        );
    }

    #[test]
    fn source_length_must_match_base() {
        let delta = DeltaBuilder::new(11, 1).insert(b"x").build();
        assert_eq!(
            patch(BASE, &delta).unwrap_err(),
            DeltaError::SourceLength {
                expected: 11,
                actual: 12
            }
        );
    }

    #[test]
    fn copy_past_base_is_rejected() {
        let delta = DeltaBuilder::new(BASE.len(), 4).copy(10, 4).build();
        assert!(matches!(
            patch(BASE, &delta).unwrap_err(),
            DeltaError::CopyOutOfRange { offset: 10, len: 4, .. }
        ));
    }

    #[test]
    fn output_must_match_target_length() {
        let short = DeltaBuilder::new(BASE.len(), 10).copy(0, 5).build();
        assert!(matches!(
            patch(BASE, &short).unwrap_err(),
            DeltaError::TargetLength { expected: 10, actual: 5 }
        ));
        let long = DeltaBuilder::new(BASE.len(), 3).copy(0, 5).build();
        assert!(matches!(
            patch(BASE, &long).unwrap_err(),
            DeltaError::TargetLength { expected: 3, .. }
        ));
    }

    #[test]
    fn truncated_insert_is_rejected() {
        let delta = [12, 5, 5, b'a', b'b'];
        assert!(matches!(
            patch(BASE, &delta).unwrap_err(),
            DeltaError::Truncated { .. }
        ));
    }

    #[test]
    fn header_reads_both_lengths() {
        let delta = DeltaBuilder::new(5905, 6281).build();
        assert_eq!(header(&delta).unwrap(), (5905, 6281));
        assert_eq!(&delta[..4], &[145, 46, 137, 49]);
    }
}
