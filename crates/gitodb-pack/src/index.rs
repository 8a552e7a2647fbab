use std::path::Path;

use gitodb_crypto::{verify_trailer, TRAILER_LEN};
use gitodb_types::{Digest, DigestPrefix};
use serde::Serialize;

use crate::cursor::ByteCursor;
use crate::error::{PackError, PackResult};

/// Magic bytes of a version 2 index: `\377tOc`.
pub const IDX_MAGIC: [u8; 4] = [0xff, 0x74, 0x4f, 0x63];
pub const IDX_VERSION: u32 = 2;

/// Offsets with this bit set point into the 64-bit offset table.
const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

/// One object listed in an index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PackIndexEntry {
    pub digest: Digest,
    /// Byte offset of the entry header in the `.pack` file.
    pub offset: u64,
    /// CRC-32 of the whole packed entry.
    pub crc32: u32,
}

/// Decoded pack index (`.idx`, version 2).
///
/// Layout:
/// - magic `\377tOc`, version 2
/// - fan-out table: 256 big-endian cumulative counts by first digest byte
/// - N sorted raw digests
/// - N CRC-32 values
/// - N 31-bit offsets
/// - pack checksum, index checksum
#[derive(Clone, Debug)]
pub struct PackIndex {
    pub fan_out: [u32; 256],
    pub digests: Vec<Digest>,
    pub crc32s: Vec<u32>,
    pub offsets: Vec<u64>,
    /// SHA-1 of the `.pack` file body this index describes.
    pub pack_checksum: [u8; TRAILER_LEN],
    /// SHA-1 of the index itself.
    pub index_checksum: [u8; TRAILER_LEN],
}

impl PackIndex {
    /// Read and decode an index file.
    pub fn open(path: &Path) -> PackResult<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    /// Decode an index. Fields are read strictly in file order.
    pub fn from_bytes(data: &[u8]) -> PackResult<Self> {
        let mut cur = ByteCursor::new(data);

        let magic = cur.read_bytes(4).map_err(PackError::at(0))?;
        if magic != IDX_MAGIC {
            return Err(PackError::InvalidMagic {
                file: "index",
                expected: hex::encode(IDX_MAGIC),
                actual: hex::encode(magic),
            });
        }
        let version = cur.read_u32_be().map_err(PackError::at(4))?;
        if version != IDX_VERSION {
            return Err(PackError::UnsupportedVersion {
                file: "index",
                version,
            });
        }

        let mut fan_out = [0u32; 256];
        let mut previous = 0;
        for (bucket, slot) in fan_out.iter_mut().enumerate() {
            let at = cur.position() as u64;
            *slot = cur.read_u32_be().map_err(PackError::at(at))?;
            if *slot < previous {
                return Err(PackError::format(
                    at,
                    format!("fan-out count for {bucket:02x} decreases"),
                ));
            }
            previous = *slot;
        }

        let count = fan_out[255] as usize;
        let table_len = count
            .checked_mul(20 + 4 + 4)
            .and_then(|n| n.checked_add(2 * TRAILER_LEN))
            .unwrap_or(usize::MAX);
        if cur.remaining() < table_len {
            return Err(PackError::format(
                cur.position() as u64,
                format!(
                    "index lists {count} objects but only {} bytes follow the fan-out table",
                    cur.remaining()
                ),
            ));
        }

        let mut digests = Vec::with_capacity(count);
        for _ in 0..count {
            let at = cur.position() as u64;
            digests.push(cur.read_digest().map_err(PackError::at(at))?);
        }

        let mut crc32s = Vec::with_capacity(count);
        for _ in 0..count {
            let at = cur.position() as u64;
            crc32s.push(cur.read_u32_be().map_err(PackError::at(at))?);
        }

        let mut offsets = Vec::with_capacity(count);
        for position in 0..count {
            let at = cur.position() as u64;
            let raw = cur.read_u32_be().map_err(PackError::at(at))?;
            if raw & LARGE_OFFSET_FLAG != 0 {
                return Err(PackError::LargeOffset { position });
            }
            offsets.push(u64::from(raw));
        }

        let at = cur.position() as u64;
        let mut pack_checksum = [0u8; TRAILER_LEN];
        pack_checksum.copy_from_slice(cur.read_bytes(TRAILER_LEN).map_err(PackError::at(at))?);
        let mut index_checksum = [0u8; TRAILER_LEN];
        index_checksum.copy_from_slice(cur.read_bytes(TRAILER_LEN).map_err(PackError::at(at))?);

        if !cur.is_empty() {
            return Err(PackError::format(
                cur.position() as u64,
                format!("{} unexpected bytes after index checksum", cur.remaining()),
            ));
        }

        Ok(Self {
            fan_out,
            digests,
            crc32s,
            offsets,
            pack_checksum,
            index_checksum,
        })
    }

    /// Total object count.
    pub fn object_count(&self) -> usize {
        self.digests.len()
    }

    /// Fan-out bucket `[start, end)` for a first digest byte.
    fn bucket(&self, first_byte: u8) -> (usize, usize) {
        let b = first_byte as usize;
        let start = if b == 0 { 0 } else { self.fan_out[b - 1] as usize };
        let end = self.fan_out[b] as usize;
        (start.min(end), end.min(self.digests.len()))
    }

    /// Position of `digest` in the sorted tables.
    pub fn position(&self, digest: &Digest) -> Option<usize> {
        let (start, end) = self.bucket(digest.first_byte());
        self.digests[start..end]
            .binary_search(digest)
            .ok()
            .map(|i| start + i)
    }

    /// Look up an object's entry by digest.
    pub fn lookup(&self, digest: &Digest) -> Option<PackIndexEntry> {
        self.position(digest).map(|i| self.entry(i))
    }

    pub fn contains(&self, digest: &Digest) -> bool {
        self.position(digest).is_some()
    }

    /// The `i`-th entry in digest order.
    pub fn entry(&self, i: usize) -> PackIndexEntry {
        PackIndexEntry {
            digest: self.digests[i],
            offset: self.offsets[i],
            crc32: self.crc32s[i],
        }
    }

    /// All entries in digest order.
    pub fn entries(&self) -> impl Iterator<Item = PackIndexEntry> + '_ {
        (0..self.object_count()).map(|i| self.entry(i))
    }

    /// Digests starting with `prefix`, in sorted order.
    pub fn find_prefix(&self, prefix: &DigestPrefix) -> Vec<Digest> {
        let (start, end) = self.bucket(prefix.first_byte());
        let bucket = &self.digests[start..end];
        let lower = prefix.lower_bound();
        let first = bucket.partition_point(|d| *d < lower);
        bucket[first..]
            .iter()
            .take_while(|d| prefix.matches(d))
            .copied()
            .collect()
    }

    /// Check the index's own trailer against its bytes.
    pub fn verify_checksum(data: &[u8]) -> PackResult<()> {
        if verify_trailer(data) {
            Ok(())
        } else {
            Err(PackError::ChecksumMismatch { file: "index" })
        }
    }
}
