//! Builders for byte-exact pack v2 and index v2 files and delta programs.
//!
//! Compiled for this crate's own tests and, through the `test-support`
//! feature, for dependants' tests. The library itself never writes packs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use gitodb_crypto::{crc32, ObjectHasher};
use gitodb_store::testing::deflate;
use gitodb_store::ObjectKind;
use gitodb_types::Digest;

use crate::entry::PackEntryKind;
use crate::index::{PackIndexEntry, IDX_MAGIC, IDX_VERSION};
use crate::reader::{PACK_MAGIC, PACK_VERSION};

/// Size varint (delta header lengths).
pub fn encode_size(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// Pack entry header: 3-bit type code, then the size 4 + 7n bits at a time.
pub fn encode_entry_header(code: u8, size: u64) -> Vec<u8> {
    let mut byte = ((code & 0x07) << 4) | (size & 0x0f) as u8;
    let mut rest = size >> 4;
    let mut out = Vec::new();
    while rest != 0 {
        out.push(byte | 0x80);
        byte = (rest & 0x7f) as u8;
        rest >>= 7;
    }
    out.push(byte);
    out
}

/// OFS_DELTA distance.
pub fn encode_offset(mut value: u64) -> Vec<u8> {
    let mut out = vec![(value & 0x7f) as u8];
    value >>= 7;
    while value != 0 {
        value -= 1;
        out.push(0x80 | (value & 0x7f) as u8);
        value >>= 7;
    }
    out.reverse();
    out
}

/// Index v2 bytes for `entries` (sorted here), with a correct trailer.
pub fn encode_index(entries: &[PackIndexEntry], pack_checksum: [u8; 20]) -> Vec<u8> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|e| e.digest);

    let mut out = IDX_MAGIC.to_vec();
    out.extend_from_slice(&IDX_VERSION.to_be_bytes());
    let mut fan_out = [0u32; 256];
    for entry in &sorted {
        for slot in &mut fan_out[entry.digest.first_byte() as usize..] {
            *slot += 1;
        }
    }
    for count in fan_out {
        out.extend_from_slice(&count.to_be_bytes());
    }
    for entry in &sorted {
        out.extend_from_slice(entry.digest.as_bytes());
    }
    for entry in &sorted {
        out.extend_from_slice(&entry.crc32.to_be_bytes());
    }
    for entry in &sorted {
        out.extend_from_slice(&(entry.offset as u32).to_be_bytes());
    }
    out.extend_from_slice(&pack_checksum);
    let trailer = ObjectHasher::raw_hash(&out);
    out.extend_from_slice(&trailer);
    out
}

/// Assembles a delta program.
#[derive(Clone, Debug)]
pub struct DeltaBuilder {
    out: Vec<u8>,
}

impl DeltaBuilder {
    pub fn new(source_len: usize, target_len: usize) -> Self {
        let mut out = encode_size(source_len as u64);
        out.extend(encode_size(target_len as u64));
        Self { out }
    }

    /// Copy `len` bytes of the base starting at `offset`. Zero bytes are
    /// left out of the opcode, so a `len` of `0x10000` is encoded with no
    /// length bytes at all.
    pub fn copy(mut self, offset: u64, len: u64) -> Self {
        let mut op = 0x80u8;
        let mut args = Vec::new();
        for i in 0..4 {
            let byte = (offset >> (8 * i)) as u8;
            if byte != 0 {
                op |= 1 << i;
                args.push(byte);
            }
        }
        let len = if len == 0x10000 { 0 } else { len };
        for i in 0..3 {
            let byte = (len >> (8 * i)) as u8;
            if byte != 0 {
                op |= 1 << (4 + i);
                args.push(byte);
            }
        }
        self.out.push(op);
        self.out.extend(args);
        self
    }

    /// Insert literal bytes, split into runs of at most 127.
    pub fn insert(mut self, data: &[u8]) -> Self {
        for run in data.chunks(0x7f) {
            self.out.push(run.len() as u8);
            self.out.extend_from_slice(run);
        }
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.out
    }
}

/// Assembles a pack and its index entry by entry.
#[derive(Clone, Debug)]
pub struct PackBuilder {
    body: Vec<u8>,
    entries: Vec<PackIndexEntry>,
}

impl Default for PackBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PackBuilder {
    pub fn new() -> Self {
        let mut body = PACK_MAGIC.to_vec();
        body.extend_from_slice(&PACK_VERSION.to_be_bytes());
        body.extend_from_slice(&0u32.to_be_bytes());
        Self {
            body,
            entries: Vec::new(),
        }
    }

    /// Offset the next entry will be written at.
    pub fn next_offset(&self) -> u64 {
        self.body.len() as u64
    }

    /// Append an entry verbatim: header with `size`, then `base` (distance
    /// or digest bytes), then `payload` deflated. Returns its offset.
    pub fn add_raw_entry(
        &mut self,
        name: Digest,
        kind: PackEntryKind,
        size: u64,
        base: &[u8],
        payload: &[u8],
    ) -> u64 {
        let offset = self.next_offset();
        let mut entry = encode_entry_header(kind.code(), size);
        entry.extend_from_slice(base);
        entry.extend(deflate(payload));
        self.entries.push(PackIndexEntry {
            digest: name,
            offset,
            crc32: crc32(&entry),
        });
        self.body.extend(entry);
        offset
    }

    /// Append a full object. Returns its digest and offset.
    pub fn add_object(&mut self, kind: ObjectKind, data: &[u8]) -> (Digest, u64) {
        let digest = kind.hasher().hash(data);
        let offset = self.add_raw_entry(
            digest,
            PackEntryKind::Full(kind),
            data.len() as u64,
            &[],
            data,
        );
        (digest, offset)
    }

    /// Append an OFS_DELTA entry producing `target` of `kind` from the entry at `base_offset`.
    pub fn add_ofs_delta(
        &mut self,
        base_offset: u64,
        kind: ObjectKind,
        target: &[u8],
        delta: &[u8],
    ) -> (Digest, u64) {
        let digest = kind.hasher().hash(target);
        let distance = encode_offset(self.next_offset() - base_offset);
        let offset = self.add_raw_entry(
            digest,
            PackEntryKind::OfsDelta,
            delta.len() as u64,
            &distance,
            delta,
        );
        (digest, offset)
    }

    /// Append a REF_DELTA entry producing `target` of `kind` from object `base`.
    pub fn add_ref_delta(
        &mut self,
        base: Digest,
        kind: ObjectKind,
        target: &[u8],
        delta: &[u8],
    ) -> (Digest, u64) {
        let digest = kind.hasher().hash(target);
        let offset = self.add_raw_entry(
            digest,
            PackEntryKind::RefDelta,
            delta.len() as u64,
            base.as_bytes(),
            delta,
        );
        (digest, offset)
    }

    /// Pack bytes and index bytes, both with valid trailers.
    pub fn finish(self) -> (Vec<u8>, Vec<u8>) {
        let mut pack = self.body;
        let count = self.entries.len() as u32;
        pack[8..12].copy_from_slice(&count.to_be_bytes());
        let checksum = ObjectHasher::raw_hash(&pack);
        pack.extend_from_slice(&checksum);
        let index = encode_index(&self.entries, checksum);
        (pack, index)
    }

    /// Write `pack-<checksum>.pack` and `.idx` into `pack_dir`.
    pub fn write_to(self, pack_dir: &Path) -> io::Result<(PathBuf, PathBuf)> {
        let (pack, index) = self.finish();
        let name = hex::encode(&pack[pack.len() - 20..]);
        fs::create_dir_all(pack_dir)?;
        let pack_path = pack_dir.join(format!("pack-{name}.pack"));
        let index_path = pack_dir.join(format!("pack-{name}.idx"));
        fs::write(&pack_path, pack)?;
        fs::write(&index_path, index)?;
        Ok((pack_path, index_path))
    }
}
