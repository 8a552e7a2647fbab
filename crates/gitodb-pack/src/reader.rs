use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use gitodb_crypto::{crc32, TRAILER_LEN};
use gitodb_store::{ObjectKind, RawObject};
use gitodb_types::{Digest, DigestPrefix};
use tracing::{debug, trace};

use crate::cursor::ByteCursor;
use crate::delta;
use crate::entry::{BaseRef, PackEntryKind};
use crate::error::{ObjectError, PackError, PackResult};
use crate::index::{PackIndex, PackIndexEntry};
use crate::options::PackOptions;
use crate::varint::{read_entry_header, read_offset};
use crate::verify;

/// Magic bytes at the start of every pack.
pub const PACK_MAGIC: &[u8; 4] = b"PACK";
pub const PACK_VERSION: u32 = 2;
/// Signature, version and object count.
pub const PACK_HEADER_LEN: usize = 12;

/// One entry of a pack, with its delta chain resolved.
#[derive(Clone, Debug)]
pub struct PackObject {
    /// Name taken from the index.
    pub digest: Digest,
    pub offset: u64,
    /// Inflated size declared in the entry header. For deltas this is the
    /// size of the delta program, not of the object.
    pub size: u64,
    /// Bytes the entry occupies in the pack: header, base reference and
    /// compressed payload.
    pub size_in_pack: u64,
    pub crc32: u32,
    pub entry_kind: PackEntryKind,
    /// Base reference of a delta entry.
    pub base: Option<BaseRef>,
    /// Digest of the immediate base, once found.
    pub base_digest: Option<Digest>,
    /// Object kind after resolution. Deltas inherit it from their base.
    pub kind: Option<ObjectKind>,
    /// Number of delta hops to the nearest full object.
    pub depth: usize,
    /// Why the object could not be reconstructed.
    pub error: Option<ObjectError>,
    raw: Vec<u8>,
    patched: Option<Vec<u8>>,
}

impl PackObject {
    /// Inflated entry payload: the object itself or its delta program.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn is_delta(&self) -> bool {
        self.entry_kind.is_delta()
    }

    /// Reconstructed object content.
    pub fn data(&self) -> Result<&[u8], ObjectError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        Ok(self.patched.as_deref().unwrap_or(&self.raw))
    }

    /// Resolved object kind.
    pub fn object_kind(&self) -> Result<ObjectKind, ObjectError> {
        match (&self.error, self.kind) {
            (Some(err), _) => Err(err.clone()),
            (None, Some(kind)) => Ok(kind),
            (None, None) => Err(ObjectError::BaseFailed {
                base_offset: self.offset,
            }),
        }
    }

    /// Copy out as a raw object.
    pub fn to_raw_object(&self) -> Result<RawObject, ObjectError> {
        let kind = self.object_kind()?;
        Ok(RawObject::new(kind, self.data()?.to_vec()))
    }

    fn resolved(&mut self, kind: ObjectKind, depth: usize, patched: Option<Vec<u8>>) {
        self.kind = Some(kind);
        self.depth = depth;
        self.patched = patched;
    }

    fn failed(&mut self, error: ObjectError) {
        self.error = Some(error);
    }
}

/// A decoded pack and its index.
///
/// Every entry is inflated and every delta chain resolved when the pack is
/// loaded; afterwards the pack is read-only.
#[derive(Debug)]
pub struct PackFile {
    path: Option<PathBuf>,
    index: PackIndex,
    /// Entries in pack offset order.
    objects: Vec<PackObject>,
    by_digest: HashMap<Digest, usize>,
}

impl PackFile {
    /// Load a pack given the path of either its `.pack` or its `.idx` file.
    pub fn open(path: &Path, options: &PackOptions) -> PackResult<Self> {
        let pack_path = path.with_extension("pack");
        let index_path = path.with_extension("idx");
        let index_bytes = std::fs::read(&index_path)?;
        let pack_bytes = std::fs::read(&pack_path)?;
        let mut pack = Self::from_bytes(&pack_bytes, &index_bytes, options)?;
        pack.path = Some(pack_path);
        Ok(pack)
    }

    /// Decode a pack from the raw bytes of the `.pack` and `.idx` files.
    pub fn from_bytes(pack: &[u8], index_bytes: &[u8], options: &PackOptions) -> PackResult<Self> {
        let index = PackIndex::from_bytes(index_bytes)?;
        if options.verify_checksums {
            verify::verify_trailers(pack, index_bytes, &index)?;
        }
        Self::decode(pack, index, options)
    }

    /// Decode every entry named by `index` and resolve all delta chains.
    pub fn decode(pack: &[u8], index: PackIndex, options: &PackOptions) -> PackResult<Self> {
        let count = read_pack_header(pack)?;
        if count as usize != index.object_count() {
            return Err(PackError::IndexMismatch(format!(
                "pack holds {count} objects, index lists {}",
                index.object_count()
            )));
        }
        let body_end = pack.len().saturating_sub(TRAILER_LEN) as u64;

        let mut entries: Vec<PackIndexEntry> = index.entries().collect();
        entries.sort_by_key(|e| e.offset);

        let mut objects = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let end = entries.get(i + 1).map_or(body_end, |next| next.offset);
            let object = decode_entry(pack, entry, end)?;
            if options.verify_checksums {
                let actual = crc32(&pack[entry.offset as usize..end as usize]);
                if actual != entry.crc32 {
                    return Err(PackError::CrcMismatch {
                        digest: entry.digest,
                        offset: entry.offset,
                    });
                }
            }
            objects.push(object);
        }

        resolve_all(&mut objects, options.max_delta_depth);

        let by_digest = objects
            .iter()
            .enumerate()
            .map(|(i, o)| (o.digest, i))
            .collect();
        let pack = Self {
            path: None,
            index,
            objects,
            by_digest,
        };
        debug!(
            objects = pack.objects.len(),
            deltas = pack.objects.iter().filter(|o| o.is_delta()).count(),
            failed = pack.objects.iter().filter(|o| o.error.is_some()).count(),
            "decoded pack"
        );
        Ok(pack)
    }

    /// Path of the `.pack` file, when loaded from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    /// Entries in pack offset order.
    pub fn objects(&self) -> &[PackObject] {
        &self.objects
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn get(&self, digest: &Digest) -> Option<&PackObject> {
        self.by_digest.get(digest).map(|&i| &self.objects[i])
    }

    pub fn contains(&self, digest: &Digest) -> bool {
        self.by_digest.contains_key(digest)
    }

    /// Read a reconstructed object. Objects whose chain failed to resolve
    /// report their stored error.
    pub fn read_raw(&self, digest: &Digest) -> PackResult<Option<RawObject>> {
        self.get(digest)
            .map(|o| {
                o.to_raw_object().map_err(|source| PackError::Object {
                    digest: *digest,
                    source,
                })
            })
            .transpose()
    }

    pub fn kind_of(&self, digest: &Digest) -> PackResult<Option<ObjectKind>> {
        self.get(digest)
            .map(|o| {
                o.object_kind().map_err(|source| PackError::Object {
                    digest: *digest,
                    source,
                })
            })
            .transpose()
    }

    pub fn find_prefix(&self, prefix: &DigestPrefix) -> Vec<Digest> {
        self.index.find_prefix(prefix)
    }
}

/// Check the pack signature and version; returns the object count.
fn read_pack_header(pack: &[u8]) -> PackResult<u32> {
    let mut cur = ByteCursor::new(pack);
    let magic = cur.read_bytes(4).map_err(PackError::at(0))?;
    if magic != PACK_MAGIC {
        return Err(PackError::InvalidMagic {
            file: "pack",
            expected: "PACK".into(),
            actual: String::from_utf8_lossy(magic).into(),
        });
    }
    let version = cur.read_u32_be().map_err(PackError::at(4))?;
    if version != PACK_VERSION {
        return Err(PackError::UnsupportedVersion {
            file: "pack",
            version,
        });
    }
    cur.read_u32_be().map_err(PackError::at(8))
}

/// Decode one entry occupying `[entry.offset, end)`.
fn decode_entry(pack: &[u8], entry: &PackIndexEntry, end: u64) -> PackResult<PackObject> {
    let offset = entry.offset;
    if offset < PACK_HEADER_LEN as u64 || offset >= end || end > pack.len() as u64 {
        return Err(PackError::format(
            offset,
            format!("entry for {} lies outside the pack body", entry.digest),
        ));
    }
    let region = &pack[..end as usize];
    let mut cur = ByteCursor::at(region, offset as usize);

    let (code, size) = read_entry_header(&mut cur).map_err(PackError::at(offset))?;
    let entry_kind = PackEntryKind::from_code(code)
        .ok_or_else(|| PackError::format(offset, format!("reserved entry type {code}")))?;

    let base = match entry_kind {
        PackEntryKind::OfsDelta => {
            let distance = read_offset(&mut cur).map_err(PackError::at(offset))?;
            if distance == 0 || distance > offset {
                return Err(PackError::format(
                    offset,
                    format!("delta base distance {distance} points outside the pack"),
                ));
            }
            Some(BaseRef::Offset(offset - distance))
        }
        PackEntryKind::RefDelta => Some(BaseRef::Digest(
            cur.read_digest().map_err(PackError::at(offset))?,
        )),
        PackEntryKind::Full(_) => None,
    };

    let limit = usize::try_from(size)
        .map_err(|_| PackError::format(offset, format!("entry size {size} does not fit in memory")))?;
    let raw = cur.inflate(limit).map_err(PackError::at(offset))?;
    if raw.len() as u64 != size {
        return Err(PackError::format(
            offset,
            format!("entry inflates to {} bytes, header declares {size}", raw.len()),
        ));
    }

    let (kind, base_digest) = match (entry_kind, base) {
        (PackEntryKind::Full(kind), _) => (Some(kind), None),
        (_, Some(BaseRef::Digest(d))) => (None, Some(d)),
        _ => (None, None),
    };

    Ok(PackObject {
        digest: entry.digest,
        offset,
        size,
        size_in_pack: end - offset,
        crc32: entry.crc32,
        entry_kind,
        base,
        base_digest,
        kind,
        depth: 0,
        error: None,
        raw,
        patched: None,
    })
}

/// Resolve every delta chain, each object at most once.
///
/// For each unresolved object the chain of bases is walked down to the first
/// object that is already resolved or is not a delta, then patched back up.
/// Failures stay with the object they belong to; objects built on a failed
/// base record that instead.
fn resolve_all(objects: &mut [PackObject], max_depth: usize) {
    let by_offset: HashMap<u64, usize> = objects
        .iter()
        .enumerate()
        .map(|(i, o)| (o.offset, i))
        .collect();
    let by_digest: HashMap<Digest, usize> = objects
        .iter()
        .enumerate()
        .map(|(i, o)| (o.digest, i))
        .collect();
    let mut done = vec![false; objects.len()];

    for start in 0..objects.len() {
        if done[start] {
            continue;
        }

        let mut chain = vec![start];
        let mut on_chain = HashSet::from([start]);
        let mut bottom_error = None;
        loop {
            let top = chain[chain.len() - 1];
            let Some(base_ref) = objects[top].base else { break };
            let base = match base_ref {
                BaseRef::Offset(offset) => by_offset.get(&offset),
                BaseRef::Digest(digest) => by_digest.get(&digest),
            };
            let Some(&base) = base else {
                bottom_error = Some(ObjectError::BaseObjectMissing(base_ref));
                break;
            };
            if done[base] {
                break;
            }
            if on_chain.contains(&base) {
                bottom_error = Some(ObjectError::Cycle {
                    offset: objects[base].offset,
                });
                break;
            }
            if chain.len() > max_depth {
                bottom_error = Some(ObjectError::ChainTooDeep { max: max_depth });
                break;
            }
            chain.push(base);
            on_chain.insert(base);
        }

        while let Some(i) = chain.pop() {
            done[i] = true;
            if let Some(err) = bottom_error.take() {
                trace!(offset = objects[i].offset, error = %err, "delta chain failed");
                objects[i].failed(err);
                continue;
            }
            resolve_one(objects, i, &by_offset, &by_digest, max_depth);
        }
    }
}

/// Resolve object `i`, whose base (if any) is already resolved.
fn resolve_one(
    objects: &mut [PackObject],
    i: usize,
    by_offset: &HashMap<u64, usize>,
    by_digest: &HashMap<Digest, usize>,
    max_depth: usize,
) {
    let base = match objects[i].base {
        None => {
            if let PackEntryKind::Full(kind) = objects[i].entry_kind {
                objects[i].resolved(kind, 0, None);
            }
            return;
        }
        Some(BaseRef::Offset(offset)) => by_offset.get(&offset).copied(),
        Some(BaseRef::Digest(digest)) => by_digest.get(&digest).copied(),
    };
    let Some(b) = base else { return };
    let base_digest = objects[b].digest;

    let outcome = {
        let base = &objects[b];
        match (base.object_kind(), base.data()) {
            (Ok(kind), Ok(base_data)) => {
                let depth = base.depth + 1;
                if depth > max_depth {
                    Err(ObjectError::ChainTooDeep { max: max_depth })
                } else {
                    delta::patch(base_data, &objects[i].raw)
                        .map(|data| (kind, depth, data))
                        .map_err(ObjectError::from)
                }
            }
            (Err(err), _) | (_, Err(err)) => Err(match err {
                ObjectError::ChainTooDeep { .. } | ObjectError::Cycle { .. } => err,
                _ => ObjectError::BaseFailed {
                    base_offset: base.offset,
                },
            }),
        }
    };

    let object = &mut objects[i];
    match outcome {
        Ok((kind, depth, data)) => {
            trace!(offset = object.offset, depth, "resolved delta");
            object.base_digest = Some(base_digest);
            object.resolved(kind, depth, Some(data));
        }
        Err(err) => {
            trace!(offset = object.offset, error = %err, "delta failed");
            object.base_digest = Some(base_digest);
            object.failed(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DeltaBuilder, PackBuilder};
    use proptest::prelude::*;

    fn load(builder: PackBuilder) -> PackFile {
        let (pack, idx) = builder.finish();
        PackFile::from_bytes(&pack, &idx, &PackOptions::default()).unwrap()
    }

    /// Rebuild an object by walking its chain and patching every hop again.
    fn patch_without_cache(pack: &PackFile, digest: &Digest) -> Vec<u8> {
        let mut programs = Vec::new();
        let mut current = pack.get(digest).unwrap();
        while let Some(base) = current.base {
            programs.push(current.raw().to_vec());
            current = match base {
                BaseRef::Offset(offset) => pack.objects().iter().find(|o| o.offset == offset).unwrap(),
                BaseRef::Digest(d) => pack.get(&d).unwrap(),
            };
        }
        let mut data = current.raw().to_vec();
        for program in programs.iter().rev() {
            data = delta::patch(&data, program).unwrap();
        }
        data
    }

    const GITIGNORE: &[u8] = b"*.swp\n*.swo\n*.swn\n";

    #[test]
    fn full_objects_decode_at_their_offsets() {
        let mut builder = PackBuilder::new();
        let (blob, blob_at) = builder.add_object(ObjectKind::Blob, GITIGNORE);
        let (tree, tree_at) = builder.add_object(ObjectKind::Tree, b"");
        let pack = load(builder);

        assert_eq!(pack.object_count(), 2);
        assert_eq!(blob_at, PACK_HEADER_LEN as u64);
        let obj = pack.get(&blob).unwrap();
        assert_eq!(obj.offset, blob_at);
        assert_eq!(obj.size, GITIGNORE.len() as u64);
        assert_eq!(obj.size_in_pack, tree_at - blob_at);
        assert_eq!(obj.depth, 0);
        assert_eq!(pack.read_raw(&blob).unwrap().unwrap().data, GITIGNORE);
        assert_eq!(pack.kind_of(&tree).unwrap(), Some(ObjectKind::Tree));
    }

    #[test]
    fn offset_and_ref_deltas_resolve_with_depth() {
        let base = b"package main\n\nfunc main() {\n}\n".to_vec();
        let mid = b"package main\n\nfunc main() {\n\tprintln()\n}\n".to_vec();
        let top = b"package main\n\nimport \"fmt\"\n\nfunc main() {\n\tprintln()\n}\n".to_vec();

        let mut builder = PackBuilder::new();
        let (base_id, base_at) = builder.add_object(ObjectKind::Blob, &base);
        let mid_delta = DeltaBuilder::new(base.len(), mid.len())
            .copy(0, 28)
            .insert(b"\tprintln()\n")
            .copy(28, 2)
            .build();
        let (mid_id, mid_at) = builder.add_ofs_delta(base_at, ObjectKind::Blob, &mid, &mid_delta);
        let top_delta = DeltaBuilder::new(mid.len(), top.len())
            .copy(0, 14)
            .insert(b"import \"fmt\"\n\n")
            .copy(14, mid.len() as u64 - 14)
            .build();
        let (top_id, _) = builder.add_ref_delta(mid_id, ObjectKind::Blob, &top, &top_delta);
        let pack = load(builder);

        let mid_obj = pack.get(&mid_id).unwrap();
        assert_eq!(mid_obj.base, Some(BaseRef::Offset(base_at)));
        assert_eq!(mid_obj.base_digest, Some(base_id));
        assert_eq!(mid_obj.depth, 1);
        assert_eq!(mid_obj.size, mid_delta.len() as u64);
        assert_eq!(mid_obj.offset, mid_at);

        let top_obj = pack.get(&top_id).unwrap();
        assert_eq!(top_obj.depth, 2);
        assert_eq!(top_obj.base_digest, Some(mid_id));
        assert_eq!(top_obj.object_kind().unwrap(), ObjectKind::Blob);
        assert_eq!(top_obj.data().unwrap(), &top[..]);
        assert_eq!(patch_without_cache(&pack, &top_id), top);
    }

    #[test]
    fn delta_before_its_base_still_resolves() {
        let base = b"0123456789abcdef".to_vec();
        let target = b"0123456789ABCDEF".to_vec();
        let base_id = ObjectKind::Blob.hasher().hash(&base);

        let mut builder = PackBuilder::new();
        let delta = DeltaBuilder::new(base.len(), target.len())
            .copy(0, 10)
            .insert(b"ABCDEF")
            .build();
        let (target_id, _) = builder.add_ref_delta(base_id, ObjectKind::Blob, &target, &delta);
        builder.add_object(ObjectKind::Blob, &base);
        let pack = load(builder);

        assert_eq!(pack.get(&target_id).unwrap().data().unwrap(), &target[..]);
    }

    #[test]
    fn missing_base_fails_only_that_object() {
        let absent = Digest::from_hex("05d3cc770bd3524cc25d47e083d8942ad25033f0").unwrap();
        let mut builder = PackBuilder::new();
        let (blob, _) = builder.add_object(ObjectKind::Blob, GITIGNORE);
        let delta = DeltaBuilder::new(4, 2).copy(0, 2).build();
        let (orphan, _) = builder.add_ref_delta(absent, ObjectKind::Blob, b"ab", &delta);
        let pack = load(builder);

        assert!(pack.read_raw(&blob).unwrap().is_some());
        let err = pack.read_raw(&orphan).unwrap_err();
        assert!(matches!(
            err,
            PackError::Object {
                source: ObjectError::BaseObjectMissing(BaseRef::Digest(d)),
                ..
            } if d == absent
        ));
    }

    #[test]
    fn offset_base_inside_another_entry_is_missing() {
        let mut builder = PackBuilder::new();
        let (blob, blob_at) = builder.add_object(ObjectKind::Blob, GITIGNORE);
        let delta = DeltaBuilder::new(GITIGNORE.len(), 5).copy(0, 5).build();
        let stray = ObjectKind::Blob.hasher().hash(b"*.swp");
        let distance = builder.next_offset() - (blob_at + 1);
        builder.add_raw_entry(
            stray,
            PackEntryKind::OfsDelta,
            delta.len() as u64,
            &crate::testing::encode_offset(distance),
            &delta,
        );
        let pack = load(builder);

        assert_eq!(blob_at, 12);
        let obj = pack.get(&stray).unwrap();
        assert_eq!(obj.base, Some(BaseRef::Offset(13)));
        assert_eq!(
            obj.error,
            Some(ObjectError::BaseObjectMissing(BaseRef::Offset(13)))
        );
        assert!(matches!(
            pack.read_raw(&stray).unwrap_err(),
            PackError::Object {
                source: ObjectError::BaseObjectMissing(BaseRef::Offset(13)),
                ..
            }
        ));
        assert_eq!(pack.read_raw(&blob).unwrap().unwrap().data, GITIGNORE);
    }

    #[test]
    fn broken_delta_fails_its_dependants() {
        let mut builder = PackBuilder::new();
        let (_, base_at) = builder.add_object(ObjectKind::Blob, b"abcd");
        let bad = DeltaBuilder::new(4, 8).copy(2, 6).build();
        let (bad_id, bad_at) = builder.add_ofs_delta(base_at, ObjectKind::Blob, b"cdcdcdcd", &bad);
        let next = DeltaBuilder::new(8, 1).copy(0, 1).build();
        let (next_id, _) = builder.add_ofs_delta(bad_at, ObjectKind::Blob, b"c", &next);
        let pack = load(builder);

        assert!(matches!(
            pack.get(&bad_id).unwrap().error,
            Some(ObjectError::Delta(_))
        ));
        assert_eq!(
            pack.get(&next_id).unwrap().error,
            Some(ObjectError::BaseFailed { base_offset: bad_at })
        );
    }

    #[test]
    fn reference_cycle_is_detected() {
        let a = Digest::from_hex("1111111111111111111111111111111111111111").unwrap();
        let b = Digest::from_hex("2222222222222222222222222222222222222222").unwrap();
        let delta = DeltaBuilder::new(1, 1).copy(0, 1).build();
        let mut builder = PackBuilder::new();
        let size = delta.len() as u64;
        builder.add_raw_entry(a, PackEntryKind::RefDelta, size, b.as_bytes(), &delta);
        builder.add_raw_entry(b, PackEntryKind::RefDelta, size, a.as_bytes(), &delta);
        let pack = load(builder);

        for digest in [a, b] {
            assert!(matches!(
                pack.get(&digest).unwrap().error,
                Some(ObjectError::Cycle { .. })
            ));
        }
    }

    #[test]
    fn chain_longer_than_limit_is_rejected() {
        let mut builder = PackBuilder::new();
        let (_, mut at) = builder.add_object(ObjectKind::Blob, b"x");
        let mut ids = Vec::new();
        for _ in 0..4 {
            let delta = DeltaBuilder::new(1, 1).copy(0, 1).build();
            let (id, next_at) = builder.add_ofs_delta(at, ObjectKind::Blob, b"x", &delta);
            ids.push(id);
            at = next_at;
        }
        let (pack, idx) = builder.finish();
        let options = PackOptions {
            max_delta_depth: 2,
            ..PackOptions::default()
        };
        let pack = PackFile::from_bytes(&pack, &idx, &options).unwrap();

        assert_eq!(pack.get(&ids[1]).unwrap().depth, 2);
        for id in &ids[2..] {
            assert_eq!(
                pack.get(id).unwrap().error,
                Some(ObjectError::ChainTooDeep { max: 2 })
            );
        }
    }

    #[test]
    fn bad_signature_and_version() {
        let mut builder = PackBuilder::new();
        builder.add_object(ObjectKind::Blob, b"x");
        let (pack, idx) = builder.finish();

        let mut wrong_magic = pack.clone();
        wrong_magic[..4].copy_from_slice(b"KCAP");
        assert!(matches!(
            PackFile::from_bytes(&wrong_magic, &idx, &PackOptions::default()).unwrap_err(),
            PackError::InvalidMagic { file: "pack", .. }
        ));

        let mut wrong_version = pack;
        wrong_version[7] = 3;
        assert!(matches!(
            PackFile::from_bytes(&wrong_version, &idx, &PackOptions::default()).unwrap_err(),
            PackError::UnsupportedVersion { file: "pack", version: 3 }
        ));
    }

    #[test]
    fn size_mismatch_aborts_the_load() {
        let mut builder = PackBuilder::new();
        builder.add_raw_entry(
            ObjectKind::Blob.hasher().hash(b"abc"),
            PackEntryKind::Full(ObjectKind::Blob),
            5,
            &[],
            b"abc",
        );
        let (pack, idx) = builder.finish();
        assert!(matches!(
            PackFile::from_bytes(&pack, &idx, &PackOptions::default()).unwrap_err(),
            PackError::Format { offset: 12, .. }
        ));
    }

    #[test]
    fn crc_is_checked_when_verifying() {
        let mut builder = PackBuilder::new();
        builder.add_object(ObjectKind::Blob, b"some blob content");
        let (pack, idx) = builder.finish();
        let mut index = PackIndex::from_bytes(&idx).unwrap();
        index.crc32s[0] ^= 1;

        let strict = PackOptions {
            verify_checksums: true,
            ..PackOptions::default()
        };
        assert!(PackFile::decode(&pack, index.clone(), &PackOptions::default()).is_ok());
        assert!(matches!(
            PackFile::decode(&pack, index, &strict).unwrap_err(),
            PackError::CrcMismatch { offset: 12, .. }
        ));
    }

    #[test]
    fn prefix_lookup_uses_index() {
        let mut builder = PackBuilder::new();
        let (blob, _) = builder.add_object(ObjectKind::Blob, GITIGNORE);
        let pack = load(builder);
        let prefix = DigestPrefix::parse(&blob.to_hex()[..6]).unwrap();
        assert_eq!(pack.find_prefix(&prefix), vec![blob]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn memoised_chain_matches_recomputation(
            seed in proptest::collection::vec(any::<u8>(), 1..64),
            edits in proptest::collection::vec((any::<u8>(), 1usize..8), 2..6),
        ) {
            let mut builder = PackBuilder::new();
            let (_, mut at) = builder.add_object(ObjectKind::Blob, &seed);
            let mut current = seed.clone();
            let mut last = None;
            for (byte, repeat) in edits {
                let mut next = current.clone();
                next.extend(std::iter::repeat(byte).take(repeat));
                let delta = DeltaBuilder::new(current.len(), next.len())
                    .copy(0, current.len() as u64)
                    .insert(&vec![byte; repeat])
                    .build();
                let (id, next_at) = builder.add_ofs_delta(at, ObjectKind::Blob, &next, &delta);
                at = next_at;
                current = next;
                last = Some(id);
            }
            let pack = load(builder);
            let top = last.unwrap();
            prop_assert_eq!(pack.get(&top).unwrap().data().unwrap(), &current[..]);
            prop_assert_eq!(patch_without_cache(&pack, &top), current);
        }
    }
}
