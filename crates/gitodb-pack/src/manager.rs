use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use gitodb_store::{ObjectKind, ObjectStore, RawObject};
use gitodb_types::{Digest, DigestPrefix};
use tracing::{debug, warn};

use crate::error::{PackError, PackResult};
use crate::options::PackOptions;
use crate::reader::PackFile;

/// A discovered `pack-*.pack` / `pack-*.idx` pair.
///
/// The pack is decoded on first access and cached for the lifetime of the
/// set. A pack skipped as corrupt is remembered as absent.
#[derive(Debug)]
struct LazyPack {
    index_path: PathBuf,
    loaded: OnceLock<Option<PackFile>>,
}

/// All packs of one object database.
#[derive(Debug)]
pub struct PackSet {
    pack_dir: PathBuf,
    options: PackOptions,
    packs: Vec<LazyPack>,
}

impl PackSet {
    /// Find the packs in `<objects>/pack`. Nothing is decoded yet.
    pub fn discover(objects_dir: &Path, options: PackOptions) -> PackResult<Self> {
        let pack_dir = objects_dir.join("pack");
        let mut index_paths = Vec::new();

        if pack_dir.is_dir() {
            for entry in std::fs::read_dir(&pack_dir)? {
                let path = entry?.path();
                if path.extension().map(|e| e == "idx").unwrap_or(false)
                    && path.with_extension("pack").is_file()
                {
                    index_paths.push(path);
                }
            }
        }
        index_paths.sort();
        debug!(dir = %pack_dir.display(), packs = index_paths.len(), "discovered packs");

        Ok(Self {
            pack_dir,
            options,
            packs: index_paths
                .into_iter()
                .map(|index_path| LazyPack {
                    index_path,
                    loaded: OnceLock::new(),
                })
                .collect(),
        })
    }

    /// A set with no packs.
    pub fn empty() -> Self {
        Self {
            pack_dir: PathBuf::new(),
            options: PackOptions::default(),
            packs: Vec::new(),
        }
    }

    pub fn pack_dir(&self) -> &Path {
        &self.pack_dir
    }

    pub fn options(&self) -> &PackOptions {
        &self.options
    }

    /// Number of discovered packs, loaded or not.
    pub fn pack_count(&self) -> usize {
        self.packs.len()
    }

    /// Index paths of the discovered packs.
    pub fn index_paths(&self) -> impl Iterator<Item = &Path> {
        self.packs.iter().map(|p| p.index_path.as_path())
    }

    /// Decode pack `i` if needed. `None` means it was skipped as corrupt.
    fn load(&self, i: usize) -> PackResult<Option<&PackFile>> {
        let lazy = &self.packs[i];
        if let Some(loaded) = lazy.loaded.get() {
            return Ok(loaded.as_ref());
        }

        debug!(index = %lazy.index_path.display(), "loading pack");
        let loaded = match PackFile::open(&lazy.index_path, &self.options) {
            Ok(pack) => Some(pack),
            Err(e) if self.options.skip_corrupt_packs => {
                warn!(index = %lazy.index_path.display(), error = %e, "skipping corrupt pack");
                None
            }
            Err(e) => {
                return Err(PackError::Load {
                    path: lazy.index_path.clone(),
                    source: Box::new(e),
                })
            }
        };
        Ok(lazy.loaded.get_or_init(|| loaded).as_ref())
    }

    /// Every pack that loads, in discovery order.
    pub fn packs(&self) -> PackResult<Vec<&PackFile>> {
        let mut out = Vec::with_capacity(self.packs.len());
        for i in 0..self.packs.len() {
            if let Some(pack) = self.load(i)? {
                out.push(pack);
            }
        }
        Ok(out)
    }

    /// The first pack holding `digest`.
    fn find(&self, digest: &Digest) -> PackResult<Option<&PackFile>> {
        for i in 0..self.packs.len() {
            if let Some(pack) = self.load(i)? {
                if pack.contains(digest) {
                    return Ok(Some(pack));
                }
            }
        }
        Ok(None)
    }

    /// Total objects across all packs that load.
    pub fn total_objects(&self) -> PackResult<usize> {
        Ok(self.packs()?.iter().map(|p| p.object_count()).sum())
    }
}

impl ObjectStore for PackSet {
    type Error = PackError;

    fn read_raw(&self, digest: &Digest) -> PackResult<Option<RawObject>> {
        match self.find(digest)? {
            Some(pack) => pack.read_raw(digest),
            None => Ok(None),
        }
    }

    fn find_prefix(&self, prefix: &DigestPrefix) -> PackResult<Vec<Digest>> {
        let mut found = Vec::new();
        for pack in self.packs()? {
            found.extend(pack.find_prefix(prefix));
        }
        found.sort();
        found.dedup();
        Ok(found)
    }

    fn kind_of(&self, digest: &Digest) -> PackResult<Option<ObjectKind>> {
        match self.find(digest)? {
            Some(pack) => pack.kind_of(digest),
            None => Ok(None),
        }
    }

    fn contains(&self, digest: &Digest) -> PackResult<bool> {
        Ok(self.find(digest)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::PackBuilder;

    fn objects_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn empty_set() {
        let set = PackSet::empty();
        assert_eq!(set.pack_count(), 0);
        assert_eq!(set.total_objects().unwrap(), 0);
        assert!(!set.contains(&Digest::null()).unwrap());
        assert!(set.read_raw(&Digest::null()).unwrap().is_none());
    }

    #[test]
    fn missing_pack_dir_is_empty() {
        let dir = objects_dir();
        let set = PackSet::discover(dir.path(), PackOptions::default()).unwrap();
        assert_eq!(set.pack_count(), 0);
    }

    #[test]
    fn reads_across_packs() {
        let dir = objects_dir();
        let pack_dir = dir.path().join("pack");

        let mut first = PackBuilder::new();
        let (a, _) = first.add_object(ObjectKind::Blob, b"first pack\n");
        first.write_to(&pack_dir).unwrap();
        let mut second = PackBuilder::new();
        let (b, _) = second.add_object(ObjectKind::Tree, b"");
        second.add_object(ObjectKind::Blob, b"first pack\n");
        second.write_to(&pack_dir).unwrap();

        let set = PackSet::discover(dir.path(), PackOptions::default()).unwrap();
        assert_eq!(set.pack_count(), 2);
        assert_eq!(set.read_raw(&a).unwrap().unwrap().data, b"first pack\n");
        assert_eq!(set.kind_of(&b).unwrap(), Some(ObjectKind::Tree));
        assert_eq!(set.total_objects().unwrap(), 3);

        let prefix = DigestPrefix::parse(&a.to_hex()[..4]).unwrap();
        assert_eq!(set.find_prefix(&prefix).unwrap(), vec![a]);
    }

    #[test]
    fn index_without_pack_is_ignored() {
        let dir = objects_dir();
        let pack_dir = dir.path().join("pack");
        std::fs::create_dir_all(&pack_dir).unwrap();
        std::fs::write(pack_dir.join("pack-orphan.idx"), b"junk").unwrap();
        let set = PackSet::discover(dir.path(), PackOptions::default()).unwrap();
        assert_eq!(set.pack_count(), 0);
    }

    #[test]
    fn corrupt_pack_fails_unless_skipped() {
        let dir = objects_dir();
        let pack_dir = dir.path().join("pack");
        let mut builder = PackBuilder::new();
        let (a, _) = builder.add_object(ObjectKind::Blob, b"x");
        let (pack_path, _) = builder.write_to(&pack_dir).unwrap();
        let mut bytes = std::fs::read(&pack_path).unwrap();
        bytes[..4].copy_from_slice(b"JUNK");
        std::fs::write(&pack_path, bytes).unwrap();

        let strict = PackSet::discover(dir.path(), PackOptions::default()).unwrap();
        assert!(matches!(
            strict.read_raw(&a).unwrap_err(),
            PackError::Load { .. }
        ));

        let lenient = PackSet::discover(
            dir.path(),
            PackOptions {
                skip_corrupt_packs: true,
                ..PackOptions::default()
            },
        )
        .unwrap();
        assert!(lenient.read_raw(&a).unwrap().is_none());
        assert!(lenient.packs().unwrap().is_empty());
    }

    #[test]
    fn pack_is_decoded_once() {
        let dir = objects_dir();
        let mut builder = PackBuilder::new();
        let (a, _) = builder.add_object(ObjectKind::Blob, b"cached\n");
        builder.write_to(&dir.path().join("pack")).unwrap();

        let set = PackSet::discover(dir.path(), PackOptions::default()).unwrap();
        let first = set.packs().unwrap()[0] as *const PackFile;
        assert!(set.contains(&a).unwrap());
        let second = set.packs().unwrap()[0] as *const PackFile;
        assert_eq!(first, second);
    }
}
