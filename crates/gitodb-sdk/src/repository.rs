use std::path::{Path, PathBuf};

use gitodb_pack::PackSet;
use gitodb_store::{
    Blob, Commit, LooseObjects, Object, ObjectKind, ObjectStore, RawObject,
    RawTreeEntry, Tree, TreeEntry,
};
use gitodb_types::{Digest, DigestPrefix};
use tracing::{debug, trace};

use crate::config::{RepositoryConfig, TreeClassification};
use crate::error::{SdkError, SdkResult};
use crate::locate::find_git_dir;

/// A read-only view of one repository's object database.
///
/// Owns the loose object directory and the discovered packs. Packs are
/// decoded on first use and stay cached for the lifetime of the value.
#[derive(Debug)]
pub struct Repository {
    git_dir: PathBuf,
    config: RepositoryConfig,
    loose: LooseObjects,
    packs: PackSet,
}

impl Repository {
    /// Open the repository containing `hint` with default settings.
    pub fn open(hint: impl AsRef<Path>) -> SdkResult<Self> {
        Self::open_with(hint, RepositoryConfig::default())
    }

    /// Open the repository containing `hint`.
    pub fn open_with(hint: impl AsRef<Path>, config: RepositoryConfig) -> SdkResult<Self> {
        let git_dir = find_git_dir(hint.as_ref())?;
        Self::from_git_dir(git_dir, config)
    }

    /// Open a known metadata directory without searching.
    pub fn from_git_dir(git_dir: impl Into<PathBuf>, config: RepositoryConfig) -> SdkResult<Self> {
        let git_dir = git_dir.into();
        let objects_dir = git_dir.join("objects");
        let loose = LooseObjects::new(&objects_dir).with_digest_verification(config.verify_checksums);
        let packs = PackSet::discover(&objects_dir, config.pack_options())?;
        debug!(
            git_dir = %git_dir.display(),
            packs = packs.pack_count(),
            "opened repository"
        );
        Ok(Self {
            git_dir,
            config,
            loose,
            packs,
        })
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn loose(&self) -> &LooseObjects {
        &self.loose
    }

    pub fn packs(&self) -> &PackSet {
        &self.packs
    }

    // ---- Identifier resolution ----

    /// Resolve a full digest or an abbreviation of 4 or more hex digits.
    ///
    /// Loose and packed candidates are pooled; an abbreviation must match
    /// exactly one object across both.
    pub fn resolve_id(&self, id: &str) -> SdkResult<Digest> {
        let prefix = DigestPrefix::parse(id.trim())?;

        if let Some(digest) = prefix.to_digest() {
            if self.loose.contains(&digest)? || self.packs.contains(&digest)? {
                return Ok(digest);
            }
            return Err(SdkError::ObjectNotFound(prefix.as_str().to_string()));
        }

        let mut candidates = self.loose.find_prefix(&prefix)?;
        candidates.extend(self.packs.find_prefix(&prefix)?);
        candidates.sort();
        candidates.dedup();
        trace!(prefix = prefix.as_str(), matches = candidates.len(), "resolved prefix");

        match candidates.len() {
            0 => Err(SdkError::ObjectNotFound(prefix.as_str().to_string())),
            1 => Ok(candidates[0]),
            _ => Err(SdkError::AmbiguousPrefix {
                prefix: prefix.as_str().to_string(),
                candidates,
            }),
        }
    }

    /// Resolve an identifier and decode the object it names.
    pub fn resolve(&self, id: &str) -> SdkResult<Object> {
        let digest = self.resolve_id(id)?;
        self.object(&digest)
    }

    // ---- Object access ----

    /// Kind, declared size and payload of an object. Loose objects win over
    /// packed copies.
    pub fn read_raw(&self, digest: &Digest) -> SdkResult<RawObject> {
        if let Some(raw) = self.loose.read(digest)? {
            return Ok(raw);
        }
        if let Some(raw) = self.packs.read_raw(digest)? {
            return Ok(raw);
        }
        Err(SdkError::ObjectNotFound(digest.to_hex()))
    }

    /// Kind of an object, without decoding its payload.
    pub fn kind_of(&self, digest: &Digest) -> SdkResult<ObjectKind> {
        if let Some(kind) = self.loose.read_kind(digest)? {
            return Ok(kind);
        }
        if let Some(kind) = self.packs.kind_of(digest)? {
            return Ok(kind);
        }
        Err(SdkError::ObjectNotFound(digest.to_hex()))
    }

    /// Whether the object exists, loose or packed.
    pub fn contains(&self, digest: &Digest) -> SdkResult<bool> {
        Ok(self.loose.contains(digest)? || self.packs.contains(digest)?)
    }

    /// Decode an object into its typed form.
    pub fn object(&self, digest: &Digest) -> SdkResult<Object> {
        self.read_raw(digest)?
            .decode_with(Some(*digest), |entry| self.classify(entry))
    }

    pub fn commit(&self, digest: &Digest) -> SdkResult<Commit> {
        let raw = self.read_raw(digest)?;
        if raw.kind != ObjectKind::Commit {
            return Err(SdkError::NotACommit {
                digest: *digest,
                kind: raw.kind,
            });
        }
        Ok(Commit::parse(&raw.data, raw.size, Some(*digest))?)
    }

    pub fn tree(&self, digest: &Digest) -> SdkResult<Tree> {
        let raw = self.expect_kind(digest, ObjectKind::Tree)?;
        Tree::parse_with(&raw.data, raw.size, Some(*digest), |entry| {
            self.classify(entry)
        })
    }

    pub fn blob(&self, digest: &Digest) -> SdkResult<Blob> {
        let raw = self.expect_kind(digest, ObjectKind::Blob)?;
        Ok(Blob::parse(raw.data, raw.size, Some(*digest)))
    }

    /// The tree named by `digest`, or the root tree of the commit it names.
    pub fn peel_to_tree(&self, digest: &Digest) -> SdkResult<Tree> {
        match self.kind_of(digest)? {
            ObjectKind::Commit => {
                let commit = self.commit(digest)?;
                self.tree(&commit.tree)
            }
            _ => self.tree(digest),
        }
    }

    fn expect_kind(&self, digest: &Digest, expected: ObjectKind) -> SdkResult<RawObject> {
        let raw = self.read_raw(digest)?;
        if raw.kind != expected {
            return Err(SdkError::WrongKind {
                digest: *digest,
                expected,
                actual: raw.kind,
            });
        }
        Ok(raw)
    }

    /// Kind of a tree child. Gitlinks point into another repository and are
    /// never looked up. Under lookup classification no other mode is decoded.
    fn classify(&self, entry: &RawTreeEntry) -> SdkResult<ObjectKind> {
        if entry.is_gitlink() {
            return Ok(ObjectKind::Commit);
        }
        match self.config.tree_classification {
            TreeClassification::Mode => Ok(entry.kind_from_mode()?),
            TreeClassification::Resolve => self.kind_of(&entry.digest),
        }
    }

    // ---- Tree listing ----

    /// Every entry below a tree, depth first in stored order, with its path
    /// relative to the tree. Subtrees appear before their contents.
    pub fn walk_tree(&self, digest: &Digest) -> SdkResult<Vec<(String, TreeEntry)>> {
        let mut out = Vec::new();
        self.walk_into(digest, "", 0, &mut out)?;
        Ok(out)
    }

    fn walk_into(
        &self,
        digest: &Digest,
        prefix: &str,
        depth: usize,
        out: &mut Vec<(String, TreeEntry)>,
    ) -> SdkResult<()> {
        if depth > self.config.max_tree_depth {
            return Err(SdkError::TreeTooDeep {
                path: prefix.to_string(),
                max: self.config.max_tree_depth,
            });
        }
        let tree = self.tree(digest)?;
        for entry in tree.entries {
            let path = if prefix.is_empty() {
                entry.name_lossy().into_owned()
            } else {
                format!("{prefix}/{}", entry.name_lossy())
            };
            let subtree = entry.is_tree().then_some(entry.digest);
            out.push((path.clone(), entry));
            if let Some(child) = subtree {
                self.walk_into(&child, &path, depth + 1, out)?;
            }
        }
        Ok(())
    }
}
