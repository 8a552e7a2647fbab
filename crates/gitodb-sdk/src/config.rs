use gitodb_pack::{PackOptions, DEFAULT_MAX_DELTA_DEPTH};
use serde::{Deserialize, Serialize};

/// How the kind of each tree child is decided.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeClassification {
    /// Look the child up and read its kind.
    #[default]
    Resolve,
    /// Trust the entry mode; no I/O.
    Mode,
}

/// Limits and integrity settings for an opened repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Longest delta chain resolved before the object is marked failed.
    pub max_delta_depth: usize,

    /// Most commits `log` will return before giving up.
    pub max_history: usize,

    /// Deepest tree nesting `walk_tree` will descend into.
    pub max_tree_depth: usize,

    /// Verify pack and index trailers, entry CRCs and loose object digests.
    pub verify_checksums: bool,

    /// Log and ignore packs that fail to load instead of failing the lookup.
    pub skip_corrupt_packs: bool,

    /// How tree children are classified.
    pub tree_classification: TreeClassification,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            max_delta_depth: DEFAULT_MAX_DELTA_DEPTH,
            max_history: 1_000_000,
            max_tree_depth: 256,
            verify_checksums: false,
            skip_corrupt_packs: false,
            tree_classification: TreeClassification::Resolve,
        }
    }
}

impl RepositoryConfig {
    /// Full integrity checking on every read.
    pub fn strict() -> Self {
        Self {
            verify_checksums: true,
            ..Default::default()
        }
    }

    /// The subset of settings the pack layer needs.
    pub fn pack_options(&self) -> PackOptions {
        PackOptions {
            max_delta_depth: self.max_delta_depth,
            verify_checksums: self.verify_checksums,
            skip_corrupt_packs: self.skip_corrupt_packs,
        }
    }
}
