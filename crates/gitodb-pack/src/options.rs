use serde::{Deserialize, Serialize};

/// Default bound on delta chain length.
pub const DEFAULT_MAX_DELTA_DEPTH: usize = 10_000;

/// Settings applied when loading packs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackOptions {
    /// Longest delta chain that will be resolved. Longer chains become a
    /// per-object error.
    pub max_delta_depth: usize,
    /// Verify pack and index trailers and every entry's CRC-32 while loading.
    pub verify_checksums: bool,
    /// Log and ignore packs that fail to load instead of failing the lookup.
    pub skip_corrupt_packs: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            max_delta_depth: DEFAULT_MAX_DELTA_DEPTH,
            verify_checksums: false,
            skip_corrupt_packs: false,
        }
    }
}
