use std::borrow::Cow;
use std::fmt;

use gitodb_types::{Digest, DIGEST_LEN};
use serde::{Serialize, Serializer};

use crate::error::{StoreError, StoreResult};
use crate::object::ObjectKind;

/// Width of a normalised mode string.
pub const MODE_WIDTH: usize = 6;

const TYPE_MASK: u32 = 0o170000;

/// The file mode recorded for a tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryMode {
    /// `100644`, or any other regular file without execute bits.
    Regular,
    /// `100755`, or any regular file with an execute bit set.
    Executable,
    /// `120000`
    Symlink,
    /// `040000`
    Directory,
    /// `160000`: a commit in another repository.
    Gitlink,
}

impl EntryMode {
    /// Parse an octal mode string, with or without leading zeros.
    ///
    /// Only the file-type bits decide the variant. Old histories carry
    /// permission bits such as `100640` or `100775`, which are accepted.
    pub fn parse(mode: &str) -> StoreResult<Self> {
        let bits = u32::from_str_radix(mode, 8)
            .map_err(|_| StoreError::format(format!("invalid tree entry mode {mode:?}")))?;
        match bits & TYPE_MASK {
            0o100000 if bits & 0o111 != 0 => Ok(Self::Executable),
            0o100000 => Ok(Self::Regular),
            0o120000 => Ok(Self::Symlink),
            0o040000 => Ok(Self::Directory),
            0o160000 => Ok(Self::Gitlink),
            _ => Err(StoreError::format(format!("unsupported tree entry mode {mode:?}"))),
        }
    }

    /// Canonical mode bits.
    pub fn bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Directory => 0o040000,
            Self::Gitlink => 0o160000,
        }
    }

    /// The kind of object an entry with this mode points at.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Regular | Self::Executable | Self::Symlink => ObjectKind::Blob,
            Self::Directory => ObjectKind::Tree,
            Self::Gitlink => ObjectKind::Commit,
        }
    }
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.bits())
    }
}

/// A tree entry as stored, before its child has been classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawTreeEntry {
    /// Mode text left-padded with zeros to six digits.
    pub mode: String,
    /// Name bytes exactly as stored; git does not require UTF-8.
    pub name: Vec<u8>,
    pub digest: Digest,
}

impl RawTreeEntry {
    /// `160000` entries point at commits in another repository.
    pub fn is_gitlink(&self) -> bool {
        self.mode == "160000"
    }

    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// Decoded mode.
    pub fn entry_mode(&self) -> StoreResult<EntryMode> {
        EntryMode::parse(&self.mode)
    }

    /// Classify the child from its mode bits alone.
    pub fn kind_from_mode(&self) -> StoreResult<ObjectKind> {
        Ok(self.entry_mode()?.kind())
    }
}

/// Split a tree payload into its entries, in stored order.
///
/// Each entry is `<mode> <name>\0<20 raw digest bytes>`; nothing is
/// length-prefixed, so the position is tracked by hand.
pub fn parse_entries(data: &[u8]) -> StoreResult<Vec<RawTreeEntry>> {
    let mut entries = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let space = data[pos..]
            .iter()
            .position(|&b| b == b' ')
            .map(|i| pos + i)
            .ok_or_else(|| StoreError::format(format!("tree entry at byte {pos} has no mode")))?;
        let mode = std::str::from_utf8(&data[pos..space])
            .ok()
            .filter(|m| !m.is_empty() && m.len() <= MODE_WIDTH && m.bytes().all(|b| (b'0'..=b'7').contains(&b)))
            .ok_or_else(|| StoreError::format(format!("invalid mode in tree entry at byte {pos}")))?;

        let nul = data[space + 1..]
            .iter()
            .position(|&b| b == 0)
            .map(|i| space + 1 + i)
            .ok_or_else(|| StoreError::format(format!("unterminated name in tree entry at byte {pos}")))?;
        let name = data[space + 1..nul].to_vec();

        let end = nul + 1 + DIGEST_LEN;
        if end > data.len() {
            return Err(StoreError::format(format!(
                "truncated digest for tree entry {:?}",
                String::from_utf8_lossy(&name)
            )));
        }
        let digest = Digest::from_raw(&data[nul + 1..end])?;

        entries.push(RawTreeEntry {
            mode: format!("{mode:0>width$}", width = MODE_WIDTH),
            name,
            digest,
        });
        pos = end;
    }

    Ok(entries)
}

/// A classified tree entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub digest: Digest,
    /// Six-digit octal mode, e.g. `"100644"` or `"040000"`.
    pub mode: String,
    #[serde(serialize_with = "serialize_name")]
    pub name: Vec<u8>,
    /// Kind of the child object.
    pub kind: ObjectKind,
}

fn serialize_name<S: Serializer>(name: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(name))
}

impl TreeEntry {
    /// The name for display. Invalid UTF-8 is replaced, the stored bytes are not.
    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    pub fn is_tree(&self) -> bool {
        self.kind == ObjectKind::Tree
    }

    pub fn is_blob(&self) -> bool {
        self.kind == ObjectKind::Blob
    }
}

impl fmt::Display for TreeEntry {
    /// `ls-tree` layout: `<mode> <kind> <digest>\t<name>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}\t{}",
            self.mode,
            self.kind,
            self.digest,
            self.name_lossy()
        )
    }
}

/// A decoded directory listing. Entry order is the stored order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Tree {
    pub digest: Option<Digest>,
    pub size: u64,
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Parse a tree payload, asking `classify` for the kind of every child.
    pub fn parse_with<F, E>(
        data: &[u8],
        size: u64,
        digest: Option<Digest>,
        mut classify: F,
    ) -> Result<Self, E>
    where
        F: FnMut(&RawTreeEntry) -> Result<ObjectKind, E>,
        E: From<StoreError>,
    {
        let entries = parse_entries(data)?
            .into_iter()
            .map(|raw| {
                let kind = classify(&raw)?;
                Ok(TreeEntry {
                    digest: raw.digest,
                    mode: raw.mode,
                    name: raw.name,
                    kind,
                })
            })
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Self {
            digest,
            size,
            entries,
        })
    }

    /// Parse a tree payload, classifying children by mode bits.
    pub fn parse_by_mode(data: &[u8], size: u64, digest: Option<Digest>) -> StoreResult<Self> {
        Self::parse_with(data, size, digest, RawTreeEntry::kind_from_mode)
    }

    /// Look up an entry by its exact name bytes.
    pub fn get(&self, name: impl AsRef<[u8]>) -> Option<&TreeEntry> {
        let name = name.as_ref();
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose child is a blob.
    pub fn blobs(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter().filter(|e| e.is_blob())
    }

    /// Entries whose child is a tree.
    pub fn subtrees(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter().filter(|e| e.is_tree())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(mode: &str, name: &str, hex: &str) -> Vec<u8> {
        let mut out = format!("{mode} {name}\0").into_bytes();
        out.extend_from_slice(Digest::from_hex(hex).unwrap().as_bytes());
        out
    }

    fn sample_tree() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend(entry("100644", ".gitignore", "5d2a7a3bbf2c2a2a3f1f52c2b0c8d2a0e3a6c9b1"));
        data.extend(entry("100644", "README.md", "a6f1f0c16a1d1e2b3c4d5e6f708192a3b4c5d6e7"));
        data.extend(entry("40000", "cmd", "1efecd717188441397c07f267cf468fdf04d4796"));
        data.extend(entry("100755", "main.go", "0f1e2d3c4b5a69788796a5b4c3d2e1f001122334"));
        data
    }

    #[test]
    fn three_blobs_and_one_subtree_in_stored_order() {
        let data = sample_tree();
        let tree = Tree::parse_by_mode(&data, data.len() as u64, None).unwrap();

        let names: Vec<_> = tree.entries.iter().map(|e| e.name_lossy()).collect();
        assert_eq!(names, [".gitignore", "README.md", "cmd", "main.go"]);
        assert_eq!(tree.blobs().count(), 3);
        assert_eq!(tree.subtrees().count(), 1);

        let cmd = tree.get("cmd").unwrap();
        assert_eq!(cmd.mode, "040000");
        assert_eq!(cmd.kind, ObjectKind::Tree);
        assert_eq!(cmd.digest.to_hex(), "1efecd717188441397c07f267cf468fdf04d4796");
        assert_eq!(tree.get("README.md").unwrap().mode, "100644");
        assert_eq!(tree.get("main.go").unwrap().mode, "100755");
    }

    #[test]
    fn classifier_is_called_once_per_entry_in_order() {
        let data = sample_tree();
        let mut seen = Vec::new();
        let tree = Tree::parse_with(&data, 0, None, |raw: &RawTreeEntry| {
            seen.push(raw.name_lossy().into_owned());
            Ok::<_, StoreError>(ObjectKind::Blob)
        })
        .unwrap();
        assert_eq!(seen, [".gitignore", "README.md", "cmd", "main.go"]);
        assert!(tree.entries.iter().all(|e| e.kind == ObjectKind::Blob));
    }

    #[test]
    fn classifier_error_aborts_parse() {
        let data = sample_tree();
        let err = Tree::parse_with(&data, 0, None, |raw: &RawTreeEntry| {
            if raw.name == b"cmd" {
                Err(StoreError::NotFound(raw.digest))
            } else {
                Ok(ObjectKind::Blob)
            }
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn empty_payload_is_empty_tree() {
        let tree = Tree::parse_by_mode(b"", 0, None).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn truncated_digest_is_rejected() {
        let mut data = entry("100644", "a", "1efecd717188441397c07f267cf468fdf04d4796");
        data.truncate(data.len() - 1);
        assert!(matches!(
            parse_entries(&data).unwrap_err(),
            StoreError::Format(_)
        ));
    }

    #[test]
    fn missing_nul_is_rejected() {
        assert!(parse_entries(b"100644 name-without-nul").is_err());
        assert!(parse_entries(b"no-space-at-all").is_err());
    }

    #[test]
    fn gitlink_is_a_commit() {
        let data = entry("160000", "vendor", "1efecd717188441397c07f267cf468fdf04d4796");
        let tree = Tree::parse_by_mode(&data, 0, None).unwrap();
        assert_eq!(tree.entries[0].kind, ObjectKind::Commit);
        assert_eq!(EntryMode::parse("160000").unwrap(), EntryMode::Gitlink);
    }

    #[test]
    fn mode_display_is_zero_padded() {
        assert_eq!(EntryMode::Directory.to_string(), "040000");
        assert_eq!(EntryMode::parse("40000").unwrap(), EntryMode::Directory);
        assert_eq!(EntryMode::parse("100664").unwrap(), EntryMode::Regular);
        assert!(EntryMode::parse("170000").is_err());
        assert!(EntryMode::parse("000644").is_err());
    }

    #[test]
    fn uncommon_permission_bits_classify_by_file_type() {
        assert_eq!(EntryMode::parse("100640").unwrap(), EntryMode::Regular);
        assert_eq!(EntryMode::parse("100600").unwrap(), EntryMode::Regular);
        assert_eq!(EntryMode::parse("100775").unwrap(), EntryMode::Executable);
        assert_eq!(EntryMode::parse("100744").unwrap(), EntryMode::Executable);
        assert_eq!(EntryMode::parse("120777").unwrap(), EntryMode::Symlink);

        let mut data = entry("100640", "notes", "1efecd717188441397c07f267cf468fdf04d4796");
        data.extend(entry("100775", "build.sh", "0f1e2d3c4b5a69788796a5b4c3d2e1f001122334"));
        let tree = Tree::parse_by_mode(&data, 0, None).unwrap();
        assert_eq!(tree.blobs().count(), 2);
        assert_eq!(tree.get("notes").unwrap().mode, "100640");
        assert_eq!(tree.get("build.sh").unwrap().mode, "100775");
    }

    #[test]
    fn non_utf8_names_keep_their_bytes() {
        let name = b"caf\xe9.txt";
        let mut data = b"100644 ".to_vec();
        data.extend_from_slice(name);
        data.push(0);
        data.extend_from_slice(
            Digest::from_hex("1efecd717188441397c07f267cf468fdf04d4796")
                .unwrap()
                .as_bytes(),
        );

        let tree = Tree::parse_by_mode(&data, 0, None).unwrap();
        let e = tree.get(name).unwrap();
        assert_eq!(e.name, name);
        assert_eq!(e.name_lossy(), "caf\u{fffd}.txt");
        assert!(e.to_string().ends_with("\tcaf\u{fffd}.txt"));
        assert!(tree.get("caf\u{fffd}.txt").is_none());

        let json = serde_json::to_value(e).unwrap();
        assert_eq!(json["name"], "caf\u{fffd}.txt");
    }

    #[test]
    fn entry_display_matches_ls_tree() {
        let data = entry("40000", "cmd", "1efecd717188441397c07f267cf468fdf04d4796");
        let tree = Tree::parse_by_mode(&data, 0, None).unwrap();
        assert_eq!(
            tree.entries[0].to_string(),
            "040000 tree 1efecd717188441397c07f267cf468fdf04d4796\tcmd"
        );
    }
}
