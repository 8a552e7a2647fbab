//! Integrity checks and the `verify-pack` report.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use gitodb_crypto::{split_trailer, verify_trailer};
use gitodb_types::Digest;
use serde::Serialize;

use crate::error::{PackError, PackResult};
use crate::index::PackIndex;
use crate::reader::PackFile;

/// Check both SHA-1 trailers and that the index describes this pack.
pub fn verify_trailers(pack: &[u8], index_bytes: &[u8], index: &PackIndex) -> PackResult<()> {
    if !verify_trailer(pack) {
        return Err(PackError::ChecksumMismatch { file: "pack" });
    }
    PackIndex::verify_checksum(index_bytes)?;
    match split_trailer(pack) {
        Some((_, trailer)) if *trailer == index.pack_checksum => Ok(()),
        _ => Err(PackError::IndexMismatch(
            "index was written for a different pack".into(),
        )),
    }
}

/// One object line of a verify report.
#[derive(Clone, Debug, Serialize)]
pub struct VerifyLine {
    pub digest: Digest,
    /// Resolved kind, or the entry kind when resolution failed.
    pub kind: String,
    pub size: u64,
    pub size_in_pack: u64,
    pub offset: u64,
    /// Chain depth and immediate base, for deltas.
    pub depth: Option<usize>,
    pub base: Option<Digest>,
    pub error: Option<String>,
}

/// Per-object listing plus chain length histogram, as `git verify-pack -v`
/// prints it.
#[derive(Clone, Debug, Serialize)]
pub struct VerifyReport {
    pub pack: String,
    pub objects: Vec<VerifyLine>,
    pub non_delta: usize,
    /// Number of objects per delta chain length.
    pub chain_lengths: BTreeMap<usize, usize>,
    pub failed: usize,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.failed == 0
    }

    /// Render the report. Without `verbose` only the summary line is produced.
    pub fn render(&self, verbose: bool) -> String {
        let mut out = String::new();
        if verbose {
            for line in &self.objects {
                let _ = write!(
                    out,
                    "{} {:<6} {} {} {}",
                    line.digest, line.kind, line.size, line.size_in_pack, line.offset
                );
                if let (Some(depth), Some(base)) = (line.depth, line.base) {
                    let _ = write!(out, " {depth} {base}");
                }
                if let Some(err) = &line.error {
                    let _ = write!(out, " error: {err}");
                }
                out.push('\n');
            }
            let _ = writeln!(out, "non delta: {}", plural(self.non_delta));
            for (length, count) in &self.chain_lengths {
                let _ = writeln!(out, "chain length = {length}: {}", plural(*count));
            }
        }
        let status = if self.is_ok() { "ok" } else { "bad" };
        let _ = writeln!(out, "{}: {status}", self.pack);
        out
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}

fn plural(n: usize) -> String {
    if n == 1 {
        "1 object".to_string()
    } else {
        format!("{n} objects")
    }
}

impl PackFile {
    /// Build the verify report for this pack, in offset order.
    pub fn verify_report(&self) -> VerifyReport {
        let mut objects = Vec::with_capacity(self.object_count());
        let mut non_delta = 0;
        let mut chain_lengths = BTreeMap::new();
        let mut failed = 0;

        for obj in self.objects() {
            let error = obj.error.as_ref().map(ToString::to_string);
            if error.is_some() {
                failed += 1;
            } else if obj.is_delta() {
                *chain_lengths.entry(obj.depth).or_insert(0) += 1;
            } else {
                non_delta += 1;
            }
            let kind = match obj.kind {
                Some(kind) if error.is_none() => kind.to_string(),
                _ => obj.entry_kind.to_string(),
            };
            let delta_info = obj.is_delta() && error.is_none();
            objects.push(VerifyLine {
                digest: obj.digest,
                kind,
                size: obj.size,
                size_in_pack: obj.size_in_pack,
                offset: obj.offset,
                depth: delta_info.then_some(obj.depth),
                base: if delta_info { obj.base_digest } else { None },
                error,
            });
        }

        VerifyReport {
            pack: self
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<memory>".to_string()),
            objects,
            non_delta,
            chain_lengths,
            failed,
        }
    }
}
