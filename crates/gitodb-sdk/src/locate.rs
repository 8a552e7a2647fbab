//! Finding the metadata directory of a repository.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{SdkError, SdkResult};

const DOT_GIT: &str = ".git";
const GITDIR_PREFIX: &str = "gitdir:";

/// Walk up from `start` to the first directory that has repository
/// metadata, and return that metadata directory.
///
/// `start` itself is accepted when it already is a metadata directory: it is
/// named `.git`, or it holds both `objects/` and `HEAD` (a bare repository).
/// A `.git` file holding `gitdir: <path>` redirects to `<path>`.
pub fn find_git_dir(start: &Path) -> SdkResult<PathBuf> {
    let start = if start.is_absolute() {
        start.to_path_buf()
    } else {
        std::env::current_dir()?.join(start)
    };

    let mut current = Some(start.as_path());
    while let Some(dir) = current {
        if is_git_dir(dir) {
            debug!(git_dir = %dir.display(), "found metadata directory");
            return Ok(dir.to_path_buf());
        }

        let candidate = dir.join(DOT_GIT);
        if candidate.is_dir() {
            debug!(git_dir = %candidate.display(), "found metadata directory");
            return Ok(candidate);
        }
        if candidate.is_file() {
            let target = read_gitdir_file(&candidate, dir)?;
            debug!(
                file = %candidate.display(),
                git_dir = %target.display(),
                "followed .git file"
            );
            return Ok(target);
        }

        current = dir.parent();
    }

    Err(SdkError::NotAGitRepository(start))
}

/// Whether `dir` is usable as a metadata directory as it stands.
pub fn is_git_dir(dir: &Path) -> bool {
    if !dir.is_dir() {
        return false;
    }
    if dir.file_name().map(|n| n == DOT_GIT).unwrap_or(false) {
        return true;
    }
    dir.join("objects").is_dir() && dir.join("HEAD").is_file()
}

fn read_gitdir_file(file: &Path, base_dir: &Path) -> SdkResult<PathBuf> {
    let invalid = |reason: &str| SdkError::InvalidGitFile {
        path: file.to_path_buf(),
        reason: reason.to_string(),
    };

    let contents = fs::read_to_string(file)?;
    let target = parse_gitdir(&contents).ok_or_else(|| invalid("expected `gitdir: <path>`"))?;
    let target = if target.is_absolute() {
        target
    } else {
        base_dir.join(target)
    };
    if !target.is_dir() {
        return Err(invalid("gitdir target is not a directory"));
    }
    Ok(target)
}

/// The path from `.git` file contents. Blanks after the colon and the
/// trailing line ending are dropped; an empty path is rejected.
fn parse_gitdir(contents: &str) -> Option<PathBuf> {
    let rest = contents.strip_prefix(GITDIR_PREFIX)?;
    let path = rest
        .trim_start_matches([' ', '\t'])
        .trim_end_matches(['\n', '\r']);
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}
