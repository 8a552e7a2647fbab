//! First-parent history.

use std::collections::HashSet;

use gitodb_store::Commit;
use gitodb_types::Digest;
use tracing::trace;

use crate::error::{SdkError, SdkResult};
use crate::repository::Repository;

impl Repository {
    /// The commit at `start` followed by its first-parent ancestors, ending
    /// at a root commit. Merge parents other than the first are not visited.
    pub fn log(&self, start: &Digest) -> SdkResult<Vec<Commit>> {
        self.log_limit(start, None)
    }

    /// Like [`Repository::log`], but stops after `limit` commits.
    pub fn log_limit(&self, start: &Digest, limit: Option<usize>) -> SdkResult<Vec<Commit>> {
        let max = self.config().max_history;
        let mut seen = HashSet::new();
        let mut history = Vec::new();
        let mut next = Some(*start);

        while let Some(digest) = next {
            if limit.is_some_and(|n| history.len() >= n) {
                break;
            }
            if history.len() >= max {
                return Err(SdkError::HistoryTooLong { max });
            }
            if !seen.insert(digest) {
                return Err(SdkError::HistoryCycle(digest));
            }

            let commit = self.commit(&digest)?;
            trace!(commit = %digest, parents = commit.parents.len(), "walked commit");
            next = commit.first_parent().copied();
            history.push(commit);
        }
        Ok(history)
    }
}
