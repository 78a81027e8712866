use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::git::{GitError, GitOps, MergeOutcome};

/// Fetches refs and performs the merge for one target branch
///
/// Each distinct `(remote, ref)` pair is fetched at most once per executor.
/// The orchestrator creates one executor per run, so the source branch is
/// fetched once for the whole batch.
pub struct MergeExecutor {
    git: Arc<dyn GitOps>,
    fetched: Mutex<HashSet<(String, String)>>,
}

impl MergeExecutor {
    pub fn new(git: Arc<dyn GitOps>) -> Self {
        Self {
            git,
            fetched: Mutex::new(HashSet::new()),
        }
    }

    /// Update remote-tracking refs for both branches.
    ///
    /// Only refs not fetched earlier in the run are requested. A failed fetch
    /// is not remembered, so a later branch needing the same ref tries again.
    pub async fn fetch(
        &self,
        remote: &str,
        source_branch: &str,
        target_branch: &str,
    ) -> Result<(), GitError> {
        let pending: Vec<String> = {
            let fetched = self.lock_cache();
            [source_branch, target_branch]
                .into_iter()
                .filter(|r| !fetched.contains(&(remote.to_string(), r.to_string())))
                .map(str::to_string)
                .collect()
        };

        if pending.is_empty() {
            debug!(remote, source_branch, target_branch, "refs already fetched this run");
            return Ok(());
        }

        self.git.fetch(remote, &pending).await?;

        let mut fetched = self.lock_cache();
        for r in pending {
            fetched.insert((remote.to_string(), r));
        }
        Ok(())
    }

    /// Merge the freshly fetched `<remote>/<source>` into the worktree
    pub async fn merge(
        &self,
        worktree: &Path,
        remote: &str,
        source_branch: &str,
    ) -> Result<MergeOutcome, GitError> {
        let source_ref = remote_tracking_ref(remote, source_branch);
        let outcome = self.git.merge(worktree, &source_ref).await?;
        debug!(worktree = %worktree.display(), source_ref = %source_ref, ?outcome, "merge classified");
        Ok(outcome)
    }

    pub fn is_fetched(&self, remote: &str, branch: &str) -> bool {
        self.lock_cache()
            .contains(&(remote.to_string(), branch.to_string()))
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashSet<(String, String)>> {
        // the set holds plain strings, so a poisoned lock is still usable
        self.fetched.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub fn remote_tracking_ref(remote: &str, branch: &str) -> String {
    format!("{remote}/{branch}")
}
