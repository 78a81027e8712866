use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::types::{BatchMergeConfig, MergeStatus, PushStatus};
use crate::git::GitOps;

/// Pushes successfully merged branches when the run asks for it
pub struct PushManager {
    git: Arc<dyn GitOps>,
}

impl PushManager {
    pub fn new(git: Arc<dyn GitOps>) -> Self {
        Self { git }
    }

    /// A push only happens for a successful merge with autoPush on and dry run off
    pub fn should_push(config: &BatchMergeConfig, merge_status: MergeStatus) -> bool {
        merge_status == MergeStatus::Success && config.push_enabled()
    }

    /// Push and report the outcome. A rejection is returned as
    /// `(PushStatus::Failed, Some(reason))`; it never changes the merge status.
    pub async fn push(
        &self,
        worktree: &Path,
        branch: &str,
        remote: &str,
    ) -> (PushStatus, Option<String>) {
        match self.git.push(worktree, branch, remote).await {
            Ok(()) => {
                info!(branch, remote, "Pushed merged branch");
                (PushStatus::Success, None)
            }
            Err(e) => {
                warn!(branch, remote, error = %e, "Push failed");
                (PushStatus::Failed, Some(e.to_string()))
            }
        }
    }
}
