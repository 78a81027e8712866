use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::external::CommandError;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Repository not found or not a git repository")]
    RepositoryNotFound,
    #[error("Branch not found: {branch}")]
    BranchNotFound { branch: String },
    #[error("Remote not found: {remote}")]
    RemoteNotFound { remote: String },
    #[error("Local branch {branch} has commits not on {tracking}")]
    LocalBranchAhead { branch: String, tracking: String },
    #[error("Fetch from {remote} failed: {message}")]
    FetchFailed { remote: String, message: String },
    #[error("Worktree operation on {} failed: {message}", path.display())]
    WorktreeFailed { path: PathBuf, message: String },
    #[error("Push of {branch} to {remote} rejected: {message}")]
    PushRejected {
        branch: String,
        remote: String,
        message: String,
    },
    #[error("Command execution error: {source}")]
    CommandError {
        #[from]
        source: CommandError,
    },
    #[error("libgit2 error: {0}")]
    Libgit2(#[from] git2::Error),
    #[error("Git command failed: {message}")]
    GitCommandFailed { message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What to check out when provisioning a worktree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeSpec {
    pub branch: String,
    pub path: PathBuf,
    /// Detached checkouts leave the branch ref untouched by any merge commit
    pub detached: bool,
    /// Remote whose freshly fetched tracking ref is checked out
    pub remote: String,
}

/// Classification of a merge attempted inside a worktree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Source merged without conflicts; `commit` is the new tip
    Clean { commit: String },
    /// Target already contains every source commit
    UpToDate,
    /// Every path left with unmerged index entries, sorted and deduplicated
    Conflicted { files: Vec<String> },
}

/// Git collaborator used by the batch merge engine.
///
/// Each call is one opaque operation that either completes or fails with a
/// typed error. The engine never interrupts a call in flight.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GitOps: Send + Sync {
    /// Check that `remote` is configured in the repository
    async fn remote_exists(&self, remote: &str) -> Result<bool, GitError>;

    /// Update remote-tracking refs for the given branch names
    async fn fetch(&self, remote: &str, refs: &[String]) -> Result<(), GitError>;

    /// Materialise a checkout described by `spec`
    async fn create_worktree(&self, spec: &WorktreeSpec) -> Result<(), GitError>;

    /// Delete a worktree and prune its metadata
    async fn remove_worktree(&self, path: &Path) -> Result<(), GitError>;

    /// Merge `source_ref` into whatever the worktree at `path` has checked out
    async fn merge(&self, path: &Path, source_ref: &str) -> Result<MergeOutcome, GitError>;

    /// Push `branch` from the worktree at `path` to `remote`
    async fn push(&self, path: &Path, branch: &str, remote: &str) -> Result<(), GitError>;
}
