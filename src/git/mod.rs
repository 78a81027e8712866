//! Git collaborator interface
//!
//! The batch merge engine only talks to git through the [`GitOps`] trait.
//! [`merge`] holds the libgit2 merge classifier used by the production client.

pub mod merge;
pub mod operations;

pub use merge::{merge_in_worktree, unmerged_paths, MergeIdentity};
pub use operations::{GitError, GitOps, MergeOutcome, WorktreeSpec};
