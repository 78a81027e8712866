// batch-merge library
// Exposes the merge engine and its collaborators for the binary and for tests

pub mod batch_merge;
pub mod cli;
pub mod config;
pub mod external;
pub mod git;
pub mod shutdown;
pub mod telemetry;

// Re-export key types for easy access
pub use batch_merge::{
    BatchMergeConfig, BatchMergeOrchestrator, BatchMergeProgress, BatchMergeResult,
    BatchMergeSummary, BranchMergeStatus, ConfigError, FnProgress, MergePhase, MergeStatus,
    NoProgress, ProgressSink, PushStatus,
};
pub use crate::config::BatchMergeSettings;
pub use external::{GitClient, ProcessCommandExecutor};
pub use git::{GitError, GitOps, MergeOutcome, WorktreeSpec};
pub use shutdown::{CancellationToken, ShutdownCoordinator};
pub use telemetry::{generate_correlation_id, init_telemetry};
