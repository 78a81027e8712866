//! Batch merge orchestration
//!
//! Merges one source branch into an ordered list of target branches, each in
//! its own disposable worktree, and reports a per-branch outcome plus summary.

pub mod aggregator;
pub mod errors;
pub mod executor;
pub mod orchestrator;
pub mod progress;
pub mod push;
pub mod state_machine;
pub mod types;
pub mod worktree;

pub use aggregator::ResultAggregator;
pub use errors::{validate_config, BranchError, ConfigError};
pub use executor::MergeExecutor;
pub use orchestrator::BatchMergeOrchestrator;
pub use progress::{estimate_remaining, FnProgress, NoProgress, ProgressReporter, ProgressSink};
pub use push::PushManager;
pub use state_machine::{BranchEvent, BranchStage, BranchStateMachine, TransitionError};
pub use types::{
    BatchMergeConfig, BatchMergeProgress, BatchMergeResult, BatchMergeSummary, BranchMergeStatus,
    MergePhase, MergeStatus, PushStatus, DEFAULT_REMOTE,
};
pub use worktree::{sanitize_branch_name, WorktreeProvisioner};
