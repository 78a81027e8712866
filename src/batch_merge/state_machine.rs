//! Per-branch lifecycle
//!
//! ```text
//! Pending -> Fetching -> Provisioning -> WorktreeReady -> Merging
//!   Merging -> Merged -> [Pushing -> Pushed | PushFailed]
//!   Merging -> UpToDate | Conflict | MergeError
//!   (any failure or cancellation) -> Aborted
//! every settled stage -> CleanedUp -> Recorded
//! ```
//!
//! Cleanup is reachable from every stage a branch can settle in, so the
//! worktree is always released before the outcome is recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BranchStage {
    Pending,
    Fetching,
    Provisioning,
    WorktreeReady,
    Merging,
    Merged,
    Conflict,
    MergeError,
    UpToDate,
    Pushing,
    Pushed,
    PushFailed,
    Aborted,
    CleanedUp,
    Recorded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BranchEvent {
    BeginFetch,
    FetchSucceeded,
    FetchFailed,
    WorktreeCreated,
    WorktreeFailed,
    BeginMerge,
    MergeClean,
    MergeUpToDate,
    MergeConflicted,
    MergeFailed,
    BeginPush,
    PushSucceeded,
    PushRejected,
    Cancel,
    Cleanup,
    Record,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition: {event:?} not allowed in stage {stage:?}")]
    InvalidTransition { stage: BranchStage, event: BranchEvent },
}

impl BranchStage {
    /// The single transition function for a branch
    pub fn transition(&self, event: &BranchEvent) -> Result<BranchStage, TransitionError> {
        use BranchEvent as E;
        use BranchStage as S;

        let next = match (self, event) {
            (S::Pending, E::BeginFetch) => S::Fetching,
            (S::Fetching, E::FetchSucceeded) => S::Provisioning,
            (S::Fetching, E::FetchFailed) => S::Aborted,

            (S::Provisioning, E::WorktreeCreated) => S::WorktreeReady,
            (S::Provisioning, E::WorktreeFailed) => S::Aborted,

            (S::WorktreeReady, E::BeginMerge) => S::Merging,
            (S::Merging, E::MergeClean) => S::Merged,
            (S::Merging, E::MergeUpToDate) => S::UpToDate,
            (S::Merging, E::MergeConflicted) => S::Conflict,
            (S::Merging, E::MergeFailed) => S::MergeError,

            (S::Merged, E::BeginPush) => S::Pushing,
            (S::Pushing, E::PushSucceeded) => S::Pushed,
            (S::Pushing, E::PushRejected) => S::PushFailed,

            // only polled between phases, never while a git call is running
            (S::Pending | S::Provisioning | S::WorktreeReady | S::Merged, E::Cancel) => S::Aborted,

            (s, E::Cleanup) if s.is_settled() => S::CleanedUp,
            (S::CleanedUp, E::Record) => S::Recorded,

            (stage, event) => {
                return Err(TransitionError::InvalidTransition {
                    stage: *stage,
                    event: *event,
                })
            }
        };
        Ok(next)
    }

    /// Stages where the branch has no further git work pending
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            BranchStage::Merged
                | BranchStage::UpToDate
                | BranchStage::Conflict
                | BranchStage::MergeError
                | BranchStage::Pushed
                | BranchStage::PushFailed
                | BranchStage::Aborted
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BranchStage::Recorded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: BranchStage,
    pub to: BranchStage,
    pub event: BranchEvent,
    pub at: DateTime<Utc>,
}

/// Tracks the current stage of one branch plus the path it took
#[derive(Debug, Clone)]
pub struct BranchStateMachine {
    branch: String,
    stage: BranchStage,
    history: Vec<TransitionRecord>,
}

impl BranchStateMachine {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            stage: BranchStage::Pending,
            history: Vec::new(),
        }
    }

    pub fn stage(&self) -> BranchStage {
        self.stage
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    pub fn apply(&mut self, event: BranchEvent) -> Result<BranchStage, TransitionError> {
        let next = match self.stage.transition(&event) {
            Ok(next) => next,
            Err(e) => {
                error!(branch = %self.branch, stage = ?self.stage, ?event, "Invalid branch transition");
                return Err(e);
            }
        };

        debug!(branch = %self.branch, from = ?self.stage, to = ?next, ?event, "branch transition");
        self.history.push(TransitionRecord {
            from: self.stage,
            to: next,
            event,
            at: Utc::now(),
        });
        self.stage = next;
        Ok(next)
    }

    /// Stages visited so far, starting with `Pending`
    pub fn path(&self) -> Vec<BranchStage> {
        std::iter::once(BranchStage::Pending)
            .chain(self.history.iter().map(|r| r.to))
            .collect()
    }
}
