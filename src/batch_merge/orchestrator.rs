//! Batch merge driver
//!
//! Branches are processed strictly one after another, in config order. Every
//! per-branch failure is converted into that branch's status at the branch
//! boundary; only configuration problems found before the loop make `run`
//! return an error.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn, Instrument};

use super::aggregator::ResultAggregator;
use super::errors::{validate_config, BranchError, ConfigError};
use super::executor::MergeExecutor;
use super::progress::{ProgressReporter, ProgressSink};
use super::push::PushManager;
use super::state_machine::{BranchEvent, BranchStateMachine, TransitionError};
use super::types::{
    BatchMergeConfig, BatchMergeResult, BranchMergeStatus, MergePhase, MergeStatus, PushStatus,
};
use super::worktree::WorktreeProvisioner;
use crate::git::{GitOps, MergeOutcome};
use crate::shutdown::CancellationToken;
use crate::telemetry::{batch_span, branch_span, generate_correlation_id};

pub struct BatchMergeOrchestrator {
    git: Arc<dyn GitOps>,
    worktrees: WorktreeProvisioner,
}

/// Collaborators that live for exactly one run
struct RunContext<'a> {
    config: &'a BatchMergeConfig,
    executor: MergeExecutor,
    pusher: PushManager,
    cancel: &'a CancellationToken,
}

/// Where the per-branch pipeline settled
enum BranchVerdict {
    Merged {
        push_status: PushStatus,
        push_error: Option<String>,
    },
    UpToDate,
    Failed(BranchError),
}

/// Why the pipeline stopped before reaching a verdict
enum Halt {
    Cancelled,
    Failed(BranchError),
}

impl From<TransitionError> for Halt {
    fn from(e: TransitionError) -> Self {
        Halt::Failed(BranchError::Transition(e))
    }
}

impl BranchVerdict {
    fn into_status(
        self,
        branch: &str,
        worktree_created: bool,
        duration: Duration,
    ) -> BranchMergeStatus {
        let (status, error, conflict_files, push_status) = match self {
            BranchVerdict::Merged {
                push_status,
                push_error,
            } => (MergeStatus::Success, push_error, None, push_status),
            BranchVerdict::UpToDate => (MergeStatus::Skipped, None, None, PushStatus::NotExecuted),
            BranchVerdict::Failed(e) => (
                MergeStatus::Failed,
                Some(e.to_string()),
                e.conflict_files().map(<[String]>::to_vec),
                PushStatus::NotExecuted,
            ),
        };

        BranchMergeStatus {
            branch_name: branch.to_string(),
            status,
            error,
            conflict_files,
            push_status,
            worktree_created,
            duration_seconds: duration.as_secs_f64(),
        }
    }
}

impl BatchMergeOrchestrator {
    pub fn new(git: Arc<dyn GitOps>, worktree_root: impl Into<PathBuf>) -> Self {
        let worktrees = WorktreeProvisioner::new(git.clone(), worktree_root);
        Self { git, worktrees }
    }

    pub fn worktree_root(&self) -> &Path {
        self.worktrees.root()
    }

    /// Merge `config.source_branch` into every target branch.
    ///
    /// Returns `Err` only for configuration problems detected before the
    /// first branch. Cancellation ends the run early with `cancelled = true`
    /// and only the branches that were fully recorded.
    pub async fn run(
        &self,
        config: BatchMergeConfig,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BatchMergeResult, ConfigError> {
        validate_config(&config)?;
        self.check_remote(&config.remote).await?;

        let run_id = generate_correlation_id();
        let span = batch_span(
            &run_id,
            &config.source_branch,
            config.target_branches.len(),
            config.dry_run,
        );

        async move {
            let started_at = Utc::now();
            let ctx = RunContext {
                config: &config,
                executor: MergeExecutor::new(self.git.clone()),
                pusher: PushManager::new(self.git.clone()),
                cancel,
            };
            let mut reporter = ProgressReporter::new(sink, config.target_branches.len());
            let mut statuses = Vec::with_capacity(config.target_branches.len());
            let mut cancelled = false;

            info!(
                targets = ?config.target_branches,
                auto_push = config.auto_push,
                remote = %config.remote,
                "Starting batch merge"
            );

            for (index, branch) in config.target_branches.iter().enumerate() {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }

                let recorded = self
                    .process_branch(&ctx, &reporter, index, branch)
                    .instrument(branch_span(branch, index))
                    .await;

                match recorded {
                    Some(status) => {
                        statuses.push(status);
                        reporter.branch_completed();
                    }
                    None => {
                        cancelled = true;
                        break;
                    }
                }
            }

            let summary = ResultAggregator::summarize(&statuses);
            let total_duration_seconds = reporter.elapsed().as_secs_f64();

            if cancelled {
                warn!(
                    recorded = statuses.len(),
                    total = config.target_branches.len(),
                    "Batch merge cancelled"
                );
            } else {
                info!(
                    success = summary.success_count,
                    skipped = summary.skipped_count,
                    failed = summary.failed_count,
                    pushed = summary.pushed_count,
                    push_failed = summary.push_failed_count,
                    duration_s = total_duration_seconds,
                    "Batch merge finished"
                );
            }

            Ok(BatchMergeResult {
                run_id: run_id.clone(),
                statuses,
                summary,
                total_duration_seconds,
                cancelled,
                started_at,
                finished_at: Utc::now(),
                config: config.clone(),
            })
        }
        .instrument(span)
        .await
    }

    async fn check_remote(&self, remote: &str) -> Result<(), ConfigError> {
        match self.git.remote_exists(remote).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ConfigError::RemoteNotFound {
                remote: remote.to_string(),
            }),
            Err(e) => Err(ConfigError::InvalidRemote {
                remote: remote.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Run one branch through its phases. `None` means cancellation was
    /// observed mid-branch: cleanup still ran but nothing is recorded.
    async fn process_branch(
        &self,
        ctx: &RunContext<'_>,
        reporter: &ProgressReporter<'_>,
        index: usize,
        branch: &str,
    ) -> Option<BranchMergeStatus> {
        let started = Instant::now();
        let mut machine = BranchStateMachine::new(branch);
        let mut worktree: Option<PathBuf> = None;

        let outcome = self
            .drive(ctx, reporter, index, branch, &mut machine, &mut worktree)
            .await;

        // cleanup runs on every exit path
        reporter.enter(index, branch, MergePhase::Cleanup);
        let worktree_created = worktree.is_some();
        if let Some(path) = worktree.take() {
            self.worktrees.remove(&path).await;
        }
        if let Err(e) = machine.apply(BranchEvent::Cleanup) {
            warn!(error = %e, "Cleanup from unexpected stage");
        }

        let verdict = match outcome {
            Ok(verdict) => verdict,
            Err(Halt::Failed(e)) => BranchVerdict::Failed(e),
            Err(Halt::Cancelled) => {
                info!("Branch abandoned after cancellation");
                return None;
            }
        };

        if let Err(e) = machine.apply(BranchEvent::Record) {
            warn!(error = %e, "Recording from unexpected stage");
        }

        let status = verdict.into_status(branch, worktree_created, started.elapsed());
        info!(
            status = %status.status,
            push_status = %status.push_status,
            error = status.error.as_deref().unwrap_or(""),
            duration_s = status.duration_seconds,
            "Branch recorded"
        );
        Some(status)
    }

    async fn drive(
        &self,
        ctx: &RunContext<'_>,
        reporter: &ProgressReporter<'_>,
        index: usize,
        branch: &str,
        machine: &mut BranchStateMachine,
        worktree: &mut Option<PathBuf>,
    ) -> Result<BranchVerdict, Halt> {
        let config = ctx.config;

        reporter.enter(index, branch, MergePhase::Fetch);
        machine.apply(BranchEvent::BeginFetch)?;
        if let Err(e) = ctx
            .executor
            .fetch(&config.remote, &config.source_branch, branch)
            .await
        {
            machine.apply(BranchEvent::FetchFailed)?;
            return Err(Halt::Failed(BranchError::Fetch(e.to_string())));
        }
        machine.apply(BranchEvent::FetchSucceeded)?;

        checkpoint(ctx.cancel, machine)?;
        reporter.enter(index, branch, MergePhase::Worktree);
        let path = match self
            .worktrees
            .create(branch, &config.remote, config.dry_run)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                machine.apply(BranchEvent::WorktreeFailed)?;
                return Err(Halt::Failed(BranchError::Worktree(e.to_string())));
            }
        };
        *worktree = Some(path.clone());
        machine.apply(BranchEvent::WorktreeCreated)?;

        checkpoint(ctx.cancel, machine)?;
        reporter.enter(index, branch, MergePhase::Merge);
        machine.apply(BranchEvent::BeginMerge)?;
        let commit = match ctx
            .executor
            .merge(&path, &config.remote, &config.source_branch)
            .await
        {
            Ok(MergeOutcome::Clean { commit }) => {
                machine.apply(BranchEvent::MergeClean)?;
                info!(commit = %commit, "Merged cleanly");
                commit
            }
            Ok(MergeOutcome::UpToDate) => {
                machine.apply(BranchEvent::MergeUpToDate)?;
                return Ok(BranchVerdict::UpToDate);
            }
            Ok(MergeOutcome::Conflicted { files }) => {
                machine.apply(BranchEvent::MergeConflicted)?;
                warn!(files = ?files, "Merge conflicted");
                return Err(Halt::Failed(BranchError::Conflict { files }));
            }
            Err(e) => {
                machine.apply(BranchEvent::MergeFailed)?;
                return Err(Halt::Failed(BranchError::Merge(e.to_string())));
            }
        };

        if !PushManager::should_push(config, MergeStatus::Success) {
            return Ok(BranchVerdict::Merged {
                push_status: PushStatus::NotExecuted,
                push_error: None,
            });
        }

        if let Err(halt) = checkpoint(ctx.cancel, machine) {
            // the branch ref already moved; it is not recorded, so say so here
            warn!(
                commit = %commit,
                "Cancelled before push: local {} now points at an unpushed merge commit",
                branch
            );
            return Err(halt);
        }
        reporter.enter(index, branch, MergePhase::Push);
        machine.apply(BranchEvent::BeginPush)?;
        let (push_status, push_error) = ctx.pusher.push(&path, branch, &config.remote).await;
        machine.apply(if push_status == PushStatus::Success {
            BranchEvent::PushSucceeded
        } else {
            BranchEvent::PushRejected
        })?;

        Ok(BranchVerdict::Merged {
            push_status,
            push_error: push_error.map(|e| BranchError::Push(e).to_string()),
        })
    }
}

/// Phase boundary: the only place cancellation is observed inside a branch
fn checkpoint(cancel: &CancellationToken, machine: &mut BranchStateMachine) -> Result<(), Halt> {
    if cancel.is_cancelled() {
        machine.apply(BranchEvent::Cancel)?;
        return Err(Halt::Cancelled);
    }
    Ok(())
}
