//! Progress snapshots
//!
//! The orchestrator owns the only [`ProgressReporter`]. Sinks receive an
//! immutable [`BatchMergeProgress`] at every phase entry and must return
//! promptly; they are called synchronously between git operations.

use std::time::{Duration, Instant};

#[cfg(test)]
use mockall::automock;

use super::types::{BatchMergeProgress, MergePhase};

/// Receives progress snapshots during a run
#[cfg_attr(test, automock)]
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, progress: &BatchMergeProgress);
}

/// Discards every snapshot
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _progress: &BatchMergeProgress) {}
}

/// Adapts a closure into a [`ProgressSink`]
pub struct FnProgress<F>(pub F);

impl<F> ProgressSink for FnProgress<F>
where
    F: Fn(&BatchMergeProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &BatchMergeProgress) {
        (self.0)(progress)
    }
}

pub struct ProgressReporter<'a> {
    sink: &'a dyn ProgressSink,
    started: Instant,
    total: usize,
    completed: usize,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: &'a dyn ProgressSink, total: usize) -> Self {
        Self {
            sink,
            started: Instant::now(),
            total,
            completed: 0,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Emit a snapshot for entering `phase` of the branch at `index`
    pub fn enter(&self, index: usize, branch: &str, phase: MergePhase) -> BatchMergeProgress {
        let progress = self.snapshot(index, branch, phase, self.elapsed());
        self.sink.on_progress(&progress);
        progress
    }

    /// Count one more branch as finished; feeds the remaining-time estimate
    pub fn branch_completed(&mut self) {
        self.completed += 1;
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn snapshot(
        &self,
        index: usize,
        branch: &str,
        phase: MergePhase,
        elapsed: Duration,
    ) -> BatchMergeProgress {
        let elapsed_seconds = elapsed.as_secs_f64();
        let remaining = self.total.saturating_sub(self.completed);

        BatchMergeProgress {
            current_branch: branch.to_string(),
            current_index: index,
            total_branches: self.total,
            percentage: percentage(index, self.total),
            elapsed_seconds,
            estimated_remaining_seconds: estimate_remaining(
                elapsed_seconds,
                self.completed,
                remaining,
            ),
            current_phase: phase,
        }
    }
}

/// Share of the batch before the branch at `index`, rounded, 0-100
pub fn percentage(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (index as f64 * 100.0 / total as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

/// `(elapsed / completed) * remaining`, absent until one branch has finished
pub fn estimate_remaining(elapsed_seconds: f64, completed: usize, remaining: usize) -> Option<f64> {
    if completed == 0 {
        return None;
    }
    Some(elapsed_seconds / completed as f64 * remaining as f64)
}
