//! Human readable rendering of progress and results

use std::fmt::Write;

use crate::batch_merge::{BatchMergeProgress, BatchMergeResult, MergeStatus, PushStatus};

/// One line per phase entry, e.g. `[ 50%] feat/y (2/4) merge, ~12s left`
pub fn progress_line(progress: &BatchMergeProgress) -> String {
    let mut line = format!(
        "[{:>3}%] {} ({}/{}) {}",
        progress.percentage,
        progress.current_branch,
        progress.current_index + 1,
        progress.total_branches,
        progress.current_phase
    );
    if let Some(eta) = progress.estimated_remaining_seconds {
        let _ = write!(line, ", ~{}s left", eta.round() as u64);
    }
    line
}

pub fn render_human(result: &BatchMergeResult) -> String {
    let mut out = String::new();
    let config = &result.config;

    let _ = writeln!(
        out,
        "🔀 Merged {} into {} branch(es){}",
        config.source_branch,
        config.target_branches.len(),
        if config.dry_run { " (dry run)" } else { "" }
    );

    let width = result
        .statuses
        .iter()
        .map(|s| s.branch_name.len())
        .max()
        .unwrap_or(0);

    for status in &result.statuses {
        let icon = match status.status {
            MergeStatus::Success => "✅",
            MergeStatus::Skipped => "⏭️ ",
            MergeStatus::Failed => "❌",
        };
        let mut line = format!(
            "  {icon} {:<width$}  {}",
            status.branch_name,
            status.status,
            width = width
        );
        match status.push_status {
            PushStatus::Success => line.push_str("  pushed"),
            PushStatus::Failed => line.push_str("  push failed"),
            PushStatus::NotExecuted => {}
        }
        if status.status == MergeStatus::Skipped {
            line.push_str("  (already up to date)");
        }
        let _ = writeln!(out, "{line}");

        if let Some(files) = &status.conflict_files {
            for file in files {
                let _ = writeln!(out, "       conflict: {file}");
            }
        } else if let Some(error) = &status.error {
            let _ = writeln!(out, "       {error}");
        }
    }

    let summary = &result.summary;
    let _ = writeln!(
        out,
        "📊 Summary: {} total, {} success, {} skipped, {} failed, {} pushed, {} push failed",
        summary.total_count,
        summary.success_count,
        summary.skipped_count,
        summary.failed_count,
        summary.pushed_count,
        summary.push_failed_count
    );

    if result.cancelled {
        let _ = writeln!(
            out,
            "⚠️  Cancelled after {} of {} branch(es)",
            result.statuses.len(),
            config.target_branches.len()
        );
    }
    let _ = writeln!(out, "⏱️  Finished in {:.1}s", result.total_duration_seconds);

    out
}
