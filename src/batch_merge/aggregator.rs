use super::types::{BatchMergeSummary, BranchMergeStatus, MergeStatus, PushStatus};

/// Folds final branch statuses into summary counts
pub struct ResultAggregator;

impl ResultAggregator {
    /// Single pass. Push counts are tallied independently of merge status.
    pub fn summarize(statuses: &[BranchMergeStatus]) -> BatchMergeSummary {
        statuses
            .iter()
            .fold(BatchMergeSummary::default(), |mut summary, status| {
                summary.total_count += 1;
                match status.status {
                    MergeStatus::Success => summary.success_count += 1,
                    MergeStatus::Skipped => summary.skipped_count += 1,
                    MergeStatus::Failed => summary.failed_count += 1,
                }
                match status.push_status {
                    PushStatus::Success => summary.pushed_count += 1,
                    PushStatus::Failed => summary.push_failed_count += 1,
                    PushStatus::NotExecuted => {}
                }
                summary
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(name: &str, status: MergeStatus, push_status: PushStatus) -> BranchMergeStatus {
        BranchMergeStatus {
            branch_name: name.to_string(),
            status,
            error: None,
            conflict_files: None,
            push_status,
            worktree_created: true,
            duration_seconds: 0.1,
        }
    }

    #[test]
    fn test_empty() {
        assert_eq!(ResultAggregator::summarize(&[]), BatchMergeSummary::default());
    }

    #[test]
    fn test_counts() {
        let statuses = vec![
            status("a", MergeStatus::Success, PushStatus::Success),
            status("b", MergeStatus::Success, PushStatus::Failed),
            status("c", MergeStatus::Skipped, PushStatus::NotExecuted),
            status("d", MergeStatus::Failed, PushStatus::NotExecuted),
            status("e", MergeStatus::Success, PushStatus::NotExecuted),
        ];

        assert_eq!(
            ResultAggregator::summarize(&statuses),
            BatchMergeSummary {
                total_count: 5,
                success_count: 3,
                skipped_count: 1,
                failed_count: 1,
                pushed_count: 1,
                push_failed_count: 1,
            }
        );
    }
}
