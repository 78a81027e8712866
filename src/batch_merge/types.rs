use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_REMOTE: &str = "origin";

/// Input for one batch merge run. Built once upstream and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMergeConfig {
    pub source_branch: String,
    /// Merged in this order; must be unique and must not contain `source_branch`
    pub target_branches: Vec<String>,
    pub dry_run: bool,
    pub auto_push: bool,
    #[serde(default = "default_remote")]
    pub remote: String,
}

fn default_remote() -> String {
    DEFAULT_REMOTE.to_string()
}

impl BatchMergeConfig {
    pub fn new(source_branch: impl Into<String>, target_branches: Vec<String>) -> Self {
        Self {
            source_branch: source_branch.into(),
            target_branches,
            dry_run: false,
            auto_push: false,
            remote: default_remote(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_auto_push(mut self, auto_push: bool) -> Self {
        self.auto_push = auto_push;
        self
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Push only ever happens for real runs that asked for it
    pub fn push_enabled(&self) -> bool {
        self.auto_push && !self.dry_run
    }
}

/// Discrete stage of processing a single target branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePhase {
    Fetch,
    Worktree,
    Merge,
    Push,
    Cleanup,
}

impl std::fmt::Display for MergePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Worktree => write!(f, "worktree"),
            Self::Merge => write!(f, "merge"),
            Self::Push => write!(f, "push"),
            Self::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// Immutable progress snapshot handed to the progress sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMergeProgress {
    pub current_branch: String,
    pub current_index: usize,
    pub total_branches: usize,
    /// 0-100, computed when the phase is entered
    pub percentage: u8,
    pub elapsed_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_remaining_seconds: Option<f64>,
    pub current_phase: MergePhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStatus {
    Success,
    Skipped,
    Failed,
}

impl std::fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushStatus {
    Success,
    Failed,
    NotExecuted,
}

impl std::fmt::Display for PushStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::NotExecuted => write!(f, "not_executed"),
        }
    }
}

/// Terminal outcome for one target branch. Created once, never revised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchMergeStatus {
    pub branch_name: String,
    pub status: MergeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Only present when the merge failed because of conflicts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_files: Option<Vec<String>>,
    pub push_status: PushStatus,
    pub worktree_created: bool,
    pub duration_seconds: f64,
}

impl BranchMergeStatus {
    pub fn is_conflict(&self) -> bool {
        self.conflict_files.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMergeSummary {
    pub total_count: usize,
    pub success_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    pub pushed_count: usize,
    pub push_failed_count: usize,
}

/// Final result of a run, complete or cancelled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMergeResult {
    pub run_id: String,
    /// One entry per recorded branch, in config order
    pub statuses: Vec<BranchMergeStatus>,
    pub summary: BatchMergeSummary,
    pub total_duration_seconds: f64,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config: BatchMergeConfig,
}

impl BatchMergeResult {
    pub fn status_for(&self, branch: &str) -> Option<&BranchMergeStatus> {
        self.statuses.iter().find(|s| s.branch_name == branch)
    }

    /// Process exit code for a wrapping CLI
    pub fn exit_code(&self) -> i32 {
        if self.summary.failed_count > 0 {
            1
        } else if self.cancelled {
            130
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_to_origin() {
        let config = BatchMergeConfig::new("main", vec!["feat/x".to_string()]);
        assert_eq!(config.remote, "origin");
        assert!(!config.dry_run);
        assert!(!config.auto_push);
    }

    #[test]
    fn test_push_enabled_requires_real_run() {
        let config = BatchMergeConfig::new("main", vec!["a".to_string()]).with_auto_push(true);
        assert!(config.push_enabled());
        assert!(!config.clone().with_dry_run(true).push_enabled());
        assert!(!config.with_auto_push(false).push_enabled());
    }

    #[test]
    fn test_config_deserializes_without_remote() {
        let json = r#"{"sourceBranch":"main","targetBranches":["a"],"dryRun":true,"autoPush":false}"#;
        let config: BatchMergeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.remote, "origin");
        assert!(config.dry_run);
    }

    #[test]
    fn test_status_serialization_uses_wire_names() {
        let status = BranchMergeStatus {
            branch_name: "feat/y".to_string(),
            status: MergeStatus::Failed,
            error: Some("conflict".to_string()),
            conflict_files: Some(vec!["a.txt".to_string()]),
            push_status: PushStatus::NotExecuted,
            worktree_created: true,
            duration_seconds: 1.5,
        };

        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["branchName"], "feat/y");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["pushStatus"], "not_executed");
        assert_eq!(value["conflictFiles"][0], "a.txt");
        assert_eq!(value["worktreeCreated"], true);
    }

    #[test]
    fn test_progress_omits_eta_until_known() {
        let progress = BatchMergeProgress {
            current_branch: "a".to_string(),
            current_index: 0,
            total_branches: 2,
            percentage: 0,
            elapsed_seconds: 0.0,
            estimated_remaining_seconds: None,
            current_phase: MergePhase::Fetch,
        };

        let value = serde_json::to_value(&progress).unwrap();
        assert!(value.get("estimatedRemainingSeconds").is_none());
        assert_eq!(value["currentPhase"], "fetch");
    }
}
