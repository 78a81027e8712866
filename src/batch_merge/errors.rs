use thiserror::Error;

use super::state_machine::TransitionError;
use super::types::BatchMergeConfig;

/// Problems with the run configuration. These abort `run()` before any branch
/// is touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No target branches given")]
    EmptyTargets,
    #[error("Source branch name is empty")]
    EmptySource,
    #[error("Target branch listed more than once: {branch}")]
    DuplicateTarget { branch: String },
    #[error("Source branch {branch} is also a target")]
    SourceInTargets { branch: String },
    #[error("Invalid remote {remote:?}: {reason}")]
    InvalidRemote { remote: String, reason: String },
    #[error("Remote not configured: {remote}")]
    RemoteNotFound { remote: String },
}

/// Failure while processing one target branch.
///
/// Never escapes the branch boundary: the orchestrator turns it into that
/// branch's [`super::types::BranchMergeStatus`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BranchError {
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("worktree setup failed: {0}")]
    Worktree(String),
    #[error("merge conflict in {} file(s): {}", files.len(), files.join(", "))]
    Conflict { files: Vec<String> },
    #[error("merge failed: {0}")]
    Merge(String),
    #[error("push failed: {0}")]
    Push(String),
    #[error("{0}")]
    Transition(#[from] TransitionError),
}

impl BranchError {
    pub fn conflict_files(&self) -> Option<&[String]> {
        match self {
            BranchError::Conflict { files } => Some(files),
            _ => None,
        }
    }
}

/// Static checks run before the batch starts
pub fn validate_config(config: &BatchMergeConfig) -> Result<(), ConfigError> {
    if config.source_branch.trim().is_empty() {
        return Err(ConfigError::EmptySource);
    }
    if config.target_branches.is_empty() {
        return Err(ConfigError::EmptyTargets);
    }
    validate_remote_name(&config.remote)?;

    let mut seen = std::collections::HashSet::new();
    for branch in &config.target_branches {
        if branch == &config.source_branch {
            return Err(ConfigError::SourceInTargets {
                branch: branch.clone(),
            });
        }
        if !seen.insert(branch.as_str()) {
            return Err(ConfigError::DuplicateTarget {
                branch: branch.clone(),
            });
        }
    }

    Ok(())
}

fn validate_remote_name(remote: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidRemote {
        remote: remote.to_string(),
        reason: reason.to_string(),
    };

    if remote.is_empty() {
        return Err(invalid("name is empty"));
    }
    if remote.starts_with('-') {
        return Err(invalid("name starts with '-'"));
    }
    if remote.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("name contains whitespace"));
    }
    if remote.contains("..") || remote.contains(':') {
        return Err(invalid("name is not a valid ref component"));
    }
    Ok(())
}
