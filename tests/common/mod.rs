// Scriptable in-memory git collaborator shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use batch_merge::{CancellationToken, GitError, GitOps, MergeOutcome, WorktreeSpec};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedMerge {
    Clean,
    UpToDate,
    Conflict(Vec<String>),
    Error(String),
}

#[derive(Debug, Clone)]
pub struct BranchScript {
    pub fetch_fails: bool,
    pub worktree_fails: bool,
    pub merge: ScriptedMerge,
    pub push_fails: bool,
}

impl Default for BranchScript {
    fn default() -> Self {
        Self {
            fetch_fails: false,
            worktree_fails: false,
            merge: ScriptedMerge::Clean,
            push_fails: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch { remote: String, refs: Vec<String> },
    CreateWorktree { branch: String, detached: bool },
    RemoveWorktree { branch: String },
    Merge { branch: String, source_ref: String },
    Push { branch: String, remote: String },
}

pub struct FakeGitOps {
    remotes: Vec<String>,
    scripts: HashMap<String, BranchScript>,
    calls: Mutex<Vec<Call>>,
    worktrees: Mutex<HashMap<PathBuf, String>>,
    cancel_on_cleanup: Option<(String, CancellationToken)>,
    cancel_on_merge: Option<(String, CancellationToken)>,
}

impl FakeGitOps {
    pub fn new() -> Self {
        Self {
            remotes: vec!["origin".to_string()],
            scripts: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            worktrees: Mutex::new(HashMap::new()),
            cancel_on_cleanup: None,
            cancel_on_merge: None,
        }
    }

    pub fn with_remote(mut self, remote: &str) -> Self {
        self.remotes.push(remote.to_string());
        self
    }

    pub fn script(mut self, branch: &str, script: BranchScript) -> Self {
        self.scripts.insert(branch.to_string(), script);
        self
    }

    pub fn merge_outcome(self, branch: &str, merge: ScriptedMerge) -> Self {
        self.script(
            branch,
            BranchScript {
                merge,
                ..Default::default()
            },
        )
    }

    /// Cancel `token` while `branch`'s worktree is being removed, i.e. after
    /// its last phase and before the next branch starts
    pub fn cancel_on_cleanup_of(mut self, branch: &str, token: CancellationToken) -> Self {
        self.cancel_on_cleanup = Some((branch.to_string(), token));
        self
    }

    /// Cancel `token` while `branch` is being merged, so the next checkpoint
    /// inside that branch observes it
    pub fn cancel_on_merge_of(mut self, branch: &str, token: CancellationToken) -> Self {
        self.cancel_on_merge = Some((branch.to_string(), token));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn push_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Push { .. }))
            .count()
    }

    /// Branches whose worktree is still registered
    pub fn live_worktrees(&self) -> Vec<String> {
        self.worktrees.lock().unwrap().values().cloned().collect()
    }

    fn script_for(&self, branch: &str) -> BranchScript {
        self.scripts.get(branch).cloned().unwrap_or_default()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn branch_at(&self, path: &Path) -> Result<String, GitError> {
        self.worktrees
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or(GitError::RepositoryNotFound)
    }
}

#[async_trait]
impl GitOps for FakeGitOps {
    async fn remote_exists(&self, remote: &str) -> Result<bool, GitError> {
        Ok(self.remotes.iter().any(|r| r == remote))
    }

    async fn fetch(&self, remote: &str, refs: &[String]) -> Result<(), GitError> {
        self.record(Call::Fetch {
            remote: remote.to_string(),
            refs: refs.to_vec(),
        });
        if refs.iter().any(|r| self.script_for(r).fetch_fails) {
            return Err(GitError::FetchFailed {
                remote: remote.to_string(),
                message: "Could not resolve host".to_string(),
            });
        }
        Ok(())
    }

    async fn create_worktree(&self, spec: &WorktreeSpec) -> Result<(), GitError> {
        self.record(Call::CreateWorktree {
            branch: spec.branch.clone(),
            detached: spec.detached,
        });
        if self.script_for(&spec.branch).worktree_fails {
            return Err(GitError::WorktreeFailed {
                path: spec.path.clone(),
                message: "already checked out".to_string(),
            });
        }
        self.worktrees
            .lock()
            .unwrap()
            .insert(spec.path.clone(), spec.branch.clone());
        Ok(())
    }

    async fn remove_worktree(&self, path: &Path) -> Result<(), GitError> {
        let branch = self
            .worktrees
            .lock()
            .unwrap()
            .remove(path)
            .ok_or(GitError::RepositoryNotFound)?;
        self.record(Call::RemoveWorktree {
            branch: branch.clone(),
        });

        if let Some((trigger, token)) = &self.cancel_on_cleanup {
            if *trigger == branch {
                token.cancel();
            }
        }
        Ok(())
    }

    async fn merge(&self, path: &Path, source_ref: &str) -> Result<MergeOutcome, GitError> {
        let branch = self.branch_at(path)?;
        self.record(Call::Merge {
            branch: branch.clone(),
            source_ref: source_ref.to_string(),
        });

        if let Some((trigger, token)) = &self.cancel_on_merge {
            if *trigger == branch {
                token.cancel();
            }
        }

        match self.script_for(&branch).merge {
            ScriptedMerge::Clean => Ok(MergeOutcome::Clean {
                commit: format!("merge-commit-{branch}"),
            }),
            ScriptedMerge::UpToDate => Ok(MergeOutcome::UpToDate),
            ScriptedMerge::Conflict(files) => Ok(MergeOutcome::Conflicted { files }),
            ScriptedMerge::Error(message) => Err(GitError::GitCommandFailed { message }),
        }
    }

    async fn push(&self, path: &Path, branch: &str, remote: &str) -> Result<(), GitError> {
        self.branch_at(path)?;
        self.record(Call::Push {
            branch: branch.to_string(),
            remote: remote.to_string(),
        });
        if self.script_for(branch).push_fails {
            return Err(GitError::PushRejected {
                branch: branch.to_string(),
                remote: remote.to_string(),
                message: "non-fast-forward".to_string(),
            });
        }
        Ok(())
    }
}

pub fn targets(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}
