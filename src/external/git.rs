//! Production git collaborator
//!
//! Network and worktree metadata operations shell out to the git CLI so they
//! pick up the user's credential helpers and hooks. Merges run through
//! libgit2 (see [`crate::git::merge`]) so conflicts come straight from the index.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::command::{CommandExecutor, CommandOutput};
use crate::git::merge::{merge_in_worktree, MergeIdentity};
use crate::git::{GitError, GitOps, MergeOutcome, WorktreeSpec};

/// Real Git implementation
pub struct GitClient {
    executor: Arc<dyn CommandExecutor>,
    repo_root: PathBuf,
    program: String,
    identity: MergeIdentity,
}

impl GitClient {
    pub fn new(executor: Arc<dyn CommandExecutor>, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            repo_root: repo_root.into(),
            program: "git".to_string(),
            identity: MergeIdentity::default(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_identity(mut self, identity: MergeIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    async fn run(&self, cwd: &Path, args: &[String]) -> Result<CommandOutput, GitError> {
        Ok(self.executor.execute(&self.program, args, cwd).await?)
    }

    async fn run_checked(&self, cwd: &Path, args: &[String]) -> Result<String, GitError> {
        let output = self.run(cwd, args).await?;
        if !output.success() {
            return Err(Self::classify_git_error(&output.stderr, args));
        }
        Ok(output.stdout.trim().to_string())
    }

    fn classify_git_error(stderr: &str, args: &[String]) -> GitError {
        if stderr.contains("not a git repository") {
            GitError::RepositoryNotFound
        } else if stderr.contains("No such remote") {
            GitError::RemoteNotFound {
                remote: args.get(2).cloned().unwrap_or_default(),
            }
        } else {
            GitError::GitCommandFailed {
                message: format!("git {}: {}", args.join(" "), stderr.trim()),
            }
        }
    }

    async fn ref_exists(&self, refname: &str) -> Result<bool, GitError> {
        let args = strings(&["show-ref", "--verify", "--quiet", refname]);
        let output = self.run(&self.repo_root, &args).await?;
        Ok(output.success())
    }

    /// Remote-tracking ref for `branch`, which the preceding fetch refreshed
    async fn tracking_ref(&self, branch: &str, remote: &str) -> Result<String, GitError> {
        if self
            .ref_exists(&format!("refs/remotes/{remote}/{branch}"))
            .await?
        {
            return Ok(format!("{remote}/{branch}"));
        }
        Err(GitError::BranchNotFound {
            branch: branch.to_string(),
        })
    }

    /// A local branch may be moved to the tracking tip only if that loses nothing
    async fn ensure_local_not_ahead(
        &self,
        branch: &str,
        tracking: &str,
    ) -> Result<(), GitError> {
        if !self.ref_exists(&format!("refs/heads/{branch}")).await? {
            return Ok(());
        }

        let args = strings(&[
            "merge-base",
            "--is-ancestor",
            &format!("refs/heads/{branch}"),
            &format!("refs/remotes/{tracking}"),
        ]);
        let output = self.run(&self.repo_root, &args).await?;
        match output.status_code {
            0 => Ok(()),
            1 => Err(GitError::LocalBranchAhead {
                branch: branch.to_string(),
                tracking: tracking.to_string(),
            }),
            _ => Err(Self::classify_git_error(&output.stderr, &args)),
        }
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| (*a).to_string()).collect()
}

#[async_trait]
impl GitOps for GitClient {
    async fn remote_exists(&self, remote: &str) -> Result<bool, GitError> {
        let stdout = self.run_checked(&self.repo_root, &strings(&["remote"])).await?;
        Ok(stdout.lines().any(|line| line.trim() == remote))
    }

    async fn fetch(&self, remote: &str, refs: &[String]) -> Result<(), GitError> {
        let mut args = strings(&["fetch", "--no-tags", remote]);
        args.extend(
            refs.iter()
                .map(|r| format!("+refs/heads/{r}:refs/remotes/{remote}/{r}")),
        );

        let output = self.run(&self.repo_root, &args).await?;
        if !output.success() {
            return Err(GitError::FetchFailed {
                remote: remote.to_string(),
                message: output.stderr.trim().to_string(),
            });
        }
        tracing::debug!(remote, ?refs, "fetched refs");
        Ok(())
    }

    async fn create_worktree(&self, spec: &WorktreeSpec) -> Result<(), GitError> {
        if let Some(parent) = spec.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let path = spec.path.display().to_string();
        let tracking = self.tracking_ref(&spec.branch, &spec.remote).await?;
        let args = if spec.detached {
            strings(&["worktree", "add", "--detach", &path, &tracking])
        } else {
            // -B fast-forwards an existing local branch to the fetched tip
            self.ensure_local_not_ahead(&spec.branch, &tracking).await?;
            strings(&[
                "worktree",
                "add",
                "--track",
                "-B",
                &spec.branch,
                &path,
                &tracking,
            ])
        };

        let output = self.run(&self.repo_root, &args).await?;
        if !output.success() {
            return Err(GitError::WorktreeFailed {
                path: spec.path.clone(),
                message: output.stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    async fn remove_worktree(&self, path: &Path) -> Result<(), GitError> {
        let target = path.display().to_string();
        let removed = self
            .run(
                &self.repo_root,
                &strings(&["worktree", "remove", "--force", &target]),
            )
            .await?;

        let mut failure = None;
        if !removed.success() {
            failure = Some(removed.stderr.trim().to_string());
            if path.exists() {
                if let Err(e) = tokio::fs::remove_dir_all(path).await {
                    tracing::warn!(path = %target, error = %e, "could not delete worktree directory");
                }
            }
        }

        let pruned = self
            .run(&self.repo_root, &strings(&["worktree", "prune"]))
            .await?;
        if !pruned.success() && failure.is_none() {
            failure = Some(pruned.stderr.trim().to_string());
        }

        match failure {
            Some(message) => Err(GitError::WorktreeFailed {
                path: path.to_path_buf(),
                message,
            }),
            None => Ok(()),
        }
    }

    async fn merge(&self, path: &Path, source_ref: &str) -> Result<MergeOutcome, GitError> {
        let path = path.to_path_buf();
        let source_ref = source_ref.to_string();
        let identity = self.identity.clone();

        // libgit2 is blocking; keep it off the async worker threads
        tokio::task::spawn_blocking(move || merge_in_worktree(&path, &source_ref, &identity))
            .await
            .map_err(|e| GitError::GitCommandFailed {
                message: format!("merge task failed: {e}"),
            })?
    }

    async fn push(&self, path: &Path, branch: &str, remote: &str) -> Result<(), GitError> {
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        let output = self
            .run(path, &strings(&["push", "--porcelain", remote, &refspec]))
            .await?;

        if !output.success() {
            let message = if output.stderr.trim().is_empty() {
                output.stdout.trim().to_string()
            } else {
                output.stderr.trim().to_string()
            };
            return Err(GitError::PushRejected {
                branch: branch.to_string(),
                remote: remote.to_string(),
                message,
            });
        }
        Ok(())
    }
}
