use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::git::{GitError, GitOps, WorktreeSpec};

/// Creates and removes the isolated checkout used for one target branch
pub struct WorktreeProvisioner {
    git: Arc<dyn GitOps>,
    root: PathBuf,
}

impl WorktreeProvisioner {
    pub fn new(git: Arc<dyn GitOps>, root: impl Into<PathBuf>) -> Self {
        Self {
            git,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<sanitized-branch>-<pid>-<unix-millis>`, with a numeric suffix
    /// appended while the candidate already exists on disk.
    pub fn allocate_path(&self, branch: &str) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let base = format!(
            "{}-{}-{}",
            sanitize_branch_name(branch),
            std::process::id(),
            millis
        );

        let mut candidate = self.root.join(&base);
        let mut n = 1;
        while candidate.exists() {
            candidate = self.root.join(format!("{base}-{n}"));
            n += 1;
        }
        candidate
    }

    /// Check out the tip of `branch` into a fresh directory.
    ///
    /// With `detached` the checkout does not hold the branch, so a merge
    /// commit made there never moves the branch ref.
    pub async fn create(
        &self,
        branch: &str,
        remote: &str,
        detached: bool,
    ) -> Result<PathBuf, GitError> {
        let spec = WorktreeSpec {
            branch: branch.to_string(),
            path: self.allocate_path(branch),
            detached,
            remote: remote.to_string(),
        };

        self.git.create_worktree(&spec).await?;
        debug!(branch, path = %spec.path.display(), detached, "worktree created");
        Ok(spec.path)
    }

    /// Best-effort removal. Returns whether the worktree is gone.
    pub async fn remove(&self, path: &Path) -> bool {
        match self.git.remove_worktree(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "worktree removed");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove worktree");
                false
            }
        }
    }
}

/// Map every character outside `[A-Za-z0-9._-]` to `-`
pub fn sanitize_branch_name(branch: &str) -> String {
    branch
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::operations::MockGitOps;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_branch_name() {
        assert_eq!(sanitize_branch_name("feat/x"), "feat-x");
        assert_eq!(sanitize_branch_name("release/2.0_rc-1"), "release-2.0_rc-1");
        assert_eq!(sanitize_branch_name("fix: über bug"), "fix---ber-bug");
    }

    #[test]
    fn test_allocated_path_is_under_root_and_unique() {
        let dir = TempDir::new().unwrap();
        let provisioner = WorktreeProvisioner::new(Arc::new(MockGitOps::new()), dir.path());

        let first = provisioner.allocate_path("feat/x");
        assert_eq!(first.parent(), Some(dir.path()));
        let name = first.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(&format!("feat-x-{}-", std::process::id())));

        std::fs::create_dir_all(&first).unwrap();
        let second = provisioner.allocate_path("feat/x");
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_create_passes_spec_to_git() {
        let mut git = MockGitOps::new();
        git.expect_create_worktree()
            .withf(|spec: &WorktreeSpec| {
                spec.branch == "feat/x" && spec.detached && spec.remote == "origin"
            })
            .times(1)
            .returning(|_| Ok(()));

        let provisioner = WorktreeProvisioner::new(Arc::new(git), "/tmp/bm");
        let path = provisioner.create("feat/x", "origin", true).await.unwrap();
        assert!(path.starts_with("/tmp/bm"));
    }

    #[tokio::test]
    async fn test_remove_failure_is_not_escalated() {
        let mut git = MockGitOps::new();
        git.expect_remove_worktree().times(1).returning(|p| {
            Err(GitError::WorktreeFailed {
                path: p.to_path_buf(),
                message: "locked".to_string(),
            })
        });

        let provisioner = WorktreeProvisioner::new(Arc::new(git), "/tmp/bm");
        assert!(!provisioner.remove(Path::new("/tmp/bm/feat-x-1-2")).await);
    }
}
