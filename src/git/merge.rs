//! Merge classification inside a provisioned worktree
//!
//! Uses libgit2 so that conflicts are read straight from the index instead of
//! being scraped from porcelain output.

use git2::{build::CheckoutBuilder, Index, Repository, ResetType, Signature};
use std::collections::BTreeSet;
use std::path::Path;

use super::operations::{GitError, MergeOutcome};

/// Identity used for merge commits when the repository has no `user.*` config
#[derive(Debug, Clone)]
pub struct MergeIdentity {
    pub name: String,
    pub email: String,
}

impl Default for MergeIdentity {
    fn default() -> Self {
        Self {
            name: "batch-merge".to_string(),
            email: "batch-merge@localhost".to_string(),
        }
    }
}

/// Merge `source_ref` into the checkout at `path`.
///
/// A clean merge is committed (or fast-forwarded). A conflicted merge is
/// aborted after the unmerged paths are collected, so the worktree is left
/// at its original tip.
pub fn merge_in_worktree(
    path: &Path,
    source_ref: &str,
    identity: &MergeIdentity,
) -> Result<MergeOutcome, GitError> {
    let repo = Repository::open(path).map_err(|_| GitError::RepositoryNotFound)?;

    let source_commit = repo
        .revparse_single(source_ref)
        .and_then(|obj| obj.peel_to_commit())
        .map_err(|_| GitError::BranchNotFound {
            branch: source_ref.to_string(),
        })?;
    let annotated = repo.find_annotated_commit(source_commit.id())?;

    let (analysis, _) = repo.merge_analysis(&[&annotated])?;

    if analysis.is_up_to_date() {
        return Ok(MergeOutcome::UpToDate);
    }

    if analysis.is_fast_forward() {
        let target = source_commit.id();
        let head = repo.head()?;
        if head.is_branch() {
            let mut head = head;
            head.set_target(target, &format!("batch-merge: fast-forward to {source_ref}"))?;
        } else {
            repo.set_head_detached(target)?;
        }
        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        repo.checkout_head(Some(&mut checkout))?;
        return Ok(MergeOutcome::Clean {
            commit: target.to_string(),
        });
    }

    if !analysis.is_normal() {
        return Err(GitError::GitCommandFailed {
            message: format!("cannot merge {source_ref}: unsupported merge analysis"),
        });
    }

    repo.merge(&[&annotated], None, None)?;

    let mut index = repo.index()?;
    if index.has_conflicts() {
        let files = unmerged_paths(&index)?;
        abort_merge(&repo)?;
        return Ok(MergeOutcome::Conflicted { files });
    }

    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    let head = repo.head()?;
    let head_name = head.shorthand().unwrap_or("HEAD").to_string();
    let head_commit = head.peel_to_commit()?;
    let signature = signature(&repo, identity)?;

    let commit = repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        &format!("Merge {source_ref} into {head_name}"),
        &tree,
        &[&head_commit, &source_commit],
    )?;
    repo.cleanup_state()?;

    Ok(MergeOutcome::Clean {
        commit: commit.to_string(),
    })
}

/// Every path that has an unmerged entry at any stage
pub fn unmerged_paths(index: &Index) -> Result<Vec<String>, GitError> {
    let mut paths = BTreeSet::new();

    for conflict in index.conflicts()? {
        let conflict = conflict?;
        // delete/modify conflicts have no "our" or "their" entry, so look at all stages
        for entry in [conflict.ancestor, conflict.our, conflict.their]
            .into_iter()
            .flatten()
        {
            paths.insert(String::from_utf8_lossy(&entry.path).into_owned());
        }
    }

    Ok(paths.into_iter().collect())
}

fn abort_merge(repo: &Repository) -> Result<(), GitError> {
    repo.cleanup_state()?;
    let head = repo.head()?.peel_to_commit()?;
    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.reset(head.as_object(), ResetType::Hard, Some(&mut checkout))?;
    Ok(())
}

fn signature(repo: &Repository, identity: &MergeIdentity) -> Result<Signature<'static>, GitError> {
    match repo.signature() {
        Ok(sig) => Ok(sig.to_owned()),
        Err(_) => Ok(Signature::now(&identity.name, &identity.email)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Oid, RepositoryState};
    use tempfile::TempDir;

    struct TestRepo {
        dir: TempDir,
        repo: Repository,
    }

    impl TestRepo {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let repo = Repository::init(dir.path()).unwrap();
            Self { dir, repo }
        }

        /// Commit `files` on top of `parent` and point `branch` at the result
        fn commit(&self, branch: &str, parent: Option<Oid>, files: &[(&str, &str)]) -> Oid {
            let mut builder = match parent {
                Some(oid) => {
                    let tree = self.repo.find_commit(oid).unwrap().tree().unwrap();
                    self.repo.treebuilder(Some(&tree)).unwrap()
                }
                None => self.repo.treebuilder(None).unwrap(),
            };
            for &(name, content) in files {
                let blob = self.repo.blob(content.as_bytes()).unwrap();
                builder.insert(name, blob, 0o100644).unwrap();
            }
            let tree = self.repo.find_tree(builder.write().unwrap()).unwrap();
            let sig = Signature::now("Test", "test@example.com").unwrap();
            let parents: Vec<git2::Commit> = parent
                .map(|oid| vec![self.repo.find_commit(oid).unwrap()])
                .unwrap_or_default();
            let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

            let oid = self
                .repo
                .commit(None, &sig, &sig, &format!("commit on {branch}"), &tree, &parent_refs)
                .unwrap();
            self.repo
                .reference(&format!("refs/heads/{branch}"), oid, true, "test")
                .unwrap();
            oid
        }

        fn checkout(&self, branch: &str) {
            self.repo.set_head(&format!("refs/heads/{branch}")).unwrap();
            let mut checkout = CheckoutBuilder::new();
            checkout.force();
            self.repo.checkout_head(Some(&mut checkout)).unwrap();
        }

        fn head(&self) -> Oid {
            self.repo.head().unwrap().target().unwrap()
        }
    }

    #[test]
    fn test_up_to_date_when_target_contains_source() {
        let t = TestRepo::new();
        let base = t.commit("main", None, &[("a.txt", "base")]);
        t.commit("target", Some(base), &[("b.txt", "target only")]);
        t.checkout("target");

        let outcome = merge_in_worktree(t.dir.path(), "main", &MergeIdentity::default()).unwrap();
        assert_eq!(outcome, MergeOutcome::UpToDate);
    }

    #[test]
    fn test_fast_forward_moves_branch_to_source() {
        let t = TestRepo::new();
        let base = t.commit("target", None, &[("a.txt", "base")]);
        let source = t.commit("main", Some(base), &[("a.txt", "newer")]);
        t.checkout("target");

        let outcome = merge_in_worktree(t.dir.path(), "main", &MergeIdentity::default()).unwrap();

        assert_eq!(
            outcome,
            MergeOutcome::Clean {
                commit: source.to_string()
            }
        );
        assert_eq!(t.head(), source);
        assert_eq!(
            std::fs::read_to_string(t.dir.path().join("a.txt")).unwrap(),
            "newer"
        );
    }

    #[test]
    fn test_clean_merge_creates_two_parent_commit() {
        let t = TestRepo::new();
        let base = t.commit("main", None, &[("a.txt", "base")]);
        let source = t.commit("main", Some(base), &[("x.txt", "from main")]);
        let target = t.commit("target", Some(base), &[("y.txt", "from target")]);
        t.checkout("target");

        let outcome = merge_in_worktree(t.dir.path(), "main", &MergeIdentity::default()).unwrap();

        let MergeOutcome::Clean { commit } = outcome else {
            panic!("expected clean merge, got {outcome:?}");
        };
        let merged = t.repo.find_commit(Oid::from_str(&commit).unwrap()).unwrap();
        let parents: Vec<Oid> = merged.parent_ids().collect();
        assert_eq!(parents, vec![target, source]);
        assert!(t.dir.path().join("x.txt").exists());
        assert_eq!(t.repo.state(), RepositoryState::Clean);
    }

    #[test]
    fn test_conflicts_enumerate_every_unmerged_path() {
        let t = TestRepo::new();
        let base = t.commit("main", None, &[("a.txt", "base a"), ("b.txt", "base b")]);
        t.commit(
            "main",
            Some(base),
            &[("a.txt", "main a"), ("b.txt", "main b"), ("c.txt", "only main")],
        );
        let target = t.commit("target", Some(base), &[("a.txt", "target a"), ("b.txt", "target b")]);
        t.checkout("target");

        let outcome = merge_in_worktree(t.dir.path(), "main", &MergeIdentity::default()).unwrap();

        assert_eq!(
            outcome,
            MergeOutcome::Conflicted {
                files: vec!["a.txt".to_string(), "b.txt".to_string()]
            }
        );
        // merge is aborted in place
        assert_eq!(t.head(), target);
        assert_eq!(t.repo.state(), RepositoryState::Clean);
        assert!(!t.repo.index().unwrap().has_conflicts());
    }

    #[test]
    fn test_unknown_source_ref_is_branch_not_found() {
        let t = TestRepo::new();
        t.commit("target", None, &[("a.txt", "base")]);
        t.checkout("target");

        let err = merge_in_worktree(t.dir.path(), "origin/missing", &MergeIdentity::default())
            .unwrap_err();
        assert!(matches!(err, GitError::BranchNotFound { branch } if branch == "origin/missing"));
    }
}
