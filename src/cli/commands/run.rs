use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use super::Command;
use crate::batch_merge::{BatchMergeConfig, BatchMergeOrchestrator, BatchMergeProgress, FnProgress};
use crate::cli::{report, RunArgs};
use crate::config::BatchMergeSettings;
use crate::external::{GitClient, ProcessCommandExecutor};
use crate::shutdown::ShutdownCoordinator;

pub struct RunCommand {
    pub args: RunArgs,
    pub settings: BatchMergeSettings,
}

impl RunCommand {
    pub fn new(args: RunArgs, settings: BatchMergeSettings) -> Self {
        Self { args, settings }
    }

    /// Flags win over settings
    pub fn batch_config(&self) -> BatchMergeConfig {
        BatchMergeConfig::new(self.args.source.clone(), self.args.targets.clone())
            .with_dry_run(self.args.dry_run)
            .with_auto_push(self.args.push)
            .with_remote(
                self.args
                    .remote
                    .clone()
                    .unwrap_or_else(|| self.settings.remote.clone()),
            )
    }

    pub fn worktree_root(&self) -> PathBuf {
        self.args
            .worktree_root
            .clone()
            .unwrap_or_else(|| self.settings.worktree_root.clone())
    }

    fn repo_root(&self) -> Result<PathBuf> {
        let start = match &self.args.repo {
            Some(path) => path.clone(),
            None => std::env::current_dir().context("cannot read current directory")?,
        };
        let repo = git2::Repository::discover(&start)
            .with_context(|| format!("{} is not inside a git repository", start.display()))?;
        repo.workdir()
            .map(|p| p.to_path_buf())
            .with_context(|| format!("{} is a bare repository", start.display()))
    }
}

impl Command for RunCommand {
    async fn execute(&self) -> Result<i32> {
        let repo_root = self.repo_root()?;
        let config = self.batch_config();

        let git = GitClient::new(Arc::new(ProcessCommandExecutor), repo_root)
            .with_program(self.settings.git_program.clone())
            .with_identity(self.settings.merge_identity());
        let orchestrator = BatchMergeOrchestrator::new(Arc::new(git), self.worktree_root());

        let shutdown = ShutdownCoordinator::default();
        let signals = shutdown.install_signal_handlers();

        let quiet = self.args.quiet;
        let sink = FnProgress(move |progress: &BatchMergeProgress| {
            if !quiet {
                eprintln!("{}", report::progress_line(progress));
            }
        });

        let outcome = orchestrator.run(config, &sink, &shutdown.token()).await;
        signals.abort();
        let result = outcome.context("invalid batch merge configuration")?;

        if self.args.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print!("{}", report::render_human(&result));
        }

        Ok(result.exit_code())
    }
}
