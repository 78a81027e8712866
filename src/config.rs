use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::batch_merge::DEFAULT_REMOTE;
use crate::git::merge::MergeIdentity;

pub const CONFIG_FILE: &str = "batch-merge.toml";

/// Tool settings. Command-line flags override every field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchMergeSettings {
    /// Remote used when `--remote` is not given
    pub remote: String,
    /// Parent directory for provisioned worktrees
    pub worktree_root: PathBuf,
    /// Default tracing directive; `RUST_LOG` takes precedence
    pub log_level: String,
    pub json_logs: bool,
    /// Git executable used for fetch, worktree and push
    pub git_program: String,
    /// Merge commit signature when the repository has no `user.*` config
    pub merge_author_name: String,
    pub merge_author_email: String,
}

impl Default for BatchMergeSettings {
    fn default() -> Self {
        let identity = MergeIdentity::default();
        Self {
            remote: DEFAULT_REMOTE.to_string(),
            worktree_root: std::env::temp_dir().join("batch-merge").join("worktrees"),
            log_level: "info".to_string(),
            json_logs: false,
            git_program: "git".to_string(),
            merge_author_name: identity.name,
            merge_author_email: identity.email,
        }
    }
}

impl BatchMergeSettings {
    /// Load settings with precedence:
    /// 1. Default values
    /// 2. `batch-merge.toml` in the current directory
    /// 3. Environment variables (`BATCH_MERGE_REMOTE`, `BATCH_MERGE_JSON_LOGS`, ...)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Same as [`Self::load`] with an explicit settings file, which may be absent
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("BATCH_MERGE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| format!("failed to read settings from {}", path.display()))?;

        settings
            .try_deserialize()
            .context("invalid batch-merge settings")
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::debug!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    pub fn merge_identity(&self) -> MergeIdentity {
        MergeIdentity {
            name: self.merge_author_name.clone(),
            email: self.merge_author_email.clone(),
        }
    }

    /// Effective settings rendered as a settings file
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
