use anyhow::Result;

use super::Command;
use crate::config::BatchMergeSettings;

pub struct ConfigCommand {
    pub settings: BatchMergeSettings,
}

impl ConfigCommand {
    pub fn new(settings: BatchMergeSettings) -> Self {
        Self { settings }
    }
}

impl Command for ConfigCommand {
    async fn execute(&self) -> Result<i32> {
        print!("{}", self.settings.to_toml()?);
        Ok(0)
    }
}
