//! External tool abstractions
//!
//! The production [`GitClient`] runs git through a [`CommandExecutor`] so tests
//! can substitute scripted command output for a real repository.

pub mod command;
pub mod git;

pub use command::{CommandError, CommandExecutor, CommandOutput, ProcessCommandExecutor};
pub use git::GitClient;
