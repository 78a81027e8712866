use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;
pub mod report;

#[derive(Parser)]
#[command(name = "batch-merge")]
#[command(about = "Merge one source branch into many target branches")]
#[command(long_about = "batch-merge fetches the source branch and merges it into each target branch \
                       in turn, inside a disposable git worktree. Conflicts are reported, never \
                       resolved, and one failing branch never stops the rest of the batch.")]
pub struct Cli {
    /// Emit logs as JSON on stderr
    #[arg(long, global = true, help = "Emit structured JSON logs on stderr")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge the source branch into every target branch
    Run(RunArgs),
    /// Print the effective settings as TOML
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Branch to merge from
    #[arg(long, short = 's', help = "Branch whose commits are merged into each target")]
    pub source: String,

    /// Branches to merge into, processed in the order given
    #[arg(long = "target", short = 't', required = true, num_args = 1.., help = "Target branch (repeatable)")]
    pub targets: Vec<String>,

    /// Merge in detached worktrees only; never move branches or push
    #[arg(long, help = "Surface conflicts without changing any branch")]
    pub dry_run: bool,

    /// Push each cleanly merged branch
    #[arg(long, help = "Push successfully merged branches to the remote")]
    pub push: bool,

    #[arg(long, help = "Remote to fetch from and push to (default from settings)")]
    pub remote: Option<String>,

    #[arg(long, help = "Repository to operate on (default: current directory)")]
    pub repo: Option<PathBuf>,

    #[arg(long, help = "Directory under which worktrees are created")]
    pub worktree_root: Option<PathBuf>,

    /// Print the result as JSON on stdout
    #[arg(long, help = "Print the final result as JSON")]
    pub json: bool,

    #[arg(long, short = 'q', help = "Do not print progress lines")]
    pub quiet: bool,
}
