use anyhow::Result;

pub mod config;
pub mod run;

#[allow(async_fn_in_trait)]
pub trait Command {
    /// Run the command and return the process exit code
    async fn execute(&self) -> Result<i32>;
}
