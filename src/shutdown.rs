use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Cooperative cancellation flag shared between the signal handler and a run.
///
/// Cancelling never interrupts a git operation in flight; the orchestrator
/// polls the flag between phases.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Turns Ctrl-C into a cancellation request for the running batch
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

impl ShutdownCoordinator {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn request_shutdown(&self, reason: &str) {
        if self.token.is_cancelled() {
            return;
        }
        info!(reason, "Cancellation requested; finishing the current branch");
        self.token.cancel();
    }

    /// Install the Ctrl-C handler.
    ///
    /// The first signal cancels cooperatively. A second one exits at once,
    /// which may leave a worktree behind for `git worktree prune`.
    pub fn install_signal_handlers(&self) -> tokio::task::JoinHandle<()> {
        let token = self.token.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
            ShutdownCoordinator::new(token).request_shutdown("interrupt signal");

            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Second interrupt received; exiting without cleanup");
                std::process::exit(130);
            }
        })
    }
}
