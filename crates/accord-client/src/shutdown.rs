//! Two-phase shutdown coordination via `CancellationToken`.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Coordinates shutdown across the connection, pump, and queue tasks.
///
/// Phase one cancels the shared token so every task can finish its
/// current work and close transports gracefully, bounded by a timeout.
/// Phase two aborts whatever is still running.
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Coordinator whose token has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// A clone of the cancellation token.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Initiate shutdown. Idempotent.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether a shutdown has been initiated.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run both phases over the given task handles.
    pub async fn graceful_shutdown(&self, mut handles: Vec<JoinHandle<()>>, timeout: Duration) {
        self.shutdown();
        info!(task_count = handles.len(), ?timeout, "waiting for tasks to complete");

        let drain = futures::future::join_all(handles.iter_mut());
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!("graceful shutdown timed out; aborting remaining tasks");
            for handle in &handles {
                handle.abort();
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_not_shutting_down() {
        let coord = ShutdownCoordinator::new();
        assert!(!coord.is_shutting_down());
    }

    #[test]
    fn all_tokens_observe_cancellation() {
        let coord = ShutdownCoordinator::new();
        let t1 = coord.token();
        let t2 = coord.token();
        coord.shutdown();
        coord.shutdown();
        assert!(t1.is_cancelled());
        assert!(t2.is_cancelled());
    }

    #[tokio::test]
    async fn graceful_shutdown_awaits_cooperative_tasks() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        let handle = tokio::spawn(async move {
            token.cancelled().await;
        });

        coord
            .graceful_shutdown(vec![handle], Duration::from_secs(5))
            .await;
        assert!(coord.is_shutting_down());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_aborts_stragglers() {
        let coord = ShutdownCoordinator::new();
        // Ignores cancellation entirely.
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });

        coord
            .graceful_shutdown(vec![handle], Duration::from_millis(50))
            .await;
        assert!(coord.is_shutting_down());
    }
}
