//! Debounced background saving.
//!
//! The autosaver sleeps until the session reports an edit, then waits for a
//! quiet period with no further edits before saving. Each new edit restarts
//! the quiet period. A failed save is retried after `retry_after` (or on the
//! next edit when retries are off). Cancelling the session token stops the
//! loop and aborts a save in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::persistence::PersistenceError;
use crate::session::SessionShared;

/// Handle to a running autosave task.
pub struct Autosaver {
    handle: JoinHandle<()>,
}

impl Autosaver {
    pub(crate) fn spawn(runtime: &Handle, shared: Arc<SessionShared>) -> Self {
        let handle = runtime.spawn(run(shared));
        Self { handle }
    }

    /// Wait for the task to stop. The caller cancels the token first.
    pub(crate) async fn join(self) {
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "autosave task ended abnormally");
        }
    }
}

async fn run(shared: Arc<SessionShared>) {
    let quiet = shared.config.autosave.quiet_period();
    let retry_after = shared.config.autosave.retry_after();
    let mut retry_in: Option<Duration> = None;

    tracing::debug!(quiet_ms = quiet.as_millis() as u64, "autosave started");

    loop {
        let edited = match retry_in.take() {
            Some(delay) => tokio::select! {
                _ = shared.cancel.cancelled() => break,
                _ = shared.edited.notified() => true,
                _ = tokio::time::sleep(delay) => false,
            },
            None => tokio::select! {
                _ = shared.cancel.cancelled() => break,
                _ = shared.edited.notified() => true,
            },
        };

        if edited && !quiet_period(&shared, quiet).await {
            break;
        }

        match shared.save_pending().await {
            Ok(_) => {}
            Err(PersistenceError::Cancelled) => break,
            Err(e) => {
                retry_in = retry_after;
                tracing::warn!(
                    error = %e,
                    retry_ms = retry_after.map(|d| d.as_millis() as u64),
                    "autosave failed"
                );
            }
        }
    }

    tracing::debug!("autosave stopped");
}

/// Wait until no edit has arrived for `quiet`. `false` when cancelled.
async fn quiet_period(shared: &SessionShared, quiet: Duration) -> bool {
    loop {
        tokio::select! {
            _ = shared.cancel.cancelled() => return false,
            _ = shared.edited.notified() => continue,
            _ = tokio::time::sleep(quiet) => return true,
        }
    }
}
