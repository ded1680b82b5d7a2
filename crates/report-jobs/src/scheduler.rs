//! Cancellable recurring task
//!
//! A [`ScheduledTask`] runs a tick closure on the tokio runtime, waiting
//! `interval` before each tick. The wait only starts once the previous tick
//! resolved, so ticks never overlap. Cancelling the token drops an in-flight
//! tick at its next await point.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a spawned recurring task
pub struct ScheduledTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Spawn `tick` every `interval` until it breaks or `token` is cancelled
    pub fn spawn<F, Fut>(interval: Duration, token: CancellationToken, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = task_token.cancelled() => break,
                    () = tokio::time::sleep(interval) => {}
                }

                let flow = tokio::select! {
                    biased;
                    () = task_token.cancelled() => break,
                    flow = tick() => flow,
                };

                if flow.is_break() {
                    break;
                }
            }
        });

        Self { token, handle }
    }

    /// Stop scheduling; idempotent
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the task has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to exit
    pub async fn join(self) {
        // A panicking tick is the only join error; there is nothing to recover.
        let _ = self.handle.await;
    }
}
