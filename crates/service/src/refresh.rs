//! Background worker for periodic session refresh.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::manager::SessionManager;

/// Periodically refreshes the manager's current session.
///
/// A tick that lands while another lifecycle operation is running is skipped
/// rather than queued behind it.
pub struct RefreshWorker {
    manager: Arc<SessionManager>,
    interval: Duration,
    shutdown: Arc<Notify>,
}

/// Handle to a running [`RefreshWorker`]. Dropping it aborts the worker.
#[derive(Debug)]
pub struct RefreshWorkerHandle {
    shutdown: Arc<Notify>,
    join: JoinHandle<()>,
}

impl RefreshWorkerHandle {
    /// Signal the worker to stop and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.shutdown.notify_one();
        if let Err(err) = (&mut self.join).await {
            tracing::warn!("refresh worker exited abnormally: {err}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl Drop for RefreshWorkerHandle {
    fn drop(&mut self) {
        self.join.abort();
    }
}

impl RefreshWorker {
    /// `interval` must be non-zero.
    pub fn new(manager: Arc<SessionManager>, interval: Duration) -> Self {
        Self {
            manager,
            interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Spawn the worker onto the current tokio runtime. The first refresh
    /// happens one full interval after start.
    pub fn start(self) -> RefreshWorkerHandle {
        let shutdown = self.shutdown.clone();
        let manager = self.manager;
        let period = self.interval;

        let join = tokio::spawn(async move {
            tracing::info!(interval_secs = period.as_secs(), "guardian refresh worker started");

            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.notified() => {
                        tracing::info!("guardian refresh worker received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => tick(&manager).await,
                }
            }
        });

        RefreshWorkerHandle {
            shutdown: self.shutdown,
            join,
        }
    }
}

async fn tick(manager: &SessionManager) {
    if !manager.holds_session() {
        return;
    }
    match manager.try_refresh().await {
        None => tracing::debug!("lifecycle operation in flight; skipping refresh tick"),
        Some(Ok(())) => tracing::debug!("guardian session refresh tick complete"),
        Some(Err(err)) => tracing::warn!("background refresh signed the guardian out: {err}"),
    }
}
