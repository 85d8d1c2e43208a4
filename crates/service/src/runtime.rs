//! Process wiring: tracing, session store, manager, refresh worker.

use std::sync::Arc;

use anyhow::Context;

use guardian_infra::{Collaborators, InMemorySessionStore, SessionStore, SqliteSessionStore};

use crate::config::GuardianConfig;
use crate::manager::SessionManager;
use crate::refresh::RefreshWorkerHandle;

/// A running session service. Dropping it aborts the refresh worker.
#[derive(Debug)]
pub struct GuardianRuntime {
    manager: Arc<SessionManager>,
    refresh: RefreshWorkerHandle,
}

impl GuardianRuntime {
    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Stop the refresh worker. The current session is left in place.
    pub async fn shutdown(self) {
        self.refresh.shutdown().await;
    }
}

/// Initialize tracing, open the session store, restore any persisted session
/// and start the refresh worker.
pub async fn bootstrap(
    config: GuardianConfig,
    collaborators: Collaborators,
) -> anyhow::Result<GuardianRuntime> {
    guardian_observability::init();

    let store: Arc<dyn SessionStore> = match &config.session_db_url {
        Some(url) => Arc::new(
            SqliteSessionStore::connect(url)
                .await
                .context("failed to open guardian session store")?,
        ),
        None => {
            tracing::warn!("no session database configured; sessions will not survive a restart");
            Arc::new(InMemorySessionStore::new())
        }
    };

    let manager = Arc::new(SessionManager::new(&collaborators, store, config.lifetimes));
    if manager.restore().await.is_none() {
        tracing::info!("no persisted guardian session to restore");
    }

    let refresh = manager.spawn_refresh_worker(config.refresh_interval);
    tracing::info!(
        standard_ttl_mins = config.lifetimes.standard().num_minutes(),
        emergency_ttl_mins = config.lifetimes.emergency().num_minutes(),
        "guardian session service started"
    );

    Ok(GuardianRuntime { manager, refresh })
}
