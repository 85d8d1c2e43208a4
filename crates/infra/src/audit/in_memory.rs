use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{AuditEntry, AuditLog};
use crate::directory::CollaboratorError;

/// In-memory append-only audit log.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
    failing: AtomicBool,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// When true, every append is rejected as if the log were unreachable.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .read()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Entries whose `action_type` equals `action`.
    pub fn entries_for(&self, action: &str) -> Vec<AuditEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.action_type == action)
            .collect()
    }
}

#[async_trait::async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, entry: AuditEntry) -> Result<(), CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::unavailable("audit log offline"));
        }
        self.entries
            .write()
            .map_err(|_| CollaboratorError::unavailable("lock poisoned"))?
            .push(entry);
        Ok(())
    }
}
