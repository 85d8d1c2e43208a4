use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;

use guardian_auth::SessionRecord;

use super::{SessionStore, Slot, decode_slot};

/// In-memory session slot.
///
/// Holds the serialized record (not the value) so it behaves like a real
/// persisted slot, including corrupt payloads. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    slot: RwLock<Option<String>>,
    failing: AtomicBool,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot with an arbitrary payload.
    pub fn put_raw(&self, raw: impl Into<String>) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = Some(raw.into());
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.slot.read().ok().and_then(|slot| slot.clone())
    }

    /// When true, writes are dropped as if the backing storage were full or
    /// read-only.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn write_slot(&self, value: Option<String>) {
        if self.failing.load(Ordering::SeqCst) {
            tracing::warn!("session slot write failed: storage unavailable");
            return;
        }
        match self.slot.write() {
            Ok(mut slot) => *slot = value,
            Err(_) => tracing::warn!("session slot write failed: lock poisoned"),
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self) -> Option<SessionRecord> {
        let raw = self.raw()?;
        match decode_slot(&raw, Utc::now()) {
            Slot::Live(record) => Some(*record),
            Slot::Stale => {
                tracing::info!("persisted guardian session expired; clearing slot");
                self.write_slot(None);
                None
            }
            Slot::Corrupt(err) => {
                tracing::warn!("persisted guardian session unreadable ({err}); clearing slot");
                self.write_slot(None);
                None
            }
        }
    }

    async fn save(&self, session: &SessionRecord) {
        match serde_json::to_string(session) {
            Ok(raw) => self.write_slot(Some(raw)),
            Err(err) => tracing::warn!("failed to serialize guardian session: {err}"),
        }
    }

    async fn clear(&self) {
        self.write_slot(None);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use guardian_auth::{AccessLevel, GuardianProfile, SessionKind, SessionLifetimes};

    use super::*;

    fn session(expires_in: Duration) -> SessionRecord {
        let mut record = SessionRecord::issue(
            SessionKind::SacredKey,
            "Guardian-X",
            None,
            GuardianProfile::new(AccessLevel::Analyst),
            &SessionLifetimes::default(),
            Utc::now(),
        );
        record.expires_at = Utc::now() + expires_in;
        record
    }

    #[tokio::test]
    async fn save_then_load() {
        let store = InMemorySessionStore::new();
        let record = session(Duration::hours(1));
        store.save(&record).await;
        store.save(&record).await;
        assert_eq!(store.load().await, Some(record));
    }

    #[tokio::test]
    async fn expired_record_loads_as_none_and_clears() {
        let store = InMemorySessionStore::new();
        store.save(&session(Duration::seconds(-5))).await;
        assert!(store.raw().is_some());

        assert_eq!(store.load().await, None);
        assert!(store.raw().is_none());
        // Idempotent.
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn corrupt_payload_is_treated_as_absent() {
        let store = InMemorySessionStore::new();
        store.put_raw("{not json");
        assert_eq!(store.load().await, None);
        assert!(store.raw().is_none());
    }

    #[tokio::test]
    async fn failing_storage_is_absorbed() {
        let store = InMemorySessionStore::new();
        store.set_failing(true);
        store.save(&session(Duration::hours(1))).await;
        assert_eq!(store.load().await, None);
        store.clear().await;
    }
}
