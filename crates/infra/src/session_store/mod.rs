//! Durable single-slot storage for the current guardian session.
//!
//! The store never hands out an expired or corrupt record: either condition
//! clears the slot and reads as "no session". Storage failures are logged and
//! absorbed, so the in-memory session stays authoritative for the process.

pub mod in_memory;
pub mod sqlite;

use chrono::{DateTime, Utc};

use guardian_auth::{SessionRecord, validate_session};

pub use in_memory::InMemorySessionStore;
pub use sqlite::SqliteSessionStore;

/// Single-slot session persistence.
///
/// Writes replace the whole record atomically; there are no partial-field
/// updates.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// The persisted session, if one exists and is still valid.
    async fn load(&self) -> Option<SessionRecord>;

    /// Replace the slot with `session`. Idempotent.
    async fn save(&self, session: &SessionRecord);

    /// Empty the slot. Idempotent.
    async fn clear(&self);
}

/// What a raw slot value turned out to hold.
#[derive(Debug)]
pub(crate) enum Slot {
    Live(Box<SessionRecord>),
    /// Expired or not authenticated.
    Stale,
    Corrupt(serde_json::Error),
}

pub(crate) fn decode_slot(raw: &str, now: DateTime<Utc>) -> Slot {
    match serde_json::from_str::<SessionRecord>(raw) {
        Ok(record) => match validate_session(&record, now) {
            Ok(()) => Slot::Live(Box::new(record)),
            Err(_) => Slot::Stale,
        },
        Err(err) => Slot::Corrupt(err),
    }
}
