use std::str::FromStr;

use anyhow::Context;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use guardian_auth::SessionRecord;

use super::{SessionStore, Slot, decode_slot};

const DEFAULT_SLOT: &str = "current";

/// SQLite-backed session slot.
///
/// The record lives in one keyed row of `guardian_session`, next to an
/// explicit `expires_at` column so the slot can be inspected without parsing
/// the payload.
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
    slot: String,
}

impl SqliteSessionStore {
    /// Open (creating if missing) the database at `url`, e.g.
    /// `sqlite://guardian.db` or `sqlite::memory:`.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid session store URL '{url}'"))?
            .create_if_missing(true);

        // One connection: the slot is single-writer, and an in-memory
        // database only exists for the lifetime of its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open session store at '{url}'"))?;

        Self::with_pool(pool).await
    }

    /// Use an existing pool, creating the `guardian_session` table if needed.
    pub async fn with_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guardian_session (
                slot       TEXT PRIMARY KEY NOT NULL,
                record     TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                saved_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create guardian_session table")?;

        Ok(Self {
            pool,
            slot: DEFAULT_SLOT.to_string(),
        })
    }

    async fn read_raw(&self) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query("SELECT record FROM guardian_session WHERE slot = ?1")
            .bind(&self.slot)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.try_get::<String, _>("record")).transpose()
    }

    async fn delete_slot(&self) {
        if let Err(err) = sqlx::query("DELETE FROM guardian_session WHERE slot = ?1")
            .bind(&self.slot)
            .execute(&self.pool)
            .await
        {
            tracing::warn!("failed to clear persisted guardian session: {err}");
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self) -> Option<SessionRecord> {
        let raw = match self.read_raw().await {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!("failed to read persisted guardian session: {err}");
                return None;
            }
        };

        match decode_slot(&raw, Utc::now()) {
            Slot::Live(record) => Some(*record),
            Slot::Stale => {
                tracing::info!("persisted guardian session expired; clearing slot");
                self.delete_slot().await;
                None
            }
            Slot::Corrupt(err) => {
                tracing::warn!("persisted guardian session unreadable ({err}); clearing slot");
                self.delete_slot().await;
                None
            }
        }
    }

    async fn save(&self, session: &SessionRecord) {
        let record = match serde_json::to_string(session) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!("failed to serialize guardian session: {err}");
                return;
            }
        };

        let result = sqlx::query(
            r#"
            INSERT INTO guardian_session (slot, record, expires_at, saved_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (slot) DO UPDATE SET
                record = excluded.record,
                expires_at = excluded.expires_at,
                saved_at = excluded.saved_at
            "#,
        )
        .bind(&self.slot)
        .bind(record)
        .bind(session.expires_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await;

        if let Err(err) = result {
            tracing::warn!("failed to persist guardian session: {err}");
        }
    }

    async fn clear(&self) {
        self.delete_slot().await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use guardian_auth::{AccessLevel, GuardianProfile, SessionKind, SessionLifetimes};
    use guardian_core::SubjectId;

    use super::*;

    fn session(expires_in: Duration) -> SessionRecord {
        let mut record = SessionRecord::issue(
            SessionKind::Credentials,
            "Guardian-X",
            Some(SubjectId::parse("g-1").unwrap()),
            GuardianProfile::new(AccessLevel::Overseer),
            &SessionLifetimes::default(),
            Utc::now(),
        );
        record.expires_at = Utc::now() + expires_in;
        record
    }

    async fn row_count(store: &SqliteSessionStore) -> i64 {
        sqlx::query("SELECT COUNT(*) AS n FROM guardian_session")
            .fetch_one(&store.pool)
            .await
            .unwrap()
            .get::<i64, _>("n")
    }

    #[tokio::test]
    async fn save_replaces_single_row() {
        let store = SqliteSessionStore::connect("sqlite::memory:").await.unwrap();
        let first = session(Duration::hours(1));
        let second = session(Duration::hours(2));

        store.save(&first).await;
        store.save(&second).await;

        assert_eq!(row_count(&store).await, 1);
        assert_eq!(store.load().await, Some(second));
    }

    #[tokio::test]
    async fn expired_row_is_cleared_on_load() {
        let store = SqliteSessionStore::connect("sqlite::memory:").await.unwrap();
        store.save(&session(Duration::minutes(-1))).await;

        assert_eq!(store.load().await, None);
        assert_eq!(row_count(&store).await, 0);
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn corrupt_row_is_cleared_on_load() {
        let store = SqliteSessionStore::connect("sqlite::memory:").await.unwrap();
        sqlx::query(
            "INSERT INTO guardian_session (slot, record, expires_at, saved_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(DEFAULT_SLOT)
        .bind("{\"authenticated\": tru")
        .bind("2999-01-01T00:00:00Z")
        .bind("2999-01-01T00:00:00Z")
        .execute(&store.pool)
        .await
        .unwrap();

        assert_eq!(store.load().await, None);
        assert_eq!(row_count(&store).await, 0);
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let store = SqliteSessionStore::connect("sqlite::memory:").await.unwrap();
        store.save(&session(Duration::hours(1))).await;
        store.clear().await;
        store.clear().await;
        assert_eq!(store.load().await, None);
    }
}
