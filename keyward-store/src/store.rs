//! The entitlement store.

use crate::error::{StoreError, StoreResult};
use crate::model::{AnomalyRecord, ArtifactRecord, Session, User};
use crate::rows::{self, conversion_error};
use crate::schema;
use crate::tx::StoreTx;
use keyward_types::{Platform, SessionId, UnixMillis, UserId, Version};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Persistent entitlement state backed by SQLite.
///
/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct EntitlementStore {
    conn: Arc<Mutex<Connection>>,
}

impl EntitlementStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        // journal_mode returns a row, so it cannot go through execute_batch.
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "opened entitlement store");
        Self::from_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Runs `f` inside one write transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err`.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&StoreTx<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let value = f(&StoreTx { conn: &tx })?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }

    // ── Users ────────────────────────────────────────────────────

    pub fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        let conn = self.lock()?;
        rows::user_where(&conn, "id", &id.to_string())
    }

    /// Case-insensitive lookup by email.
    pub fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let conn = self.lock()?;
        rows::user_where(&conn, "email", email)
    }

    pub fn user_by_customer(&self, customer_id: &str) -> StoreResult<Option<User>> {
        let conn = self.lock()?;
        rows::user_where(&conn, "customer_id", customer_id)
    }

    pub fn user_count(&self) -> StoreResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Pins a user to a release (or unpins with `None`).
    pub fn set_locked_version(&self, id: UserId, version: Option<Version>) -> StoreResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE users SET locked_version = ?2, updated_at = ?3 WHERE id = ?1",
            params![
                id.to_string(),
                version.map(|v| v.get()),
                UnixMillis::now().as_millis()
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    // ── Sessions ─────────────────────────────────────────────────

    /// Inserts a new session with one heartbeat at `now`.
    pub fn create_session(&self, user_id: UserId, now: UnixMillis) -> StoreResult<Session> {
        let session = Session {
            id: SessionId::new(),
            user_id,
            started_at: now,
            last_heartbeat_at: now,
            heartbeats: 1,
        };
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sessions (id, user_id, started_at, last_heartbeat_at, heartbeats) \
             VALUES (?1, ?2, ?3, ?3, 1)",
            params![session.id.to_string(), user_id.to_string(), now.as_millis()],
        )?;
        Ok(session)
    }

    pub fn session(&self, id: SessionId) -> StoreResult<Option<Session>> {
        let conn = self.lock()?;
        let session = conn
            .query_row(
                "SELECT id, user_id, started_at, last_heartbeat_at, heartbeats \
                 FROM sessions WHERE id = ?1",
                params![id.to_string()],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    /// Bumps the heartbeat counter and moves `last_heartbeat_at` forward.
    ///
    /// `last_heartbeat_at` never moves backwards, even if `now` is older
    /// than the stored value.
    pub fn record_heartbeat(&self, id: SessionId, now: UnixMillis) -> StoreResult<Session> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE sessions SET last_heartbeat_at = MAX(last_heartbeat_at, ?2), \
             heartbeats = heartbeats + 1 WHERE id = ?1",
            params![id.to_string(), now.as_millis()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("session {id}")));
        }
        let session = conn.query_row(
            "SELECT id, user_id, started_at, last_heartbeat_at, heartbeats \
             FROM sessions WHERE id = ?1",
            params![id.to_string()],
            session_from_row,
        )?;
        Ok(session)
    }

    // ── Release artifacts ────────────────────────────────────────

    /// Records the hashes of a release. A second record for the same
    /// `(version, os)` is a [`StoreError::Conflict`].
    pub fn put_artifact(&self, record: &ArtifactRecord) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO artifacts (version, os, app_hash, update_hash) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.version.get(),
                record.os.as_slug(),
                record.app_hash,
                record.update_hash
            ],
        )?;
        Ok(())
    }

    pub fn artifact(&self, version: Version, os: Platform) -> StoreResult<Option<ArtifactRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT version, os, app_hash, update_hash FROM artifacts \
                 WHERE version = ?1 AND os = ?2",
                params![version.get(), os.as_slug()],
                artifact_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Newest artifact for `os`, optionally no newer than `ceiling`.
    pub fn latest_artifact(
        &self,
        os: Platform,
        ceiling: Option<Version>,
    ) -> StoreResult<Option<ArtifactRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT version, os, app_hash, update_hash FROM artifacts \
                 WHERE os = ?1 AND (?2 IS NULL OR version <= ?2) \
                 ORDER BY version DESC LIMIT 1",
                params![os.as_slug(), ceiling.map(|v| v.get())],
                artifact_from_row,
            )
            .optional()?;
        Ok(record)
    }

    // ── Anomalies ────────────────────────────────────────────────

    /// All recorded anomalies, oldest first.
    pub fn anomalies(&self) -> StoreResult<Vec<AnomalyRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, kind, customer_id, subscription_id, detail, recorded_at \
             FROM anomalies ORDER BY id ASC",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(AnomalyRecord {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    customer_id: row.get(2)?,
                    subscription_id: row.get(3)?,
                    detail: row.get(4)?,
                    recorded_at: UnixMillis::from_millis(row.get(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let heartbeats: i64 = row.get(4)?;
    Ok(Session {
        id: SessionId::parse(&id).map_err(|e| conversion_error(0, e))?,
        user_id: UserId::parse(&user_id).map_err(|e| conversion_error(1, e))?,
        started_at: UnixMillis::from_millis(row.get(2)?),
        last_heartbeat_at: UnixMillis::from_millis(row.get(3)?),
        heartbeats: heartbeats.max(0) as u64,
    })
}

fn artifact_from_row(row: &Row<'_>) -> rusqlite::Result<ArtifactRecord> {
    let os: String = row.get(1)?;
    Ok(ArtifactRecord {
        version: Version::new(row.get(0)?),
        os: os.parse().map_err(|e| conversion_error(1, e))?,
        app_hash: row.get(2)?,
        update_hash: row.get(3)?,
    })
}
