//! Transactional access to user rows.

use crate::error::StoreResult;
use crate::model::{NewUser, User};
use crate::rows;
use keyward_types::UnixMillis;
use rusqlite::{params, Connection, OptionalExtension};

/// A handle to an open transaction, handed to the closure passed to
/// [`crate::EntitlementStore::transaction`].
pub struct StoreTx<'a> {
    pub(crate) conn: &'a Connection,
}

impl StoreTx<'_> {
    pub fn user_by_subscription(&self, subscription_id: &str) -> StoreResult<Option<User>> {
        rows::user_where(self.conn, "subscription_id", subscription_id)
    }

    pub fn user_by_customer(&self, customer_id: &str) -> StoreResult<Option<User>> {
        rows::user_where(self.conn, "customer_id", customer_id)
    }

    pub fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        rows::user_where(self.conn, "email", email)
    }

    /// Inserts a new user with a fresh id.
    pub fn insert_user(&self, new: NewUser, now: UnixMillis) -> StoreResult<User> {
        rows::insert_user(self.conn, new, now)
    }

    /// Persists the mutable fields of an existing user.
    pub fn update_user(&self, user: &User, now: UnixMillis) -> StoreResult<User> {
        rows::update_user(self.conn, user, now)
    }

    /// Appends to the anomaly log. Returns the new row id.
    pub fn record_anomaly(
        &self,
        kind: &str,
        customer_id: &str,
        subscription_id: Option<&str>,
        detail: &str,
        now: UnixMillis,
    ) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO anomalies (kind, customer_id, subscription_id, detail, recorded_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![kind, customer_id, subscription_id, detail, now.as_millis()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Time of the newest event seen for `subscription_id`, whether or not
    /// it changed a user.
    pub fn subscription_high_water(&self, subscription_id: &str) -> StoreResult<Option<UnixMillis>> {
        let at = self
            .conn
            .query_row(
                "SELECT last_event_at FROM subscription_events WHERE subscription_id = ?1",
                params![subscription_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(at.map(UnixMillis::from_millis))
    }

    /// Records that an event for `subscription_id` at `at` was seen. The
    /// stored mark never moves backwards.
    pub fn advance_subscription(
        &self,
        subscription_id: &str,
        at: UnixMillis,
        status: &str,
    ) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO subscription_events (subscription_id, last_event_at, status) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT(subscription_id) DO UPDATE SET \
                 status = CASE WHEN excluded.last_event_at >= last_event_at \
                     THEN excluded.status ELSE status END, \
                 last_event_at = MAX(last_event_at, excluded.last_event_at)",
            params![subscription_id, at.as_millis(), status],
        )?;
        Ok(())
    }
}
