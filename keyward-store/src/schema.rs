//! Schema creation.

use crate::error::StoreResult;
use rusqlite::Connection;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL COLLATE NOCASE,
        name TEXT NOT NULL DEFAULT '',
        customer_id TEXT NOT NULL UNIQUE,
        subscription_id TEXT,
        license_key TEXT NOT NULL UNIQUE,
        active INTEGER NOT NULL DEFAULT 0,
        locked_version INTEGER,
        last_event_at INTEGER,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email
        ON users(email) WHERE email <> '';

    CREATE INDEX IF NOT EXISTS idx_users_subscription
        ON users(subscription_id);

    CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id),
        started_at INTEGER NOT NULL,
        last_heartbeat_at INTEGER NOT NULL,
        heartbeats INTEGER NOT NULL DEFAULT 1,
        CHECK (last_heartbeat_at >= started_at)
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_user
        ON sessions(user_id);

    CREATE TABLE IF NOT EXISTS artifacts (
        version INTEGER NOT NULL,
        os TEXT NOT NULL,
        app_hash TEXT NOT NULL,
        update_hash TEXT NOT NULL,
        UNIQUE(version, os)
    );

    CREATE TABLE IF NOT EXISTS anomalies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        customer_id TEXT NOT NULL,
        subscription_id TEXT,
        detail TEXT NOT NULL,
        recorded_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS subscription_events (
        subscription_id TEXT PRIMARY KEY,
        last_event_at INTEGER NOT NULL,
        status TEXT NOT NULL
    );
";

pub(crate) fn init(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
