//! Row decoding and the queries shared by the store and its transactions.

use crate::error::StoreResult;
use crate::model::{NewUser, User};
use keyward_license::LicenseKey;
use keyward_types::{UnixMillis, UserId, Version};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(crate) const USER_COLUMNS: &str = "id, email, name, customer_id, subscription_id, \
     license_key, active, locked_version, last_event_at, created_at, updated_at";

pub(crate) fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let license_key: String = row.get(5)?;
    Ok(User {
        id: UserId::parse(&id).map_err(|e| conversion_error(0, e))?,
        email: row.get(1)?,
        name: row.get(2)?,
        customer_id: row.get(3)?,
        subscription_id: row.get(4)?,
        license_key: LicenseKey::parse(&license_key).map_err(|e| conversion_error(5, e))?,
        active: row.get(6)?,
        locked_version: row.get::<_, Option<u32>>(7)?.map(Version::new),
        last_event_at: row.get::<_, Option<i64>>(8)?.map(UnixMillis::from_millis),
        created_at: UnixMillis::from_millis(row.get(9)?),
        updated_at: UnixMillis::from_millis(row.get(10)?),
    })
}

/// Looks a user up by one of the indexed columns.
pub(crate) fn user_where(conn: &Connection, column: &str, value: &str) -> StoreResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let user = conn
        .query_row(&sql, params![value], user_from_row)
        .optional()?;
    Ok(user)
}

pub(crate) fn insert_user(conn: &Connection, new: NewUser, now: UnixMillis) -> StoreResult<User> {
    let user = User {
        id: UserId::new(),
        email: new.email,
        name: new.name,
        customer_id: new.customer_id,
        subscription_id: new.subscription_id,
        license_key: new.license_key,
        active: new.active,
        locked_version: None,
        last_event_at: new.last_event_at,
        created_at: now,
        updated_at: now,
    };
    conn.execute(
        "INSERT INTO users (id, email, name, customer_id, subscription_id, license_key, \
         active, locked_version, last_event_at, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8, ?9, ?9)",
        params![
            user.id.to_string(),
            user.email,
            user.name,
            user.customer_id,
            user.subscription_id,
            user.license_key.as_str(),
            user.active,
            user.last_event_at.map(|t| t.as_millis()),
            now.as_millis(),
        ],
    )?;
    Ok(user)
}

/// Writes the mutable profile and subscription fields of `user`.
///
/// The license key, customer id and version lock are never touched here.
pub(crate) fn update_user(conn: &Connection, user: &User, now: UnixMillis) -> StoreResult<User> {
    let changed = conn.execute(
        "UPDATE users SET email = ?2, name = ?3, subscription_id = ?4, active = ?5, \
         last_event_at = ?6, updated_at = ?7 WHERE id = ?1",
        params![
            user.id.to_string(),
            user.email,
            user.name,
            user.subscription_id,
            user.active,
            user.last_event_at.map(|t| t.as_millis()),
            now.as_millis(),
        ],
    )?;
    if changed == 0 {
        return Err(crate::StoreError::NotFound(format!("user {}", user.id)));
    }
    let mut updated = user.clone();
    updated.updated_at = now;
    Ok(updated)
}
