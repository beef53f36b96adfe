//! Row types.

use keyward_license::LicenseKey;
use keyward_types::{Platform, SessionId, UnixMillis, UserId, Version};
use serde::{Deserialize, Serialize};

/// An entitlement record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    /// Payment provider customer id. Unique.
    pub customer_id: String,
    /// At most one subscription is bound to a user at a time.
    pub subscription_id: Option<String>,
    /// Immutable once issued.
    pub license_key: LicenseKey,
    pub active: bool,
    /// Newest release this user may run, if pinned.
    pub locked_version: Option<Version>,
    /// Provider timestamp of the newest subscription event applied.
    pub last_event_at: Option<UnixMillis>,
    pub created_at: UnixMillis,
    pub updated_at: UnixMillis,
}

/// Fields for a user created from a first subscription event.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub customer_id: String,
    pub subscription_id: Option<String>,
    pub license_key: LicenseKey,
    pub active: bool,
    pub last_event_at: Option<UnixMillis>,
}

/// A client session issued by the auth gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub started_at: UnixMillis,
    pub last_heartbeat_at: UnixMillis,
    pub heartbeats: u64,
}

/// Hashes of one release for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub version: Version,
    pub os: Platform,
    /// SHA-256 of the full installer package, lower-case hex.
    pub app_hash: String,
    /// SHA-256 of the autoupdate package, lower-case hex.
    pub update_hash: String,
}

/// A reconciliation anomaly kept for operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub id: i64,
    pub kind: String,
    pub customer_id: String,
    pub subscription_id: Option<String>,
    pub detail: String,
    pub recorded_at: UnixMillis,
}
