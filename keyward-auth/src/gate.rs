//! The auth gate.

use crate::catalog::ReleaseCatalog;
use crate::error::GateResult;
use keyward_license::LicenseKey;
use keyward_store::{EntitlementStore, User};
use keyward_types::{AuthResult, Platform, SessionId, UnixMillis, Version};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Credentials and client details presented at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub email: String,
    pub license_key: String,
    pub os: Platform,
    pub version: Version,
}

/// A newer release the client should install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInfo {
    pub version: Version,
    pub download_url: String,
    /// SHA-256 of the update package, lower-case hex. The client checks
    /// it before staging the update.
    pub download_hash: String,
    /// Full installer for the same release, for clients whose install is
    /// too damaged to patch.
    pub installer_url: String,
    pub installer_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthOutcome {
    pub result: AuthResult,
    /// Set only on success.
    pub session_id: Option<SessionId>,
    /// The user's pinned release, on `SuccessLocked` and `FailVersionLocked`.
    pub locked_version: Option<Version>,
    pub update: Option<UpdateInfo>,
}

impl AuthOutcome {
    fn rejected(result: AuthResult) -> Self {
        Self {
            result,
            session_id: None,
            locked_version: None,
            update: None,
        }
    }
}

/// Validates credentials and opens sessions.
#[derive(Clone)]
pub struct AuthGate {
    store: EntitlementStore,
    catalog: ReleaseCatalog,
}

impl AuthGate {
    pub fn new(store: EntitlementStore, catalog: ReleaseCatalog) -> Self {
        Self { store, catalog }
    }

    /// Returns the user if `license_key` belongs to `email`.
    ///
    /// Activation is not checked. An unknown email and a wrong key are
    /// indistinguishable to the caller.
    pub fn verify_credentials(&self, email: &str, license_key: &str) -> GateResult<Option<User>> {
        let Some(user) = self.store.user_by_email(email.trim())? else {
            // Compare anyway so both failure paths cost the same.
            let _ = LicenseKey::generate().matches(license_key);
            return Ok(None);
        };
        if user.license_key.matches(license_key) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub fn authenticate(&self, request: &AuthRequest) -> GateResult<AuthOutcome> {
        if !request.version.is_valid() {
            debug!(os = %request.os, "auth rejected: invalid client version");
            return Ok(AuthOutcome::rejected(AuthResult::FailInvalidVersion));
        }

        let Some(user) = self.verify_credentials(&request.email, &request.license_key)? else {
            debug!(os = %request.os, "auth rejected: invalid credentials");
            return Ok(AuthOutcome::rejected(AuthResult::FailInvalidCredentials));
        };

        if !user.active {
            info!(user_id = %user.id, "auth rejected: user inactive");
            return Ok(AuthOutcome::rejected(AuthResult::FailUserInactive));
        }

        if let Some(locked) = user.locked_version {
            if request.version > locked {
                info!(
                    user_id = %user.id,
                    client_version = %request.version,
                    locked_version = %locked,
                    "auth rejected: version locked"
                );
                return Ok(AuthOutcome {
                    locked_version: Some(locked),
                    ..AuthOutcome::rejected(AuthResult::FailVersionLocked)
                });
            }
        }

        let update = self.pending_update(request.os, request.version, user.locked_version)?;
        let session = self.store.create_session(user.id, UnixMillis::now())?;

        let result = if user.locked_version.is_some() {
            AuthResult::SuccessLocked
        } else {
            AuthResult::SuccessUnlocked
        };
        info!(
            user_id = %user.id,
            session_id = %session.id,
            os = %request.os,
            client_version = %request.version,
            update = ?update.as_ref().map(|u| u.version.to_string()),
            "authenticated"
        );

        Ok(AuthOutcome {
            result,
            session_id: Some(session.id),
            locked_version: user.locked_version,
            update,
        })
    }

    /// Admits an unregistered trial client.
    ///
    /// No credentials are checked and no session is opened. Trial clients
    /// are always unlocked and are offered the newest release.
    pub fn trial(&self, os: Platform, version: Version) -> GateResult<AuthOutcome> {
        if !version.is_valid() {
            debug!(%os, "trial rejected: invalid client version");
            return Ok(AuthOutcome::rejected(AuthResult::FailInvalidVersion));
        }
        let update = self.pending_update(os, version, None)?;
        info!(%os, client_version = %version, "trial client opened");
        Ok(AuthOutcome {
            update,
            ..AuthOutcome::rejected(AuthResult::SuccessUnlocked)
        })
    }

    /// Newest release for `os` that the user may run, if newer than `current`.
    fn pending_update(
        &self,
        os: Platform,
        current: Version,
        ceiling: Option<Version>,
    ) -> GateResult<Option<UpdateInfo>> {
        let latest = self.store.latest_artifact(os, ceiling)?;
        Ok(latest
            .filter(|artifact| artifact.version > current)
            .map(|artifact| UpdateInfo {
                version: artifact.version,
                download_url: self.catalog.update_url(artifact.version, os),
                download_hash: artifact.update_hash,
                installer_url: self.catalog.installer_url(artifact.version, os),
                installer_hash: artifact.app_hash,
            }))
    }
}
