//! Session liveness.

use crate::error::HeartbeatError;
use keyward_store::{EntitlementStore, Session};
use keyward_types::{SessionId, UnixMillis, UserId};
use tracing::debug;

/// Records heartbeats for sessions opened by the auth gate.
///
/// The caller resolves `claimed_user` from credentials checked the same
/// way as [`crate::AuthGate::authenticate`].
#[derive(Clone)]
pub struct HeartbeatTracker {
    store: EntitlementStore,
}

impl HeartbeatTracker {
    pub fn new(store: EntitlementStore) -> Self {
        Self { store }
    }

    pub fn heartbeat(
        &self,
        session_id: SessionId,
        claimed_user: UserId,
    ) -> Result<Session, HeartbeatError> {
        self.heartbeat_at(session_id, claimed_user, UnixMillis::now())
    }

    /// [`Self::heartbeat`] with an explicit clock.
    pub fn heartbeat_at(
        &self,
        session_id: SessionId,
        claimed_user: UserId,
        now: UnixMillis,
    ) -> Result<Session, HeartbeatError> {
        let Some(session) = self.store.session(session_id)? else {
            debug!(session_id = %session_id, "heartbeat for unknown session");
            return Err(HeartbeatError::InvalidSession);
        };
        if session.user_id != claimed_user {
            debug!(session_id = %session_id, "heartbeat from a different user");
            return Err(HeartbeatError::InvalidSession);
        }

        // The counter and timestamp move in one UPDATE.
        let session = self.store.record_heartbeat(session_id, now)?;
        debug!(session_id = %session.id, heartbeats = session.heartbeats, "heartbeat");
        Ok(session)
    }
}
