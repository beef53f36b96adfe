//! Client authentication and session liveness for Keyward.
//!
//! - [`AuthGate`] checks an email and license key against the entitlement
//!   store, applies the user's version lock, and opens a session
//! - [`HeartbeatTracker`] keeps a session's liveness timestamp moving
//! - [`ReleaseCatalog`] turns artifact records into download locators
//!
//! Unknown emails and wrong keys produce the same result. Callers cannot
//! learn whether an email is registered.

mod catalog;
mod error;
mod gate;
mod heartbeat;

pub use catalog::ReleaseCatalog;
pub use error::{AuthError, GateResult, HeartbeatError};
pub use gate::{AuthGate, AuthOutcome, AuthRequest, UpdateInfo};
pub use heartbeat::HeartbeatTracker;
