//! SQLite entitlement store for Keyward.
//!
//! The store exclusively owns user and session rows. Every other component
//! goes through its operations; nothing keeps row references across
//! requests.
//!
//! # Architecture
//!
//! - One SQLite file, one connection behind a mutex
//! - Read-modify-write sequences run inside [`EntitlementStore::transaction`]
//! - Users are never deleted; sessions are kept as a liveness history
//! - Release artifacts are keyed by `(version, os)`
//! - Reconciliation anomalies are appended to an operator-facing log

mod error;
mod model;
mod rows;
mod schema;
mod store;
mod tx;

pub use error::{StoreError, StoreResult};
pub use model::{AnomalyRecord, ArtifactRecord, NewUser, Session, User};
pub use store::EntitlementStore;
pub use tx::StoreTx;
