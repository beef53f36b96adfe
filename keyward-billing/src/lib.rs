//! Payment provider webhook reconciliation for Keyward.
//!
//! Keeps each user's entitlement consistent with the subscription lifecycle
//! reported by the payment provider.
//!
//! ## Components
//!
//! - **Signature**: verifies the provider's `Stripe-Signature` header
//! - **Event**: normalizes a verified payload into a [`SubscriptionEvent`]
//! - **Directory**: resolves the authoritative customer profile
//! - **Reconciler**: applies an event to the entitlement store in one transaction
//! - **Hooks**: best-effort notifications run after commit
//! - **Queue**: decouples webhook receipt from reconciliation
//!
//! ## Reconciliation
//!
//! 1. Verify the signature, then parse; drop event kinds we do not handle
//! 2. Fetch the customer from the provider (email and name are taken from
//!    there, not from the webhook body)
//! 3. Find the user by subscription id, falling back to customer id
//! 4. Create the user with a fresh license key if unknown and active
//! 5. Refuse to rebind a user to a second subscription; record an anomaly
//! 6. Apply activation and profile changes
//! 7. After commit, notify hooks if the activation flag flipped

mod directory;
mod error;
mod event;
mod hooks;
mod queue;
mod reconciler;
mod signature;

pub use directory::{Customer, CustomerDirectory, StripeCustomerDirectory, DEFAULT_STRIPE_API_BASE};
pub use error::{HookError, ProviderError, QueueError, ReconcileError, ReconcileResult};
pub use event::{EventKind, SubscriptionEvent, SubscriptionStatus, WebhookEnvelope};
pub use hooks::{
    ActivationHook, ActivationTransition, Anomaly, AnomalyKind, Direction, HttpNotifyHook, LogHook,
    Notice,
};
pub use queue::{QueueHandle, WebhookQueue};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use signature::{signature_header, verify_signature, SIGNATURE_TOLERANCE_SECS};
