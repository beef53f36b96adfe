//! Applies subscription events to the entitlement store.

use crate::directory::{Customer, CustomerDirectory};
use crate::error::{ReconcileError, ReconcileResult};
use crate::event::{EventKind, SubscriptionEvent, WebhookEnvelope};
use crate::hooks::{ActivationHook, ActivationTransition, Anomaly, AnomalyKind, Direction};
use crate::signature::{verify_signature, SIGNATURE_TOLERANCE_SECS};
use keyward_license::LicenseKey;
use keyward_store::{EntitlementStore, NewUser, StoreTx, User};
use keyward_types::{UnixMillis, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What reconciling one event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The user row was written. `transition` is set when the
    /// activation flag flipped.
    Applied {
        user_id: UserId,
        transition: Option<ActivationTransition>,
    },
    /// The event matched stored state; nothing was written.
    Unchanged { user_id: UserId },
    /// The event is older than the newest one already seen for its
    /// subscription. `user_id` is unset when no user holds it yet.
    Stale { user_id: Option<UserId> },
    /// No user exists and the event does not grant access.
    Skipped,
    /// The mutation was refused and logged for operators.
    Anomaly(Anomaly),
}

/// Keeps entitlements in line with the payment provider.
///
/// Constructed once at startup and shared behind an `Arc`.
pub struct Reconciler {
    store: EntitlementStore,
    directory: Arc<dyn CustomerDirectory>,
    hooks: Vec<Arc<dyn ActivationHook>>,
    webhook_secret: String,
}

impl Reconciler {
    pub fn new(
        store: EntitlementStore,
        directory: Arc<dyn CustomerDirectory>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            store,
            directory,
            hooks: Vec::new(),
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Registers a post-commit hook. Hooks run in registration order.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn ActivationHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Verifies and normalizes a raw delivery.
    ///
    /// Returns `Ok(None)` for event types that are acknowledged and dropped.
    /// Nothing is parsed before the signature checks out.
    pub fn receive(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> ReconcileResult<Option<SubscriptionEvent>> {
        verify_signature(
            payload,
            signature_header,
            &self.webhook_secret,
            UnixMillis::now().as_secs(),
            SIGNATURE_TOLERANCE_SECS,
        )?;

        let envelope: WebhookEnvelope = serde_json::from_slice(payload)
            .map_err(|e| ReconcileError::Malformed(e.to_string()))?;
        let event = SubscriptionEvent::from_envelope(&envelope)?;
        if event.is_none() {
            debug!(event_id = %envelope.id, event_type = %envelope.event_type, "ignoring event type");
        }
        Ok(event)
    }

    /// Verifies, normalizes, and reconciles in one call.
    pub async fn handle(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> ReconcileResult<Option<ReconcileOutcome>> {
        match self.receive(payload, signature_header)? {
            Some(event) => self.reconcile(&event).await.map(Some),
            None => Ok(None),
        }
    }

    /// Applies one normalized event.
    ///
    /// The customer profile is fetched before the transaction opens so no
    /// network call happens while the store is locked. Hooks run after
    /// commit.
    pub async fn reconcile(&self, event: &SubscriptionEvent) -> ReconcileResult<ReconcileOutcome> {
        let customer = self.directory.fetch_customer(&event.customer_id).await?;

        if !event.email.is_empty() && !event.email.eq_ignore_ascii_case(&customer.email) {
            warn!(
                customer_id = %event.customer_id,
                payload_email = %event.email,
                customer_email = %customer.email,
                "webhook email differs from customer record; using customer record"
            );
        }

        let now = UnixMillis::now();
        let outcome = self
            .store
            .transaction(|tx| decide(tx, event, &customer, now))?;

        self.log_outcome(event, &outcome);
        self.run_hooks(&outcome).await;
        Ok(outcome)
    }

    fn log_outcome(&self, event: &SubscriptionEvent, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Applied { user_id, transition } => info!(
                event_id = %event.event_id,
                user_id = %user_id,
                subscription_id = %event.subscription_id,
                status = %event.status,
                transition = ?transition.as_ref().map(|t| t.direction),
                "subscription event applied"
            ),
            ReconcileOutcome::Unchanged { user_id } => debug!(
                event_id = %event.event_id,
                user_id = %user_id,
                "subscription event already applied"
            ),
            ReconcileOutcome::Stale { user_id } => info!(
                event_id = %event.event_id,
                user_id = ?user_id,
                subscription_id = %event.subscription_id,
                occurred_at = event.occurred_at.as_millis(),
                "ignoring out-of-order subscription event"
            ),
            ReconcileOutcome::Skipped => debug!(
                event_id = %event.event_id,
                customer_id = %event.customer_id,
                status = %event.status,
                "no user for inactive subscription"
            ),
            ReconcileOutcome::Anomaly(anomaly) => warn!(
                event_id = %event.event_id,
                kind = anomaly.kind_str(),
                "{anomaly}"
            ),
        }
    }

    async fn run_hooks(&self, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Applied {
                transition: Some(transition),
                ..
            } => {
                for hook in &self.hooks {
                    if let Err(e) = hook.on_activation(transition).await {
                        warn!(hook = hook.name(), user_id = %transition.user_id, "activation hook failed: {e}");
                    }
                }
            }
            ReconcileOutcome::Anomaly(anomaly) => {
                for hook in &self.hooks {
                    if let Err(e) = hook.on_anomaly(anomaly).await {
                        warn!(hook = hook.name(), "anomaly hook failed: {e}");
                    }
                }
            }
            _ => {}
        }
    }
}

/// The read-modify-write step, run inside one store transaction.
///
/// Ordering is tracked per subscription as well as per user, so an event
/// that was skipped still fences off older deliveries for its subscription.
fn decide(
    tx: &StoreTx<'_>,
    event: &SubscriptionEvent,
    customer: &Customer,
    now: UnixMillis,
) -> ReconcileResult<ReconcileOutcome> {
    let existing = match tx.user_by_subscription(&event.subscription_id)? {
        Some(user) => Some(user),
        None => tx.user_by_customer(&event.customer_id)?,
    };

    let seen = tx.subscription_high_water(&event.subscription_id)?;
    if seen.is_some_and(|last| event.occurred_at < last) {
        return Ok(ReconcileOutcome::Stale {
            user_id: existing.map(|u| u.id),
        });
    }

    let outcome = match existing {
        Some(user) => update_user(tx, user, event, customer, now)?,
        None => create_user(tx, event, customer, now)?,
    };
    if !matches!(outcome, ReconcileOutcome::Stale { .. }) {
        tx.advance_subscription(&event.subscription_id, event.occurred_at, event.status.as_str())?;
    }
    Ok(outcome)
}

fn update_user(
    tx: &StoreTx<'_>,
    user: User,
    event: &SubscriptionEvent,
    customer: &Customer,
    now: UnixMillis,
) -> ReconcileResult<ReconcileOutcome> {
    if user.last_event_at.is_some_and(|last| event.occurred_at < last) {
        return Ok(ReconcileOutcome::Stale {
            user_id: Some(user.id),
        });
    }

    let bound = user.subscription_id.as_deref().filter(|s| !s.is_empty());
    let matches_binding = bound == Some(event.subscription_id.as_str());

    if let Some(current) = bound {
        if !matches_binding {
            if event.kind == EventKind::Deleted {
                // The subscription being deleted is not the one this user holds.
                return Ok(ReconcileOutcome::Unchanged { user_id: user.id });
            }
            let anomaly = Anomaly {
                user_id: Some(user.id),
                customer_id: event.customer_id.clone(),
                subscription_id: event.subscription_id.clone(),
                kind: AnomalyKind::SubscriptionChanged {
                    current: current.to_string(),
                    incoming: event.subscription_id.clone(),
                },
            };
            return record(tx, anomaly, now);
        }
    } else if event.kind == EventKind::Deleted {
        return Ok(ReconcileOutcome::Unchanged { user_id: user.id });
    }

    if let Some(anomaly) = email_conflict(tx, Some(user.id), event, customer)? {
        return record(tx, anomaly, now);
    }

    let mut next = user.clone();
    if event.kind == EventKind::Deleted {
        next.subscription_id = None;
        next.active = false;
    } else {
        next.subscription_id = Some(event.subscription_id.clone());
        next.active = event.status.is_active();
    }
    if !customer.email.is_empty() {
        next.email = customer.email.clone();
    }
    if !customer.name.is_empty() {
        next.name = customer.name.clone();
    }
    next.last_event_at = Some(event.occurred_at);

    if next == user {
        return Ok(ReconcileOutcome::Unchanged { user_id: user.id });
    }

    let saved = tx.update_user(&next, now)?;
    let transition = (saved.active != user.active).then(|| transition_for(&saved, false));
    Ok(ReconcileOutcome::Applied {
        user_id: saved.id,
        transition,
    })
}

fn create_user(
    tx: &StoreTx<'_>,
    event: &SubscriptionEvent,
    customer: &Customer,
    now: UnixMillis,
) -> ReconcileResult<ReconcileOutcome> {
    if !event.grants_access() {
        return Ok(ReconcileOutcome::Skipped);
    }
    if let Some(anomaly) = email_conflict(tx, None, event, customer)? {
        return record(tx, anomaly, now);
    }

    let user = tx.insert_user(
        NewUser {
            email: customer.email.clone(),
            name: customer.name.clone(),
            customer_id: event.customer_id.clone(),
            subscription_id: Some(event.subscription_id.clone()),
            license_key: LicenseKey::generate(),
            active: true,
            last_event_at: Some(event.occurred_at),
        },
        now,
    )?;

    Ok(ReconcileOutcome::Applied {
        user_id: user.id,
        transition: Some(transition_for(&user, true)),
    })
}

/// Another user already owns the customer's email.
fn email_conflict(
    tx: &StoreTx<'_>,
    user_id: Option<UserId>,
    event: &SubscriptionEvent,
    customer: &Customer,
) -> ReconcileResult<Option<Anomaly>> {
    if customer.email.is_empty() {
        return Ok(None);
    }
    let Some(owner) = tx.user_by_email(&customer.email)? else {
        return Ok(None);
    };
    if Some(owner.id) == user_id {
        return Ok(None);
    }
    Ok(Some(Anomaly {
        user_id,
        customer_id: event.customer_id.clone(),
        subscription_id: event.subscription_id.clone(),
        kind: AnomalyKind::EmailConflict {
            email: customer.email.clone(),
            other_user: owner.id,
        },
    }))
}

fn record(tx: &StoreTx<'_>, anomaly: Anomaly, now: UnixMillis) -> ReconcileResult<ReconcileOutcome> {
    tx.record_anomaly(
        anomaly.kind_str(),
        &anomaly.customer_id,
        Some(&anomaly.subscription_id),
        &anomaly.to_string(),
        now,
    )?;
    Ok(ReconcileOutcome::Anomaly(anomaly))
}

fn transition_for(user: &User, is_new_user: bool) -> ActivationTransition {
    ActivationTransition {
        user_id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        license_key: user.license_key.clone(),
        direction: if user.active {
            Direction::Activated
        } else {
            Direction::Deactivated
        },
        is_new_user,
    }
}
