//! Normalized subscription lifecycle events.

use crate::error::{ReconcileError, ReconcileResult};
use keyward_types::UnixMillis;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The signed JSON envelope the provider delivers.
///
/// Parsed only after the signature has been verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Unix seconds at which the provider created the event.
    pub created: i64,
    pub data: EnvelopeData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeData {
    pub object: serde_json::Value,
}

/// Which lifecycle transition an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

impl EventKind {
    /// Maps a provider event type. Other event types are not reconciled.
    #[must_use]
    pub fn from_type(event_type: &str) -> Option<Self> {
        match event_type {
            "customer.subscription.created" | "subscription.created" => Some(Self::Created),
            "customer.subscription.updated" | "subscription.updated" => Some(Self::Updated),
            "customer.subscription.deleted" | "subscription.deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// Subscription status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    IncompleteExpired,
    Paused,
    #[serde(other)]
    Other,
}

impl SubscriptionStatus {
    /// Only `active` grants an entitlement.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Unpaid => "unpaid",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Paused => "paused",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `customer` is either an id or an expanded customer object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CustomerRef {
    Id(String),
    Expanded {
        id: String,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    id: String,
    customer: CustomerRef,
    status: SubscriptionStatus,
}

/// A subscription event, consumed once by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub kind: EventKind,
    pub event_id: String,
    pub subscription_id: String,
    pub customer_id: String,
    pub status: SubscriptionStatus,
    /// Email carried by the payload, if the customer was expanded.
    /// Informational only; the customer directory is authoritative.
    pub email: String,
    pub name: String,
    pub occurred_at: UnixMillis,
}

impl SubscriptionEvent {
    /// Normalizes an envelope.
    ///
    /// Returns `Ok(None)` for event types that are acknowledged and dropped.
    pub fn from_envelope(envelope: &WebhookEnvelope) -> ReconcileResult<Option<Self>> {
        let Some(kind) = EventKind::from_type(&envelope.event_type) else {
            return Ok(None);
        };

        let object: SubscriptionObject = serde_json::from_value(envelope.data.object.clone())
            .map_err(|e| ReconcileError::Malformed(format!("subscription object: {e}")))?;

        let (customer_id, email, name) = match object.customer {
            CustomerRef::Id(id) => (id, String::new(), String::new()),
            CustomerRef::Expanded { id, email, name } => {
                (id, email.unwrap_or_default(), name.unwrap_or_default())
            }
        };

        if object.id.is_empty() || customer_id.is_empty() {
            return Err(ReconcileError::Malformed(
                "subscription or customer id is empty".to_string(),
            ));
        }

        Ok(Some(Self {
            kind,
            event_id: envelope.id.clone(),
            subscription_id: object.id,
            customer_id,
            status: object.status,
            email,
            name,
            occurred_at: UnixMillis::from_secs(envelope.created),
        }))
    }

    /// Whether applying this event leaves the user entitled.
    #[must_use]
    pub fn grants_access(&self) -> bool {
        self.kind != EventKind::Deleted && self.status.is_active()
    }
}
