use keyward_billing::{EventKind, ReconcileError, SubscriptionEvent, SubscriptionStatus, WebhookEnvelope};
use keyward_types::UnixMillis;
use pretty_assertions::assert_eq;
use serde_json::json;

fn envelope(value: serde_json::Value) -> WebhookEnvelope {
    serde_json::from_value(value).unwrap()
}

fn subscription_envelope(event_type: &str, object: serde_json::Value) -> WebhookEnvelope {
    envelope(json!({
        "id": "evt_1",
        "type": event_type,
        "created": 1_700_000_000,
        "data": { "object": object }
    }))
}

// ── Kinds ────────────────────────────────────────────────────────

#[test]
fn maps_subscription_event_types() {
    assert_eq!(EventKind::from_type("customer.subscription.created"), Some(EventKind::Created));
    assert_eq!(EventKind::from_type("customer.subscription.updated"), Some(EventKind::Updated));
    assert_eq!(EventKind::from_type("customer.subscription.deleted"), Some(EventKind::Deleted));
    assert_eq!(EventKind::from_type("subscription.updated"), Some(EventKind::Updated));
    assert_eq!(EventKind::from_type("invoice.paid"), None);
}

#[test]
fn other_event_types_are_dropped() {
    let env = subscription_envelope("invoice.paid", json!({ "id": "in_1" }));
    assert!(SubscriptionEvent::from_envelope(&env).unwrap().is_none());
}

// ── Normalization ────────────────────────────────────────────────

#[test]
fn normalizes_customer_id_reference() {
    let env = subscription_envelope(
        "customer.subscription.created",
        json!({ "id": "sub_1", "customer": "cus_1", "status": "active" }),
    );
    let event = SubscriptionEvent::from_envelope(&env).unwrap().unwrap();

    assert_eq!(event.kind, EventKind::Created);
    assert_eq!(event.event_id, "evt_1");
    assert_eq!(event.subscription_id, "sub_1");
    assert_eq!(event.customer_id, "cus_1");
    assert_eq!(event.status, SubscriptionStatus::Active);
    assert_eq!(event.email, "");
    assert_eq!(event.occurred_at, UnixMillis::from_secs(1_700_000_000));
    assert!(event.grants_access());
}

#[test]
fn normalizes_expanded_customer() {
    let env = subscription_envelope(
        "customer.subscription.updated",
        json!({
            "id": "sub_1",
            "customer": { "id": "cus_1", "email": "a@example.com", "name": null },
            "status": "past_due"
        }),
    );
    let event = SubscriptionEvent::from_envelope(&env).unwrap().unwrap();

    assert_eq!(event.customer_id, "cus_1");
    assert_eq!(event.email, "a@example.com");
    assert_eq!(event.name, "");
    assert_eq!(event.status, SubscriptionStatus::PastDue);
    assert!(!event.grants_access());
}

#[test]
fn unknown_status_is_other() {
    let env = subscription_envelope(
        "customer.subscription.updated",
        json!({ "id": "sub_1", "customer": "cus_1", "status": "something_new" }),
    );
    let event = SubscriptionEvent::from_envelope(&env).unwrap().unwrap();
    assert_eq!(event.status, SubscriptionStatus::Other);
    assert!(!event.status.is_active());
}

#[test]
fn deleted_never_grants_access() {
    let env = subscription_envelope(
        "customer.subscription.deleted",
        json!({ "id": "sub_1", "customer": "cus_1", "status": "active" }),
    );
    let event = SubscriptionEvent::from_envelope(&env).unwrap().unwrap();
    assert_eq!(event.kind, EventKind::Deleted);
    assert!(!event.grants_access());
}

#[test]
fn only_active_status_is_active() {
    assert!(SubscriptionStatus::Active.is_active());
    for status in [
        SubscriptionStatus::Trialing,
        SubscriptionStatus::PastDue,
        SubscriptionStatus::Canceled,
        SubscriptionStatus::Unpaid,
        SubscriptionStatus::Incomplete,
        SubscriptionStatus::IncompleteExpired,
        SubscriptionStatus::Paused,
        SubscriptionStatus::Other,
    ] {
        assert!(!status.is_active(), "{status} should not be active");
    }
}

// ── Malformed ────────────────────────────────────────────────────

#[test]
fn missing_customer_is_malformed() {
    let env = subscription_envelope(
        "customer.subscription.created",
        json!({ "id": "sub_1", "status": "active" }),
    );
    assert!(matches!(
        SubscriptionEvent::from_envelope(&env),
        Err(ReconcileError::Malformed(_))
    ));
}

#[test]
fn empty_ids_are_malformed() {
    let env = subscription_envelope(
        "customer.subscription.created",
        json!({ "id": "", "customer": "cus_1", "status": "active" }),
    );
    assert!(matches!(
        SubscriptionEvent::from_envelope(&env),
        Err(ReconcileError::Malformed(_))
    ));
}

#[test]
fn envelope_requires_created_timestamp() {
    let result: Result<WebhookEnvelope, _> = serde_json::from_value(json!({
        "id": "evt_1",
        "type": "customer.subscription.created",
        "data": { "object": {} }
    }));
    assert!(result.is_err());
}
