//! Shared fakes for reconciler tests.

#![allow(dead_code)]

use async_trait::async_trait;
use keyward_billing::{
    signature_header, ActivationHook, ActivationTransition, Anomaly, Customer, CustomerDirectory,
    EventKind, HookError, ProviderError, Reconciler, SubscriptionEvent, SubscriptionStatus,
};
use keyward_store::EntitlementStore;
use keyward_types::UnixMillis;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const SECRET: &str = "whsec_test_secret";
pub const T0: i64 = 1_700_000_000;

/// In-memory customer directory.
#[derive(Default)]
pub struct FakeDirectory {
    customers: Mutex<HashMap<String, Customer>>,
    pub lookups: Mutex<usize>,
}

impl FakeDirectory {
    pub fn with(customers: &[(&str, &str, &str)]) -> Arc<Self> {
        let dir = Self::default();
        for (id, email, name) in customers {
            dir.put(id, email, name);
        }
        Arc::new(dir)
    }

    pub fn put(&self, id: &str, email: &str, name: &str) {
        self.customers.lock().unwrap().insert(
            id.to_string(),
            Customer {
                id: id.to_string(),
                email: email.to_string(),
                name: name.to_string(),
            },
        );
    }
}

#[async_trait]
impl CustomerDirectory for FakeDirectory {
    async fn fetch_customer(&self, customer_id: &str) -> Result<Customer, ProviderError> {
        *self.lookups.lock().unwrap() += 1;
        self.customers
            .lock()
            .unwrap()
            .get(customer_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(customer_id.to_string()))
    }
}

/// Records every hook invocation.
#[derive(Default)]
pub struct RecordingHook {
    pub transitions: Mutex<Vec<ActivationTransition>>,
    pub anomalies: Mutex<Vec<Anomaly>>,
}

impl RecordingHook {
    pub fn transitions(&self) -> Vec<ActivationTransition> {
        self.transitions.lock().unwrap().clone()
    }

    pub fn anomalies(&self) -> Vec<Anomaly> {
        self.anomalies.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivationHook for RecordingHook {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn on_activation(&self, transition: &ActivationTransition) -> Result<(), HookError> {
        self.transitions.lock().unwrap().push(transition.clone());
        Ok(())
    }

    async fn on_anomaly(&self, anomaly: &Anomaly) -> Result<(), HookError> {
        self.anomalies.lock().unwrap().push(anomaly.clone());
        Ok(())
    }
}

/// A hook that always fails.
pub struct FailingHook;

#[async_trait]
impl ActivationHook for FailingHook {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn on_activation(&self, _: &ActivationTransition) -> Result<(), HookError> {
        Err(HookError::Status(500))
    }
}

pub struct Harness {
    pub store: EntitlementStore,
    pub directory: Arc<FakeDirectory>,
    pub hook: Arc<RecordingHook>,
    pub reconciler: Arc<Reconciler>,
}

pub fn harness(customers: &[(&str, &str, &str)]) -> Harness {
    let store = EntitlementStore::open_in_memory().unwrap();
    let directory = FakeDirectory::with(customers);
    let hook = Arc::new(RecordingHook::default());
    let reconciler = Reconciler::new(store.clone(), directory.clone(), SECRET)
        .with_hook(hook.clone());
    Harness {
        store,
        directory,
        hook,
        reconciler: Arc::new(reconciler),
    }
}

pub fn event(
    kind: EventKind,
    sub: &str,
    cus: &str,
    status: SubscriptionStatus,
    created_secs: i64,
) -> SubscriptionEvent {
    SubscriptionEvent {
        kind,
        event_id: format!("evt_{sub}_{created_secs}"),
        subscription_id: sub.to_string(),
        customer_id: cus.to_string(),
        status,
        email: String::new(),
        name: String::new(),
        occurred_at: UnixMillis::from_secs(created_secs),
    }
}

/// A raw provider delivery and a header signed now.
pub fn signed_delivery(event_type: &str, sub: &str, cus: &str, status: &str) -> (Vec<u8>, String) {
    let payload = serde_json::to_vec(&json!({
        "id": format!("evt_{sub}"),
        "object": "event",
        "type": event_type,
        "created": T0,
        "data": { "object": { "id": sub, "object": "subscription", "customer": cus, "status": status } }
    }))
    .unwrap();
    let header = signature_header(&payload, SECRET, UnixMillis::now().as_secs()).unwrap();
    (payload, header)
}
