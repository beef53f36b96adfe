use keyward_billing::{
    ActivationHook, ActivationTransition, Anomaly, AnomalyKind, Direction, HookError,
    HttpNotifyHook, Notice,
};
use keyward_license::LicenseKey;
use keyward_types::UserId;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transition(direction: Direction, is_new_user: bool) -> ActivationTransition {
    ActivationTransition {
        user_id: UserId::new(),
        email: "a@example.com".to_string(),
        name: "Ada Lovelace".to_string(),
        license_key: LicenseKey::generate(),
        direction,
        is_new_user,
    }
}

// ── Notices ──────────────────────────────────────────────────────

#[test]
fn notice_follows_direction_and_novelty() {
    assert_eq!(transition(Direction::Activated, true).notice(), Notice::NewLicense);
    assert_eq!(transition(Direction::Activated, false).notice(), Notice::Reactivated);
    assert_eq!(transition(Direction::Deactivated, false).notice(), Notice::Ended);
}

#[test]
fn subscription_change_detail_names_both_ids() {
    let anomaly = Anomaly {
        user_id: None,
        customer_id: "cus_1".to_string(),
        subscription_id: "sub_2".to_string(),
        kind: AnomalyKind::SubscriptionChanged {
            current: "sub_1".to_string(),
            incoming: "sub_2".to_string(),
        },
    };
    assert_eq!(anomaly.kind_str(), "subscription_changed");
    assert_eq!(
        anomaly.to_string(),
        "user subscription id changed: user id = none, cus_id = cus_1, old sub = sub_1, new = sub_2"
    );
}

// ── HTTP notify ──────────────────────────────────────────────────

#[tokio::test]
async fn posts_text_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_json(serde_json::json!({
            "text": "`a@example.com` subscription ended."
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let hook = HttpNotifyHook::new(format!("{}/hook", server.uri()), Duration::from_secs(5)).unwrap();
    hook.on_activation(&transition(Direction::Deactivated, false))
        .await
        .unwrap();
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let hook = HttpNotifyHook::new(server.uri(), Duration::from_secs(5)).unwrap();
    let err = hook
        .on_activation(&transition(Direction::Activated, true))
        .await
        .unwrap_err();
    assert!(matches!(err, HookError::Status(500)));
}
