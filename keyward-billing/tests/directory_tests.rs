use keyward_billing::{CustomerDirectory, ProviderError, StripeCustomerDirectory};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn directory(server: &MockServer, timeout: Duration) -> StripeCustomerDirectory {
    StripeCustomerDirectory::new("sk_test_123", server.uri(), timeout).unwrap()
}

#[tokio::test]
async fn fetches_customer_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/customers/cus_1"))
        .and(header("authorization", "Bearer sk_test_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cus_1",
            "object": "customer",
            "email": "a@example.com",
            "name": "Ada Lovelace"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let customer = directory(&server, Duration::from_secs(5))
        .fetch_customer("cus_1")
        .await
        .unwrap();

    assert_eq!(customer.id, "cus_1");
    assert_eq!(customer.email, "a@example.com");
    assert_eq!(customer.name, "Ada Lovelace");
}

#[tokio::test]
async fn null_profile_fields_become_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/customers/cus_2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cus_2",
            "email": null,
            "name": null
        })))
        .mount(&server)
        .await;

    let customer = directory(&server, Duration::from_secs(5))
        .fetch_customer("cus_2")
        .await
        .unwrap();
    assert_eq!(customer.email, "");
    assert_eq!(customer.name, "");
}

#[tokio::test]
async fn missing_customer_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = directory(&server, Duration::from_secs(5))
        .fetch_customer("cus_missing")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(id) if id == "cus_missing"));
}

#[tokio::test]
async fn server_error_is_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = directory(&server, Duration::from_secs(5))
        .fetch_customer("cus_1")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Status(502)));
}

#[tokio::test]
async fn slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "cus_1" }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let err = directory(&server, Duration::from_millis(50))
        .fetch_customer("cus_1")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Timeout));
}
