use keyward_server::{ConfigError, ServerConfig};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ServerConfig::from_lookup(|name| vars.get(name).cloned())
}

const REQUIRED: [(&str, &str); 2] = [
    ("STRIPE_API_KEY", "sk_test_1"),
    ("STRIPE_WEBHOOK_SECRET", "whsec_1"),
];

#[test]
fn required_vars_and_defaults() {
    let config = load(&REQUIRED).unwrap();
    assert_eq!(config.stripe_api_key, "sk_test_1");
    assert_eq!(config.stripe_webhook_secret, "whsec_1");
    assert_eq!(config.stripe_api_base, "https://api.stripe.com");
    assert_eq!(config.notify_webhook_url, None);
    assert_eq!(config.crash_report_dir, PathBuf::from("crash-reports"));
    assert_eq!(config.provider_timeout, Duration::from_secs(10));
}

#[test]
fn missing_secret_is_fatal() {
    let err = load(&[("STRIPE_API_KEY", "sk_test_1")]).unwrap_err();
    assert!(matches!(err, ConfigError::MissingVar(name) if name == "STRIPE_WEBHOOK_SECRET"));
}

#[test]
fn blank_secret_counts_as_missing() {
    let err = load(&[("STRIPE_API_KEY", "  "), REQUIRED[1]]).unwrap_err();
    assert!(matches!(err, ConfigError::MissingVar(name) if name == "STRIPE_API_KEY"));
}

#[test]
fn optional_overrides() {
    let mut vars = REQUIRED.to_vec();
    vars.extend([
        ("STRIPE_API_BASE", "http://localhost:12111"),
        ("NOTIFY_WEBHOOK_URL", "https://hooks.example.com/T000"),
        ("CRASH_REPORT_DIR", "/var/lib/keyward/crashes"),
        ("PROVIDER_TIMEOUT_SECS", "3"),
    ]);
    let config = load(&vars).unwrap();
    assert_eq!(config.stripe_api_base, "http://localhost:12111");
    assert_eq!(config.notify_webhook_url.as_deref(), Some("https://hooks.example.com/T000"));
    assert_eq!(config.crash_report_dir, PathBuf::from("/var/lib/keyward/crashes"));
    assert_eq!(config.provider_timeout, Duration::from_secs(3));
}

#[test]
fn bad_timeout_is_rejected() {
    for raw in ["0", "soon", "-1"] {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PROVIDER_TIMEOUT_SECS", raw));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidVar { .. })), "{raw}");
    }
}
