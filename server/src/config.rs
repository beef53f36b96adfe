use keyward_billing::DEFAULT_STRIPE_API_BASE;
use std::path::PathBuf;
use std::time::Duration;

/// Secrets and endpoints, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub stripe_api_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub download_base_url: String,
    /// Chat webhook for operator notifications. Disabled when unset.
    pub notify_webhook_url: Option<String>,
    pub crash_report_dir: PathBuf,
    /// Timeout for customer lookups, separate from the inbound request.
    pub provider_timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVar(String),
    #[error("invalid value for {name}: {value}")]
    InvalidVar { name: String, value: String },
}

const DEFAULT_DOWNLOAD_BASE_URL: &str = "https://downloads.keyward.dev";
const DEFAULT_CRASH_REPORT_DIR: &str = "crash-reports";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require =
            |name: &str| get(name).ok_or_else(|| ConfigError::MissingVar(name.to_string()));

        let provider_timeout = match get("PROVIDER_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidVar {
                        name: "PROVIDER_TIMEOUT_SECS".to_string(),
                        value: raw,
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
        };

        Ok(Self {
            stripe_api_key: require("STRIPE_API_KEY")?,
            stripe_webhook_secret: require("STRIPE_WEBHOOK_SECRET")?,
            stripe_api_base: get("STRIPE_API_BASE")
                .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.to_string()),
            download_base_url: get("DOWNLOAD_BASE_URL")
                .unwrap_or_else(|| DEFAULT_DOWNLOAD_BASE_URL.to_string()),
            notify_webhook_url: get("NOTIFY_WEBHOOK_URL"),
            crash_report_dir: get("CRASH_REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CRASH_REPORT_DIR)),
            provider_timeout,
        })
    }
}
