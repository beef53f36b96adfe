//! Post-commit side effects.
//!
//! Hooks run after the reconciling transaction has committed. A failing
//! hook is logged and never rolls back entitlement state.

use crate::error::HookError;
use async_trait::async_trait;
use keyward_license::LicenseKey;
use keyward_types::UserId;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

/// Which way the activation flag flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Activated,
    Deactivated,
}

/// The user-facing notice a transition calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    /// First activation: send the license key and download link.
    NewLicense,
    /// An existing user came back.
    Reactivated,
    /// The subscription ended.
    Ended,
}

/// A change of a user's activation flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationTransition {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub license_key: LicenseKey,
    pub direction: Direction,
    pub is_new_user: bool,
}

impl ActivationTransition {
    #[must_use]
    pub fn notice(&self) -> Notice {
        match (self.direction, self.is_new_user) {
            (Direction::Activated, true) => Notice::NewLicense,
            (Direction::Activated, false) => Notice::Reactivated,
            (Direction::Deactivated, _) => Notice::Ended,
        }
    }
}

/// A condition the reconciler refused to resolve on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnomalyKind {
    /// The user is already bound to a different subscription.
    SubscriptionChanged { current: String, incoming: String },
    /// The customer's email already belongs to another user.
    EmailConflict { email: String, other_user: UserId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    pub user_id: Option<UserId>,
    pub customer_id: String,
    pub subscription_id: String,
    pub kind: AnomalyKind,
}

impl Anomaly {
    /// Stable label stored in the anomaly log.
    #[must_use]
    pub fn kind_str(&self) -> &'static str {
        match self.kind {
            AnomalyKind::SubscriptionChanged { .. } => "subscription_changed",
            AnomalyKind::EmailConflict { .. } => "email_conflict",
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let user = self
            .user_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        match &self.kind {
            AnomalyKind::SubscriptionChanged { current, incoming } => write!(
                f,
                "user subscription id changed: user id = {user}, cus_id = {}, old sub = {current}, new = {incoming}",
                self.customer_id
            ),
            AnomalyKind::EmailConflict { email, other_user } => write!(
                f,
                "email already in use: user id = {user}, cus_id = {}, sub = {}, email = {email}, owner = {other_user}",
                self.customer_id, self.subscription_id
            ),
        }
    }
}

/// A post-commit side effect.
#[async_trait]
pub trait ActivationHook: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    async fn on_activation(&self, transition: &ActivationTransition) -> Result<(), HookError>;

    async fn on_anomaly(&self, _anomaly: &Anomaly) -> Result<(), HookError> {
        Ok(())
    }
}

/// Writes transitions and anomalies to the log.
pub struct LogHook;

#[async_trait]
impl ActivationHook for LogHook {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn on_activation(&self, t: &ActivationTransition) -> Result<(), HookError> {
        info!(
            user_id = %t.user_id,
            email = %t.email,
            direction = ?t.direction,
            notice = ?t.notice(),
            new_user = t.is_new_user,
            "activation changed"
        );
        Ok(())
    }

    async fn on_anomaly(&self, anomaly: &Anomaly) -> Result<(), HookError> {
        warn!(kind = anomaly.kind_str(), "{anomaly}");
        Ok(())
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    text: &'a str,
}

/// Posts a one-line message to a chat webhook (Slack-compatible `{"text"}`).
pub struct HttpNotifyHook {
    client: Client,
    url: String,
}

impl HttpNotifyHook {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, HookError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn post(&self, text: &str) -> Result<(), HookError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&ChatMessage { text })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(HookError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl ActivationHook for HttpNotifyHook {
    fn name(&self) -> &'static str {
        "http-notify"
    }

    async fn on_activation(&self, t: &ActivationTransition) -> Result<(), HookError> {
        let text = match t.notice() {
            Notice::NewLicense => format!("New user `{}` activated, license issued.", t.email),
            Notice::Reactivated => format!("`{}` reactivated their subscription.", t.email),
            Notice::Ended => format!("`{}` subscription ended.", t.email),
        };
        self.post(&text).await
    }

    async fn on_anomaly(&self, anomaly: &Anomaly) -> Result<(), HookError> {
        self.post(&anomaly.to_string()).await
    }
}
