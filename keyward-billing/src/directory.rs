//! Customer profile lookup against the payment provider.

use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// The provider's authoritative view of a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Resolves customer ids to profiles.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn fetch_customer(&self, customer_id: &str) -> Result<Customer, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct CustomerResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// [`CustomerDirectory`] backed by the Stripe REST API.
pub struct StripeCustomerDirectory {
    client: Client,
    api_key: String,
    base_url: String,
}

impl StripeCustomerDirectory {
    /// Creates a client with its own request timeout.
    ///
    /// The timeout is independent of the inbound webhook deadline: the
    /// delivery has already been acknowledged when lookups run.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CustomerDirectory for StripeCustomerDirectory {
    async fn fetch_customer(&self, customer_id: &str) -> Result<Customer, ProviderError> {
        let url = format!("{}/v1/customers/{}", self.base_url, customer_id);
        debug!(customer_id, "fetching customer");

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(classify)?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Err(ProviderError::NotFound(customer_id.to_string())),
            status if !status.is_success() => return Err(ProviderError::Status(status.as_u16())),
            _ => {}
        }

        let body: CustomerResponse = resp.json().await.map_err(classify)?;
        Ok(Customer {
            id: body.id,
            email: body.email.unwrap_or_default(),
            name: body.name.unwrap_or_default(),
        })
    }
}

fn classify(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Http(err)
    }
}
