//! Stripe billing gateway adapter.
//!
//! Implements [`BillingGateway`] over the Stripe REST API. Every request runs
//! on a `reqwest::Client` built with the configured timeout.
//!
//! # Error mapping
//!
//! | Stripe response | GatewayError |
//! |---|---|
//! | 404, or a deleted customer | `NotFound` |
//! | 429, 5xx | `Provider { retryable: true }` |
//! | other 4xx | `Provider { retryable: false }` |
//! | client timeout | `Timeout` |
//! | connection failure | `Provider { retryable: true }` |

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::domain::foundation::TenantId;
use crate::domain::subscription::stripe_event::{
    StripeCheckoutSessionObject, StripeCustomerObject, StripeList, StripeSubscriptionObject,
};
use crate::domain::subscription::{
    ProviderCheckoutSession, ProviderCustomer, ProviderSubscription, TENANT_METADATA_KEY,
};
use crate::ports::{BillingGateway, GatewayError};

/// Stripe's upper bound for list `limit`.
const MAX_LIST_LIMIT: usize = 100;

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeGatewayConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Upper bound on every request.
    request_timeout: Duration,
}

impl StripeGatewayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn timeout(&self) -> Duration {
        self.request_timeout
    }
}

/// Stripe implementation of the billing gateway port.
pub struct StripeBillingGateway {
    config: StripeGatewayConfig,
    http_client: reqwest::Client,
}

impl StripeBillingGateway {
    /// Builds the gateway and its HTTP client.
    pub fn new(config: StripeGatewayConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::provider(format!("HTTP client setup failed: {}", e), false))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.api_base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        resource: &str,
    ) -> Result<T, GatewayError> {
        let response = request
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::not_found(resource));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout
            } else {
                GatewayError::provider(format!("Failed to parse Stripe response: {}", e), false)
            }
        })
    }
}

/// Stripe error envelope: `{"error": {"type", "code", "message"}}`.
#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::provider(format!("Stripe request failed: {}", err), true)
    }
}

fn api_error(status: reqwest::StatusCode, body: &str) -> GatewayError {
    let retryable =
        status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error();

    match serde_json::from_str::<StripeErrorBody>(body) {
        Ok(parsed) => {
            let message = parsed
                .error
                .message
                .unwrap_or_else(|| format!("Stripe API error ({})", status));
            let err = GatewayError::provider(message, retryable);
            match parsed.error.code {
                Some(code) => err.with_provider_code(code),
                None => err,
            }
        }
        Err(_) => GatewayError::provider(format!("Stripe API error ({}): {}", status, body), retryable),
    }
}

#[async_trait]
impl BillingGateway for StripeBillingGateway {
    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, GatewayError> {
        let request = self
            .http_client
            .get(self.url(&format!("subscriptions/{}", subscription_id)));
        let sub: StripeSubscriptionObject = self
            .send(request, &format!("subscription {}", subscription_id))
            .await?;
        Ok(sub.into())
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, GatewayError> {
        // Non-renewing: the subscription stays active until period end.
        let request = self
            .http_client
            .post(self.url(&format!("subscriptions/{}", subscription_id)))
            .form(&[("cancel_at_period_end", "true")]);
        let sub: StripeSubscriptionObject = self
            .send(request, &format!("subscription {}", subscription_id))
            .await?;

        tracing::info!(
            subscription_id = %subscription_id,
            cancel_at_period_end = sub.cancel_at_period_end,
            "Stripe subscription set to cancel at period end"
        );
        Ok(sub.into())
    }

    async fn fetch_customer(&self, customer_id: &str) -> Result<ProviderCustomer, GatewayError> {
        let resource = format!("customer {}", customer_id);
        let request = self
            .http_client
            .get(self.url(&format!("customers/{}", customer_id)));
        let customer: StripeCustomerObject = self.send(request, &resource).await?;

        if customer.deleted {
            return Err(GatewayError::not_found(resource));
        }
        Ok(customer.into())
    }

    async fn list_recent_checkout_sessions(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<ProviderCheckoutSession>, GatewayError> {
        let limit = limit.clamp(1, MAX_LIST_LIMIT).to_string();
        let request = self.http_client.get(self.url("checkout/sessions")).query(&[
            ("customer", customer_id),
            ("limit", limit.as_str()),
        ]);
        let list: StripeList<StripeCheckoutSessionObject> = self
            .send(request, &format!("checkout sessions for {}", customer_id))
            .await?;

        Ok(list.data.into_iter().map(Into::into).collect())
    }

    async fn tag_customer(
        &self,
        customer_id: &str,
        tenant_id: &TenantId,
    ) -> Result<(), GatewayError> {
        let key = format!("metadata[{}]", TENANT_METADATA_KEY);
        let request = self
            .http_client
            .post(self.url(&format!("customers/{}", customer_id)))
            .form(&[(key.as_str(), tenant_id.as_str())]);
        let _: StripeCustomerObject = self
            .send(request, &format!("customer {}", customer_id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = StripeGatewayConfig::new("sk_test_123");
        assert_eq!(config.base_url(), "https://api.stripe.com");
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let gateway =
            StripeBillingGateway::new(StripeGatewayConfig::new("sk_test").with_base_url("http://localhost:12111/"))
                .unwrap();
        assert_eq!(
            gateway.url("subscriptions/sub_1"),
            "http://localhost:12111/v1/subscriptions/sub_1"
        );
    }

    #[test]
    fn rate_limit_is_retryable_with_code() {
        let body = r#"{"error":{"type":"invalid_request_error","code":"rate_limit","message":"Too many requests"}}"#;
        let err = api_error(reqwest::StatusCode::TOO_MANY_REQUESTS, body);

        assert!(err.is_retryable());
        assert!(matches!(
            err,
            GatewayError::Provider { provider_code: Some(ref c), .. } if c == "rate_limit"
        ));
    }

    #[test]
    fn bad_request_is_not_retryable() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"No such price"}}"#;
        let err = api_error(reqwest::StatusCode::BAD_REQUEST, body);
        assert!(!err.is_retryable());
    }

    #[test]
    fn unparseable_server_error_is_retryable() {
        let err = api_error(reqwest::StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn unreachable_provider_surfaces_retryable_error() {
        let gateway = StripeBillingGateway::new(
            StripeGatewayConfig::new("sk_test")
                .with_base_url("http://127.0.0.1:9")
                .with_timeout(Duration::from_millis(500)),
        )
        .unwrap();

        let err = gateway.fetch_subscription("sub_1").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(!err.is_not_found());
    }
}
