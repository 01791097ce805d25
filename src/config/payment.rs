//! Billing provider (Stripe) configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Stripe credentials and client settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Secret API key (`sk_test_...` / `sk_live_...`)
    pub stripe_api_key: String,

    /// Webhook endpoint signing secret (`whsec_...`)
    pub stripe_webhook_secret: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timeout for every provider call, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum accepted age of a signed webhook, in seconds
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,
}

impl PaymentConfig {
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PAYMENT__STRIPE_WEBHOOK_SECRET",
            ));
        }
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://") {
            return Err(ValidationError::InvalidProviderUrl);
        }
        if self.request_timeout_secs == 0 || self.webhook_tolerance_secs <= 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            stripe_webhook_secret: String::new(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
            webhook_tolerance_secs: default_webhook_tolerance(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_webhook_tolerance() -> i64 {
    300
}
