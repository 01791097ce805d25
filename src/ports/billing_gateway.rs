//! Billing gateway port for the external subscription provider.
//!
//! A pure read/command proxy: no method here touches local state. Every call
//! is remote, bounded by a timeout, and reports `NotFound` separately from
//! transient provider faults so callers can choose give-up versus retry.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::TenantId;
use crate::domain::subscription::{
    ProviderCheckoutSession, ProviderCustomer, ProviderSubscription, SubscriptionError,
};

/// Port for the billing provider.
#[async_trait]
pub trait BillingGateway: Send + Sync {
    /// Fetches the provider's current view of a subscription.
    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, GatewayError>;

    /// Revokes renewal. The current paid period is left intact.
    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, GatewayError>;

    /// Fetches a customer and its tenant tag.
    async fn fetch_customer(&self, customer_id: &str) -> Result<ProviderCustomer, GatewayError>;

    /// Lists the customer's most recent checkout sessions, newest first.
    async fn list_recent_checkout_sessions(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<ProviderCheckoutSession>, GatewayError>;

    /// Writes the tenant tag onto the provider customer. Idempotent.
    async fn tag_customer(&self, customer_id: &str, tenant_id: &TenantId)
        -> Result<(), GatewayError>;
}

/// Errors returned by the billing gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The provider has no such object. Never retried automatically.
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Provider-side fault or rejected request.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        /// Provider's own error code, if it sent one.
        provider_code: Option<String>,
        retryable: bool,
    },

    /// The call did not complete within the configured timeout.
    #[error("provider request timed out")]
    Timeout,
}

impl GatewayError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        GatewayError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn provider(message: impl Into<String>, retryable: bool) -> Self {
        GatewayError::Provider {
            message: message.into(),
            provider_code: None,
            retryable,
        }
    }

    /// Attaches the provider's error code.
    pub fn with_provider_code(self, code: impl Into<String>) -> Self {
        match self {
            GatewayError::Provider {
                message, retryable, ..
            } => GatewayError::Provider {
                message,
                provider_code: Some(code.into()),
                retryable,
            },
            other => other,
        }
    }

    /// True if the same call may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::NotFound { .. } => false,
            GatewayError::Provider { retryable, .. } => *retryable,
            GatewayError::Timeout => true,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }
}

impl SubscriptionError {
    /// Converts a gateway failure for a call concerning `subscription_id`.
    pub fn from_gateway(err: GatewayError, subscription_id: &str) -> Self {
        match err {
            GatewayError::NotFound { .. } => SubscriptionError::not_found(subscription_id),
            GatewayError::Provider {
                message, retryable, ..
            } => SubscriptionError::provider(message, retryable),
            GatewayError::Timeout => SubscriptionError::provider("request timed out", true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_by_kind() {
        assert!(!GatewayError::not_found("subscription sub_1").is_retryable());
        assert!(GatewayError::Timeout.is_retryable());
        assert!(GatewayError::provider("503", true).is_retryable());
        assert!(!GatewayError::provider("invalid request", false).is_retryable());
    }

    #[test]
    fn provider_code_attaches_only_to_provider_errors() {
        let err = GatewayError::provider("rate limited", true).with_provider_code("rate_limit");
        assert!(matches!(
            err,
            GatewayError::Provider { provider_code: Some(ref c), .. } if c == "rate_limit"
        ));

        assert_eq!(
            GatewayError::Timeout.with_provider_code("x"),
            GatewayError::Timeout
        );
    }

    #[test]
    fn not_found_converts_to_subscription_not_found() {
        let err = SubscriptionError::from_gateway(GatewayError::not_found("subscription"), "sub_9");
        assert_eq!(err, SubscriptionError::not_found("sub_9"));
    }

    #[test]
    fn timeout_converts_to_retryable_provider_error() {
        let err = SubscriptionError::from_gateway(GatewayError::Timeout, "sub_9");
        assert!(matches!(err, SubscriptionError::Provider { retryable: true, .. }));
    }
}
