//! Provider-side snapshots consumed by reconciliation.
//!
//! These are the fields this crate reads from the billing provider's
//! subscription, customer and checkout session objects. They are plain data;
//! fetching them is the gateway's job.

use crate::domain::foundation::TenantId;

/// Subscription status as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Active,
    PastDue,
    Incomplete,
    Canceled,
    /// Any status this crate does not map (`trialing`, `unpaid`, `paused`, ...).
    Other(String),
}

impl ProviderStatus {
    /// Parses the provider's status string.
    pub fn from_provider(raw: &str) -> Self {
        match raw {
            "active" => ProviderStatus::Active,
            "past_due" => ProviderStatus::PastDue,
            "incomplete" => ProviderStatus::Incomplete,
            "canceled" => ProviderStatus::Canceled,
            other => ProviderStatus::Other(other.to_string()),
        }
    }

    /// The provider's string form.
    pub fn as_str(&self) -> &str {
        match self {
            ProviderStatus::Active => "active",
            ProviderStatus::PastDue => "past_due",
            ProviderStatus::Incomplete => "incomplete",
            ProviderStatus::Canceled => "canceled",
            ProviderStatus::Other(raw) => raw,
        }
    }
}

/// Provider subscription object, reduced to the fields reconciliation reads.
///
/// Times are epoch seconds, as the provider sends them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSubscription {
    pub id: String,
    pub customer_id: String,
    pub status: ProviderStatus,
    pub current_period_end: Option<i64>,
    pub ended_at: Option<i64>,
    pub canceled_at: Option<i64>,
    /// True once renewal has been revoked (non-renewing cancellation).
    pub cancel_at_period_end: bool,
    pub schedule_id: Option<String>,
}

/// Provider customer object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCustomer {
    pub id: String,
    /// `metadata.tenant_id`, absent until the customer has been tagged.
    pub tenant_id: Option<TenantId>,
}

/// Provider checkout session summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCheckoutSession {
    pub id: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    /// `metadata.tenant_id` set when the session was opened.
    pub tenant_id: Option<TenantId>,
    pub created: i64,
}
