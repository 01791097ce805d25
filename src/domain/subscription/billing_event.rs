//! Typed billing provider events.
//!
//! Every delivery is parsed into exactly one [`BillingEvent`] variant, and the
//! dispatcher matches on it exhaustively. Adding a variant fails the build until
//! it has a handler.

use crate::domain::foundation::TenantId;

use super::ProviderSubscription;

/// Verified provider event with its delivery metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingEventEnvelope {
    /// Provider event id (`evt_...`). Used for logging only; handlers are
    /// idempotent by subscription id, not by event id.
    pub id: String,
    /// Provider event creation time, epoch seconds.
    pub created: i64,
    pub livemode: bool,
    pub event: BillingEvent,
}

/// The closed set of provider events this crate reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    CheckoutCompleted(CheckoutCompleted),
    SubscriptionCreated(ProviderSubscription),
    SubscriptionUpdated(ProviderSubscription),
    SubscriptionDeleted(ProviderSubscription),
    InvoicePaid(InvoiceReference),
    InvoicePaymentFailed(InvoiceReference),
    /// Any event type not listed above. Acknowledged, never processed.
    Unhandled { event_type: String },
}

impl BillingEvent {
    /// Short name for structured logs.
    pub fn kind(&self) -> &str {
        match self {
            BillingEvent::CheckoutCompleted(_) => "checkout_completed",
            BillingEvent::SubscriptionCreated(_) => "subscription_created",
            BillingEvent::SubscriptionUpdated(_) => "subscription_updated",
            BillingEvent::SubscriptionDeleted(_) => "subscription_deleted",
            BillingEvent::InvoicePaid(_) => "invoice_paid",
            BillingEvent::InvoicePaymentFailed(_) => "invoice_payment_failed",
            BillingEvent::Unhandled { event_type } => event_type,
        }
    }
}

/// A completed checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCompleted {
    pub session_id: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    /// Tenant tag set when the session was opened.
    pub tenant_id: Option<TenantId>,
}

/// The parts of an invoice that point back at a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceReference {
    pub invoice_id: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
}
