//! Stripe wire types.
//!
//! The event envelope and the object shapes this crate reads, both from
//! webhook payloads and from API responses. Only the fields reconciliation
//! needs are captured; everything else Stripe sends is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::TenantId;

use super::billing_event::{BillingEvent, BillingEventEnvelope, CheckoutCompleted, InvoiceReference};
use super::webhook_errors::WebhookError;
use super::{ProviderCheckoutSession, ProviderCustomer, ProviderStatus, ProviderSubscription};

/// Metadata key carrying the owning tenant on customers and checkout sessions.
pub const TENANT_METADATA_KEY: &str = "tenant_id";

/// Stripe webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "customer.subscription.updated").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,

    #[serde(default)]
    pub api_version: Option<String>,
}

/// Container for the object that triggered the event.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// A reference Stripe may send either as a bare id or as an expanded object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) | Expandable::Object { id } => id,
        }
    }

    pub fn into_id(self) -> String {
        match self {
            Expandable::Id(id) | Expandable::Object { id } => id,
        }
    }
}

/// Stripe list envelope (`{"object": "list", "data": [...]}`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// Stripe Subscription object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscriptionObject {
    pub id: String,
    pub customer: Expandable,
    pub status: String,
    /// Top-level on older API versions; per item on newer ones.
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub ended_at: Option<i64>,
    #[serde(default)]
    pub canceled_at: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub schedule: Option<Expandable>,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeSubscriptionItems {
    #[serde(default)]
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscriptionItem {
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

impl From<StripeSubscriptionObject> for ProviderSubscription {
    fn from(sub: StripeSubscriptionObject) -> Self {
        let current_period_end = sub.current_period_end.or_else(|| {
            sub.items
                .data
                .iter()
                .filter_map(|item| item.current_period_end)
                .max()
        });

        ProviderSubscription {
            id: sub.id,
            customer_id: sub.customer.into_id(),
            status: ProviderStatus::from_provider(&sub.status),
            current_period_end,
            ended_at: sub.ended_at,
            canceled_at: sub.canceled_at,
            cancel_at_period_end: sub.cancel_at_period_end,
            schedule_id: sub.schedule.map(Expandable::into_id),
        }
    }
}

/// Stripe Customer object. Deleted customers carry only `id` and `deleted`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCustomerObject {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub deleted: bool,
}

impl From<StripeCustomerObject> for ProviderCustomer {
    fn from(customer: StripeCustomerObject) -> Self {
        ProviderCustomer {
            tenant_id: tenant_from_metadata(&customer.metadata),
            id: customer.id,
        }
    }
}

/// Stripe Checkout Session object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<Expandable>,
    #[serde(default)]
    pub subscription: Option<Expandable>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub created: i64,
}

impl StripeCheckoutSessionObject {
    /// Tenant tag from metadata, falling back to `client_reference_id`.
    pub fn tenant_id(&self) -> Option<TenantId> {
        tenant_from_metadata(&self.metadata).or_else(|| {
            self.client_reference_id
                .as_deref()
                .and_then(|id| TenantId::new(id).ok())
        })
    }
}

impl From<StripeCheckoutSessionObject> for ProviderCheckoutSession {
    fn from(session: StripeCheckoutSessionObject) -> Self {
        ProviderCheckoutSession {
            tenant_id: session.tenant_id(),
            id: session.id,
            customer_id: session.customer.map(Expandable::into_id),
            subscription_id: session.subscription.map(Expandable::into_id),
            created: session.created,
        }
    }
}

/// Stripe Invoice object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeInvoiceObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<Expandable>,
    /// Top-level on older API versions.
    #[serde(default)]
    pub subscription: Option<Expandable>,
    /// Newer API versions nest the subscription under `parent`.
    #[serde(default)]
    pub parent: Option<StripeInvoiceParent>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeInvoiceParent {
    #[serde(default)]
    pub subscription_details: Option<StripeInvoiceSubscriptionDetails>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeInvoiceSubscriptionDetails {
    #[serde(default)]
    pub subscription: Option<Expandable>,
}

impl From<StripeInvoiceObject> for InvoiceReference {
    fn from(invoice: StripeInvoiceObject) -> Self {
        let nested = invoice
            .parent
            .and_then(|p| p.subscription_details)
            .and_then(|d| d.subscription);

        InvoiceReference {
            invoice_id: invoice.id,
            customer_id: invoice.customer.map(Expandable::into_id),
            subscription_id: invoice.subscription.or(nested).map(Expandable::into_id),
        }
    }
}

fn tenant_from_metadata(metadata: &HashMap<String, String>) -> Option<TenantId> {
    metadata
        .get(TENANT_METADATA_KEY)
        .and_then(|id| TenantId::new(id.as_str()).ok())
}

impl StripeEvent {
    /// Converts the raw envelope into a typed [`BillingEventEnvelope`].
    ///
    /// Unknown event types become [`BillingEvent::Unhandled`]. A known event
    /// type whose object does not deserialize is a `ParseError`.
    pub fn into_envelope(self) -> Result<BillingEventEnvelope, WebhookError> {
        let event = match self.event_type.as_str() {
            "checkout.session.completed" => {
                let session: StripeCheckoutSessionObject = self.object()?;
                BillingEvent::CheckoutCompleted(CheckoutCompleted {
                    tenant_id: session.tenant_id(),
                    session_id: session.id,
                    customer_id: session.customer.map(Expandable::into_id),
                    subscription_id: session.subscription.map(Expandable::into_id),
                })
            }
            "customer.subscription.created" => {
                BillingEvent::SubscriptionCreated(self.subscription()?)
            }
            "customer.subscription.updated" => {
                BillingEvent::SubscriptionUpdated(self.subscription()?)
            }
            "customer.subscription.deleted" => {
                BillingEvent::SubscriptionDeleted(self.subscription()?)
            }
            "invoice.paid" | "invoice.payment_succeeded" => {
                BillingEvent::InvoicePaid(self.object::<StripeInvoiceObject>()?.into())
            }
            "invoice.payment_failed" => {
                BillingEvent::InvoicePaymentFailed(self.object::<StripeInvoiceObject>()?.into())
            }
            other => BillingEvent::Unhandled {
                event_type: other.to_string(),
            },
        };

        Ok(BillingEventEnvelope {
            id: self.id,
            created: self.created,
            livemode: self.livemode,
            event,
        })
    }

    fn object<T: serde::de::DeserializeOwned>(&self) -> Result<T, WebhookError> {
        serde_json::from_value(self.data.object.clone()).map_err(|e| {
            WebhookError::ParseError(format!("{} object: {}", self.event_type, e))
        })
    }

    fn subscription(&self) -> Result<ProviderSubscription, WebhookError> {
        Ok(self.object::<StripeSubscriptionObject>()?.into())
    }
}
