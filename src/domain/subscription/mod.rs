//! Subscription domain - per-tenant billing state and the rules that derive it.
//!
//! # Module Structure
//!
//! - `status` - Local lifecycle status and write attribution
//! - `record` - The per-tenant subscription record
//! - `provider` - Provider-side subscription/customer/session snapshots
//! - `status_mapping` - Provider status to local status table
//! - `entitlement` - Pure access decision
//! - `billing_event` - Closed set of provider events
//! - `stripe_event` - Stripe wire types
//! - `webhook_verifier` - Stripe signature verification
//! - `errors`, `webhook_errors` - Error types

mod billing_event;
mod entitlement;
mod errors;
mod provider;
mod record;
mod status;
mod status_mapping;
pub mod stripe_event;
mod webhook_errors;
mod webhook_verifier;

pub use billing_event::{BillingEvent, BillingEventEnvelope, CheckoutCompleted, InvoiceReference};
pub use entitlement::is_entitled;
pub use errors::SubscriptionError;
pub use provider::{ProviderCheckoutSession, ProviderCustomer, ProviderStatus, ProviderSubscription};
pub use record::{AdminOverride, StatusWrite, SubscriptionRecord};
pub use status::{SubscriptionStatus, WriteSource};
pub use status_mapping::{map_provider_state, MappedState};
pub use stripe_event::{StripeEvent, TENANT_METADATA_KEY};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{sign_payload, SignatureHeader, StripeWebhookVerifier, DEFAULT_TOLERANCE_SECS};
