//! Subscription lifecycle command and query handlers.

mod cancel_subscription;
mod check_entitlement;
mod handle_billing_webhook;
mod override_subscription;
mod ownership;
mod reconcile;
mod start_trial;
mod sync_sweep;

pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use check_entitlement::{
    CheckEntitlementHandler, CheckEntitlementQuery, CheckEntitlementResult,
};
pub use handle_billing_webhook::{
    HandleBillingWebhookCommand, HandleBillingWebhookHandler, WebhookOutcome,
};
pub use ownership::verify_subscription_owner;
pub use override_subscription::{OverrideSubscriptionCommand, OverrideSubscriptionHandler};
pub use reconcile::{EmergencySyncOutcome, ReconciliationService, SyncReport, SyncState};
pub use start_trial::{StartTrialCommand, StartTrialHandler, StartTrialResult};
pub use sync_sweep::{SweepReport, SyncSweepHandler};
