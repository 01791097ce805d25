//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Commands (trial, cancel, override, webhook) write; queries (entitlement,
//! sync report) only read.

pub mod handlers;

pub use handlers::subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
    CheckEntitlementHandler, CheckEntitlementQuery, CheckEntitlementResult,
    EmergencySyncOutcome, HandleBillingWebhookCommand, HandleBillingWebhookHandler,
    OverrideSubscriptionCommand, OverrideSubscriptionHandler, ReconciliationService,
    StartTrialCommand, StartTrialHandler, StartTrialResult, SweepReport, SyncReport, SyncState,
    SyncSweepHandler, WebhookOutcome, verify_subscription_owner,
};
