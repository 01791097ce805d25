//! Axum router for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_subscription, get_entitlement, get_sync_report, override_subscription,
    receive_stripe_webhook, run_emergency_sync, run_sync_sweep, start_trial, BillingAppState,
};

/// Tenant endpoints. Every route requires `X-Tenant-Id`.
///
/// - `GET /entitlement` - Current access decision
/// - `POST /trial` - Start the one-time trial
/// - `POST /cancel` - Cancel renewal (requires `confirmed: true`)
/// - `GET /sync` - Compare local state with the provider
/// - `POST /sync` - Repair drift from the provider
pub fn subscription_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/entitlement", get(get_entitlement))
        .route("/trial", post(start_trial))
        .route("/cancel", post(cancel_subscription))
        .route("/sync", get(get_sync_report).post(run_emergency_sync))
}

/// Operator endpoints; authorization is enforced in front of this service.
pub fn admin_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/override", post(override_subscription))
        .route("/sweep", post(run_sync_sweep))
}

/// Provider webhooks. No tenant header; signature verified instead.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/stripe", post(receive_stripe_webhook))
}

/// The complete billing router.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/subscription", subscription_routes())
        .nest("/admin/subscription", admin_routes())
        .nest("/webhooks", webhook_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::adapters::stripe::MockBillingGateway;
    use crate::config::BillingConfig;
    use crate::domain::subscription::StripeWebhookVerifier;

    fn test_state() -> BillingAppState {
        BillingAppState::new(
            Arc::new(InMemorySubscriptionRepository::new()),
            Arc::new(MockBillingGateway::new()),
            StripeWebhookVerifier::new("whsec_test"),
            BillingConfig::default(),
        )
    }

    #[test]
    fn billing_router_builds_with_state() {
        let _: Router<()> = billing_router().with_state(test_state());
    }
}
