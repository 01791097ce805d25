//! Subscription ownership check shared by tenant-initiated operations.

use crate::domain::subscription::{SubscriptionError, SubscriptionRecord};
use crate::ports::BillingGateway;

/// Confirms that `subscription_id` belongs to the tenant owning `record`.
///
/// A stored subscription id must match exactly. Without one (webhooks may
/// still be in flight) the provider subscription's customer must be the
/// tenant's stored customer. Any mismatch is reported as `NotFound` so a
/// caller cannot probe other tenants' subscriptions.
pub async fn verify_subscription_owner(
    gateway: &dyn BillingGateway,
    record: &SubscriptionRecord,
    subscription_id: &str,
) -> Result<(), SubscriptionError> {
    match record.external_subscription_id.as_deref() {
        Some(owned) if owned == subscription_id => Ok(()),
        Some(_) => {
            tracing::warn!(
                tenant_id = %record.tenant_id,
                subscription_id = %subscription_id,
                "Subscription does not belong to tenant"
            );
            Err(SubscriptionError::not_found(subscription_id))
        }
        None => {
            let provider = gateway
                .fetch_subscription(subscription_id)
                .await
                .map_err(|e| SubscriptionError::from_gateway(e, subscription_id))?;
            if record.external_customer_id.as_deref() != Some(provider.customer_id.as_str()) {
                tracing::warn!(
                    tenant_id = %record.tenant_id,
                    subscription_id = %subscription_id,
                    "Subscription customer does not match tenant"
                );
                return Err(SubscriptionError::not_found(subscription_id));
            }
            Ok(())
        }
    }
}
