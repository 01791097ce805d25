//! CancelSubscriptionHandler - Tenant-initiated cancellation.
//!
//! Cancellation revokes renewal only. The tenant keeps access through the
//! period already paid for, so the local write changes status and never
//! touches `entitled_until`.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{TenantId, Timestamp};
use crate::domain::subscription::{
    StatusWrite, SubscriptionError, SubscriptionStatus, WriteSource,
};
use crate::ports::{BillingGateway, SubscriptionRepository};

use super::ownership::verify_subscription_owner;

/// Command to cancel a tenant's subscription.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub tenant_id: TenantId,
    pub subscription_id: String,
    /// Must be `true`; the caller confirms cancellation explicitly.
    pub confirmed: bool,
}

/// Result of a successful cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelSubscriptionResult {
    pub subscription_id: String,
    pub status: SubscriptionStatus,
    /// When the provider recorded the cancellation.
    pub canceled_at: Option<Timestamp>,
    /// Access continues through this instant.
    pub current_period_end: Option<Timestamp>,
}

/// Handler for tenant-initiated cancellation.
pub struct CancelSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    gateway: Arc<dyn BillingGateway>,
}

impl CancelSubscriptionHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        gateway: Arc<dyn BillingGateway>,
    ) -> Self {
        Self {
            repository,
            gateway,
        }
    }

    /// Cancels at the provider, then records `canceled` locally.
    ///
    /// # Errors
    ///
    /// - `NotConfirmed` if `confirmed` is false
    /// - `Validation` if the subscription id is blank
    /// - `NotFoundForTenant` if the tenant has no record
    /// - `NotFound` if the subscription does not belong to the tenant or the
    ///   provider has no such subscription
    /// - `Provider` if the provider call fails; nothing is written locally
    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, SubscriptionError> {
        if !cmd.confirmed {
            return Err(SubscriptionError::not_confirmed());
        }
        let subscription_id = cmd.subscription_id.trim();
        if subscription_id.is_empty() {
            return Err(SubscriptionError::validation(
                "subscription_id",
                "cannot be empty",
            ));
        }

        let record = self
            .repository
            .find_by_tenant(&cmd.tenant_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found_for_tenant(cmd.tenant_id.clone()))?;

        verify_subscription_owner(self.gateway.as_ref(), &record, subscription_id).await?;

        let canceled = self
            .gateway
            .cancel_subscription(subscription_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    tenant_id = %cmd.tenant_id,
                    subscription_id = %subscription_id,
                    error = %e,
                    "Provider cancellation failed"
                );
                SubscriptionError::from_gateway(e, subscription_id)
            })?;

        let write = StatusWrite::status_only(SubscriptionStatus::Canceled, WriteSource::Cancellation)
            .with_subscription_id(subscription_id);
        let updated = self
            .repository
            .apply_status(&cmd.tenant_id, &write, Timestamp::now())
            .await?;

        tracing::info!(
            tenant_id = %cmd.tenant_id,
            subscription_id = %subscription_id,
            entitled_until = ?updated.entitled_until,
            "Subscription canceled"
        );

        Ok(CancelSubscriptionResult {
            subscription_id: subscription_id.to_string(),
            status: updated.status,
            canceled_at: canceled.canceled_at.and_then(Timestamp::from_unix_secs),
            current_period_end: canceled.current_period_end.and_then(Timestamp::from_unix_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::adapters::stripe::MockBillingGateway;
    use crate::domain::subscription::{ProviderStatus, ProviderSubscription};
    use crate::ports::GatewayError;

    const PERIOD_END: i64 = 1_900_000_000;

    fn tenant() -> TenantId {
        TenantId::new("tenant-1").unwrap()
    }

    fn provider_sub() -> ProviderSubscription {
        ProviderSubscription {
            id: "sub_1".to_string(),
            customer_id: "cus_1".to_string(),
            status: ProviderStatus::Active,
            current_period_end: Some(PERIOD_END),
            ended_at: None,
            canceled_at: None,
            cancel_at_period_end: false,
            schedule_id: None,
        }
    }

    fn command(confirmed: bool) -> CancelSubscriptionCommand {
        CancelSubscriptionCommand {
            tenant_id: tenant(),
            subscription_id: "sub_1".to_string(),
            confirmed,
        }
    }

    async fn setup_active() -> (
        Arc<InMemorySubscriptionRepository>,
        MockBillingGateway,
        CancelSubscriptionHandler,
    ) {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let gateway = MockBillingGateway::new();
        gateway.add_subscription(provider_sub());
        repo.attach_customer(&tenant(), "cus_1", Timestamp::now())
            .await
            .unwrap();
        repo.apply_status(
            &tenant(),
            &StatusWrite::status_only(SubscriptionStatus::Active, WriteSource::Reconciliation)
                .with_subscription_id("sub_1")
                .with_entitled_until(Timestamp::from_unix_secs(PERIOD_END)),
            Timestamp::now(),
        )
        .await
        .unwrap();
        let handler = CancelSubscriptionHandler::new(repo.clone(), Arc::new(gateway.clone()));
        (repo, gateway, handler)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn cancel_keeps_entitlement_through_period_end() {
        let (repo, gateway, handler) = setup_active().await;

        let result = handler.handle(command(true)).await.unwrap();

        assert_eq!(result.status, SubscriptionStatus::Canceled);
        assert_eq!(result.current_period_end, Timestamp::from_unix_secs(PERIOD_END));
        assert!(result.canceled_at.is_some());

        let record = repo.find_by_tenant(&tenant()).await.unwrap().unwrap();
        assert_eq!(record.status, SubscriptionStatus::Canceled);
        assert_eq!(record.entitled_until, Timestamp::from_unix_secs(PERIOD_END));
        assert_eq!(record.last_write_source, Some(WriteSource::Cancellation));
        assert!(gateway.subscription("sub_1").unwrap().cancel_at_period_end);
    }

    #[tokio::test]
    async fn cancel_before_local_id_known_checks_customer() {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let gateway = MockBillingGateway::new();
        gateway.add_subscription(provider_sub());
        repo.attach_customer(&tenant(), "cus_1", Timestamp::now())
            .await
            .unwrap();
        let handler = CancelSubscriptionHandler::new(repo.clone(), Arc::new(gateway.clone()));

        let result = handler.handle(command(true)).await.unwrap();

        assert_eq!(result.status, SubscriptionStatus::Canceled);
        let record = repo.find_by_tenant(&tenant()).await.unwrap().unwrap();
        assert_eq!(record.external_subscription_id.as_deref(), Some("sub_1"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Rejections
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unconfirmed_cancel_makes_no_calls() {
        let (repo, gateway, handler) = setup_active().await;

        let err = handler.handle(command(false)).await.unwrap_err();

        assert_eq!(err, SubscriptionError::NotConfirmed);
        assert_eq!(gateway.call_count("cancel_subscription"), 0);
        assert_eq!(
            repo.find_by_tenant(&tenant()).await.unwrap().unwrap().status,
            SubscriptionStatus::Active
        );
    }

    #[tokio::test]
    async fn foreign_subscription_is_not_found() {
        let (_repo, gateway, handler) = setup_active().await;

        let err = handler
            .handle(CancelSubscriptionCommand {
                subscription_id: "sub_other".to_string(),
                ..command(true)
            })
            .await
            .unwrap_err();

        assert_eq!(err, SubscriptionError::not_found("sub_other"));
        assert_eq!(gateway.call_count("cancel_subscription"), 0);
    }

    #[tokio::test]
    async fn customer_mismatch_is_not_found() {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let gateway = MockBillingGateway::new();
        gateway.add_subscription(provider_sub());
        repo.attach_customer(&tenant(), "cus_other", Timestamp::now())
            .await
            .unwrap();
        let handler = CancelSubscriptionHandler::new(repo, Arc::new(gateway.clone()));

        let err = handler.handle(command(true)).await.unwrap_err();

        assert_eq!(err, SubscriptionError::not_found("sub_1"));
        assert_eq!(gateway.call_count("cancel_subscription"), 0);
    }

    #[tokio::test]
    async fn missing_record_is_not_found_for_tenant() {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let handler = CancelSubscriptionHandler::new(repo, Arc::new(MockBillingGateway::new()));

        let err = handler.handle(command(true)).await.unwrap_err();
        assert_eq!(err, SubscriptionError::NotFoundForTenant(tenant()));
    }

    #[tokio::test]
    async fn provider_failure_leaves_local_state() {
        let (repo, gateway, handler) = setup_active().await;
        gateway.fail_method("cancel_subscription", GatewayError::provider("503", true));

        let err = handler.handle(command(true)).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::Provider { retryable: true, .. }));
        assert_eq!(
            repo.find_by_tenant(&tenant()).await.unwrap().unwrap().status,
            SubscriptionStatus::Active
        );
    }
}
