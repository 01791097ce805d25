//! ReconciliationService - Rewrites local subscription state from provider truth.
//!
//! `reconcile` is best-effort: gateway and storage failures are logged and
//! reported as "not synced", never raised. Because the mapped state depends
//! only on the provider snapshot, calling it after every webhook is safe in
//! any delivery order.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{TenantId, Timestamp};
use crate::domain::subscription::{
    map_provider_state, MappedState, ProviderStatus, ProviderSubscription, StatusWrite,
    SubscriptionError, SubscriptionRecord, SubscriptionStatus, WriteSource,
};
use crate::ports::{BillingGateway, SubscriptionRepository};

/// One side of a sync comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncState {
    pub status: SubscriptionStatus,
    pub entitled_until: Option<Timestamp>,
}

/// Read-only comparison of local state against what reconciliation would write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub synced: bool,
    /// Stored state. `None` if the tenant has no record.
    pub local: Option<SyncState>,
    /// Mapped provider state. `None` if the provider status is not mapped.
    pub provider: Option<SyncState>,
    /// Raw provider status.
    pub provider_status: String,
}

/// Result of an emergency sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencySyncOutcome {
    /// Whether local state already matched before this call.
    pub was_synced: bool,
    /// Whether a reconciliation ran and succeeded.
    pub reconciled: bool,
    pub before: Option<SubscriptionRecord>,
    pub after: Option<SubscriptionRecord>,
}

/// Keeps local subscription records consistent with the billing provider.
pub struct ReconciliationService {
    repository: Arc<dyn SubscriptionRepository>,
    gateway: Arc<dyn BillingGateway>,
}

impl ReconciliationService {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        gateway: Arc<dyn BillingGateway>,
    ) -> Self {
        Self {
            repository,
            gateway,
        }
    }

    /// Fetches the provider subscription and writes the mapped state locally.
    ///
    /// Returns `true` if local state now reflects the provider. Any failure
    /// returns `false` and leaves the record untouched.
    pub async fn reconcile(&self, tenant_id: &TenantId, subscription_id: &str) -> bool {
        let subscription = match self.gateway.fetch_subscription(subscription_id).await {
            Ok(sub) => sub,
            Err(e) => {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    subscription_id = %subscription_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Reconciliation skipped: provider fetch failed"
                );
                return false;
            }
        };

        let Some(mapped) = map_with_logging(tenant_id, &subscription) else {
            return false;
        };

        let write = StatusWrite::status_only(mapped.status, WriteSource::Reconciliation)
            .with_entitled_until(mapped.entitled_until)
            .with_subscription_id(subscription.id.as_str());

        match self
            .repository
            .apply_status(tenant_id, &write, Timestamp::now())
            .await
        {
            Ok(record) => {
                tracing::info!(
                    tenant_id = %tenant_id,
                    subscription_id = %subscription_id,
                    provider_status = subscription.status.as_str(),
                    status = %record.status,
                    entitled_until = ?record.entitled_until,
                    "Subscription reconciled"
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    tenant_id = %tenant_id,
                    subscription_id = %subscription_id,
                    error = %e,
                    "Reconciliation write failed"
                );
                false
            }
        }
    }

    /// Compares local state with what `reconcile` would write, without writing.
    ///
    /// In sync means: same status, same subscription id, and the same
    /// `entitled_until` whenever the provider supplies one.
    pub async fn validate_sync(
        &self,
        tenant_id: &TenantId,
        subscription_id: &str,
    ) -> Result<SyncReport, SubscriptionError> {
        let record = self.repository.find_by_tenant(tenant_id).await?;
        let subscription = self
            .gateway
            .fetch_subscription(subscription_id)
            .await
            .map_err(|e| SubscriptionError::from_gateway(e, subscription_id))?;

        let mapped = map_provider_state(&subscription);
        let synced = match (&record, &mapped) {
            (Some(local), Some(target)) => is_in_sync(local, target, subscription_id),
            _ => false,
        };

        Ok(SyncReport {
            synced,
            local: record.as_ref().map(|r| SyncState {
                status: r.status,
                entitled_until: r.entitled_until,
            }),
            provider: mapped.map(|m| SyncState {
                status: m.status,
                entitled_until: m.entitled_until,
            }),
            provider_status: subscription.status.as_str().to_string(),
        })
    }

    /// Reconciles only if local state has drifted. Safe to call repeatedly.
    pub async fn emergency_sync(
        &self,
        tenant_id: &TenantId,
        subscription_id: &str,
    ) -> Result<EmergencySyncOutcome, SubscriptionError> {
        let report = self.validate_sync(tenant_id, subscription_id).await?;
        let before = self.repository.find_by_tenant(tenant_id).await?;

        if report.synced {
            tracing::debug!(
                tenant_id = %tenant_id,
                subscription_id = %subscription_id,
                "Emergency sync: already in sync"
            );
            return Ok(EmergencySyncOutcome {
                was_synced: true,
                reconciled: false,
                after: before.clone(),
                before,
            });
        }

        let reconciled = self.reconcile(tenant_id, subscription_id).await;
        let after = self.repository.find_by_tenant(tenant_id).await?;

        tracing::warn!(
            tenant_id = %tenant_id,
            subscription_id = %subscription_id,
            provider_status = %report.provider_status,
            before_status = ?before.as_ref().map(|r| r.status),
            before_entitled_until = ?before.as_ref().and_then(|r| r.entitled_until),
            after_status = ?after.as_ref().map(|r| r.status),
            after_entitled_until = ?after.as_ref().and_then(|r| r.entitled_until),
            reconciled,
            "Emergency sync corrected drift"
        );

        Ok(EmergencySyncOutcome {
            was_synced: false,
            reconciled,
            before,
            after,
        })
    }
}

fn map_with_logging(tenant_id: &TenantId, subscription: &ProviderSubscription) -> Option<MappedState> {
    let mapped = map_provider_state(subscription);

    match (&subscription.status, &mapped) {
        (ProviderStatus::Other(raw), _) => {
            tracing::warn!(
                tenant_id = %tenant_id,
                subscription_id = %subscription.id,
                provider_status = %raw,
                "Unmapped provider status; local record left unchanged"
            );
        }
        (ProviderStatus::Incomplete, _) => {
            tracing::warn!(
                tenant_id = %tenant_id,
                subscription_id = %subscription.id,
                "Provider status incomplete mapped to active before payment settled"
            );
        }
        _ => {}
    }

    mapped
}

fn is_in_sync(local: &SubscriptionRecord, target: &MappedState, subscription_id: &str) -> bool {
    local.status == target.status
        && local.external_subscription_id.as_deref() == Some(subscription_id)
        && target
            .entitled_until
            .map_or(true, |until| local.entitled_until == Some(until))
}
