//! SyncSweepHandler - Runs emergency sync across every provider-linked record.
//!
//! Scheduling is left to the caller (cron, admin endpoint). One tenant's
//! failure never aborts the sweep.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::domain::subscription::SubscriptionError;
use crate::ports::SubscriptionRepository;

use super::reconcile::ReconciliationService;

/// Totals from one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub checked: usize,
    pub already_synced: usize,
    pub resynced: usize,
    pub failed: usize,
}

pub struct SyncSweepHandler {
    repository: Arc<dyn SubscriptionRepository>,
    reconciler: Arc<ReconciliationService>,
    concurrency: usize,
}

impl SyncSweepHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        reconciler: Arc<ReconciliationService>,
        concurrency: usize,
    ) -> Self {
        Self {
            repository,
            reconciler,
            concurrency: concurrency.max(1),
        }
    }

    /// # Errors
    ///
    /// Only a failure to list records is returned.
    pub async fn handle(&self) -> Result<SweepReport, SubscriptionError> {
        let records = self.repository.list_with_subscription().await?;

        let targets: Vec<_> = records
            .into_iter()
            .filter_map(|r| r.external_subscription_id.map(|sub| (r.tenant_id, sub)))
            .collect();

        let outcomes: Vec<_> = stream::iter(targets)
            .map(|(tenant_id, subscription_id)| {
                let reconciler = self.reconciler.clone();
                async move {
                    let outcome = reconciler.emergency_sync(&tenant_id, &subscription_id).await;
                    if let Err(e) = &outcome {
                        tracing::warn!(
                            tenant_id = %tenant_id,
                            subscription_id = %subscription_id,
                            error = %e,
                            "Sweep could not check subscription"
                        );
                    }
                    outcome
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = SweepReport::default();
        for outcome in outcomes {
            report.checked += 1;
            match outcome {
                Ok(o) if o.was_synced => report.already_synced += 1,
                Ok(o) if o.reconciled => report.resynced += 1,
                _ => report.failed += 1,
            }
        }

        tracing::info!(
            checked = report.checked,
            already_synced = report.already_synced,
            resynced = report.resynced,
            failed = report.failed,
            "Subscription sync sweep finished"
        );

        Ok(report)
    }
}
