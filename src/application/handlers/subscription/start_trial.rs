//! StartTrialHandler - Grants a tenant's one-time trial.

use std::sync::Arc;

use crate::domain::foundation::{TenantId, Timestamp};
use crate::domain::subscription::{SubscriptionError, SubscriptionRecord};
use crate::ports::SubscriptionRepository;

/// Command to start a trial.
#[derive(Debug, Clone)]
pub struct StartTrialCommand {
    pub tenant_id: TenantId,
}

/// Result of a trial start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTrialResult {
    /// `false` if the tenant was not eligible; the record is unchanged.
    pub started: bool,
    pub record: SubscriptionRecord,
}

/// Handler for trial starts.
pub struct StartTrialHandler {
    repository: Arc<dyn SubscriptionRepository>,
    trial_days: i64,
}

impl StartTrialHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>, trial_days: i64) -> Self {
        Self {
            repository,
            trial_days,
        }
    }

    pub async fn handle(
        &self,
        cmd: StartTrialCommand,
    ) -> Result<StartTrialResult, SubscriptionError> {
        let started = self
            .repository
            .start_trial(&cmd.tenant_id, Timestamp::now(), self.trial_days)
            .await?;

        let record = self
            .repository
            .find_by_tenant(&cmd.tenant_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found_for_tenant(cmd.tenant_id.clone()))?;

        if started {
            tracing::info!(
                tenant_id = %cmd.tenant_id,
                entitled_until = ?record.entitled_until,
                "Trial started"
            );
        } else {
            tracing::debug!(
                tenant_id = %cmd.tenant_id,
                status = %record.status,
                "Trial start ignored; tenant not eligible"
            );
        }

        Ok(StartTrialResult { started, record })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::domain::subscription::{StatusWrite, SubscriptionStatus, WriteSource};

    fn tenant() -> TenantId {
        TenantId::new("tenant-1").unwrap()
    }

    #[tokio::test]
    async fn new_tenant_gets_trial() {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let handler = StartTrialHandler::new(repo, 10);

        let result = handler
            .handle(StartTrialCommand { tenant_id: tenant() })
            .await
            .unwrap();

        assert!(result.started);
        assert_eq!(result.record.status, SubscriptionStatus::Trial);
        let started_at = result.record.trial_started_at.unwrap();
        assert_eq!(result.record.entitled_until, Some(started_at.add_days(10)));
    }

    #[tokio::test]
    async fn repeat_start_is_noop() {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let handler = StartTrialHandler::new(repo, 10);
        let first = handler
            .handle(StartTrialCommand { tenant_id: tenant() })
            .await
            .unwrap();

        let second = handler
            .handle(StartTrialCommand { tenant_id: tenant() })
            .await
            .unwrap();

        assert!(!second.started);
        assert_eq!(second.record, first.record);
    }

    #[tokio::test]
    async fn active_tenant_is_not_eligible() {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        repo.apply_status(
            &tenant(),
            &StatusWrite::status_only(SubscriptionStatus::Active, WriteSource::Reconciliation)
                .with_subscription_id("sub_1"),
            Timestamp::now(),
        )
        .await
        .unwrap();
        let handler = StartTrialHandler::new(repo, 10);

        let result = handler
            .handle(StartTrialCommand { tenant_id: tenant() })
            .await
            .unwrap();

        assert!(!result.started);
        assert_eq!(result.record.status, SubscriptionStatus::Active);
        assert!(result.record.trial_started_at.is_none());
    }
}
