//! OverrideSubscriptionHandler - Administrative correction of a tenant record.
//!
//! The only path allowed to move `entitled_until` arbitrarily or to set the
//! special flag. Overrides are validated against the record invariants before
//! they are written.

use std::sync::Arc;

use crate::domain::foundation::{TenantId, Timestamp};
use crate::domain::subscription::{
    AdminOverride, SubscriptionError, SubscriptionRecord, SubscriptionStatus,
};
use crate::ports::SubscriptionRepository;

#[derive(Debug, Clone)]
pub struct OverrideSubscriptionCommand {
    pub tenant_id: TenantId,
    pub change: AdminOverride,
    /// Operator identity, for the audit log.
    pub actor: String,
}

pub struct OverrideSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
}

impl OverrideSubscriptionHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repository }
    }

    /// # Errors
    ///
    /// - `Validation` for an empty override, a blank actor, or a change that
    ///   would leave the record inconsistent
    /// - `NotFoundForTenant` if the tenant has no record
    pub async fn handle(
        &self,
        cmd: OverrideSubscriptionCommand,
    ) -> Result<SubscriptionRecord, SubscriptionError> {
        if cmd.change == AdminOverride::default() {
            return Err(SubscriptionError::validation(
                "override",
                "at least one field must be set",
            ));
        }
        if cmd.actor.trim().is_empty() {
            return Err(SubscriptionError::validation("actor", "cannot be empty"));
        }

        let current = self
            .repository
            .find_by_tenant(&cmd.tenant_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found_for_tenant(cmd.tenant_id.clone()))?;

        match cmd.change.status {
            Some(SubscriptionStatus::Canceled) if current.external_subscription_id.is_none() => {
                return Err(SubscriptionError::validation(
                    "status",
                    "canceled requires a provider subscription",
                ));
            }
            Some(SubscriptionStatus::Trial) if current.trial_started_at.is_none() => {
                return Err(SubscriptionError::validation(
                    "status",
                    "trial requires a trial start",
                ));
            }
            _ => {}
        }

        let updated = self
            .repository
            .apply_override(&cmd.tenant_id, &cmd.change, Timestamp::now())
            .await?;

        tracing::warn!(
            tenant_id = %cmd.tenant_id,
            actor = %cmd.actor,
            before_status = %current.status,
            after_status = %updated.status,
            before_entitled_until = ?current.entitled_until,
            after_entitled_until = ?updated.entitled_until,
            is_special = updated.is_special,
            "Subscription overridden by administrator"
        );

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::domain::subscription::{is_entitled, WriteSource};

    fn tenant() -> TenantId {
        TenantId::new("tenant-1").unwrap()
    }

    fn command(change: AdminOverride) -> OverrideSubscriptionCommand {
        OverrideSubscriptionCommand {
            tenant_id: tenant(),
            change,
            actor: "ops@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn special_flag_grants_access() {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        repo.ensure_exists(&tenant(), Timestamp::now()).await.unwrap();
        let handler = OverrideSubscriptionHandler::new(repo);

        let record = handler
            .handle(command(AdminOverride {
                is_special: Some(true),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert!(record.is_special);
        assert!(is_entitled(&record, Timestamp::now()));
        assert_eq!(record.last_write_source, Some(WriteSource::AdminOverride));
    }

    #[tokio::test]
    async fn override_may_shorten_entitlement() {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        repo.start_trial(&tenant(), Timestamp::now(), 10).await.unwrap();
        let handler = OverrideSubscriptionHandler::new(repo);
        let yesterday = Timestamp::now().minus_days(1);

        let record = handler
            .handle(command(AdminOverride {
                entitled_until: Some(yesterday),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!(record.entitled_until, Some(yesterday));
        assert!(!is_entitled(&record, Timestamp::now()));
    }

    #[tokio::test]
    async fn empty_override_is_rejected() {
        let handler = OverrideSubscriptionHandler::new(Arc::new(InMemorySubscriptionRepository::new()));
        let err = handler.handle(command(AdminOverride::default())).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::Validation { .. }));
    }

    #[tokio::test]
    async fn canceled_without_subscription_is_rejected() {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        repo.ensure_exists(&tenant(), Timestamp::now()).await.unwrap();
        let handler = OverrideSubscriptionHandler::new(repo);

        let err = handler
            .handle(command(AdminOverride {
                status: Some(SubscriptionStatus::Canceled),
                ..Default::default()
            }))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            SubscriptionError::validation("status", "canceled requires a provider subscription")
        );
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let handler = OverrideSubscriptionHandler::new(Arc::new(InMemorySubscriptionRepository::new()));
        let err = handler
            .handle(command(AdminOverride {
                is_special: Some(true),
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert_eq!(err, SubscriptionError::NotFoundForTenant(tenant()));
    }
}
