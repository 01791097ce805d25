//! In-Memory Subscription Repository
//!
//! Same semantics as the PostgreSQL adapter: every write takes the map's
//! write lock, so writes for a tenant are serialized.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, TenantId, Timestamp};
use crate::domain::subscription::{AdminOverride, StatusWrite, SubscriptionRecord};
use crate::ports::SubscriptionRepository;

/// In-memory subscription record store.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionRepository {
    records: Arc<RwLock<HashMap<TenantId, SubscriptionRecord>>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a record as-is (test setup).
    pub async fn insert(&self, record: SubscriptionRecord) {
        self.records
            .write()
            .await
            .insert(record.tenant_id.clone(), record);
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn find_by_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        Ok(self.records.read().await.get(tenant_id).cloned())
    }

    async fn ensure_exists(
        &self,
        tenant_id: &TenantId,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError> {
        let mut records = self.records.write().await;
        let record = records
            .entry(tenant_id.clone())
            .or_insert_with(|| SubscriptionRecord::new(tenant_id.clone(), now));
        Ok(record.clone())
    }

    async fn start_trial(
        &self,
        tenant_id: &TenantId,
        now: Timestamp,
        trial_days: i64,
    ) -> Result<bool, DomainError> {
        let mut records = self.records.write().await;
        let record = records
            .entry(tenant_id.clone())
            .or_insert_with(|| SubscriptionRecord::new(tenant_id.clone(), now));
        Ok(record.start_trial(now, trial_days))
    }

    async fn attach_customer(
        &self,
        tenant_id: &TenantId,
        customer_id: &str,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        let record = records
            .entry(tenant_id.clone())
            .or_insert_with(|| SubscriptionRecord::new(tenant_id.clone(), now));
        record.attach_customer(customer_id, now);
        Ok(())
    }

    async fn apply_status(
        &self,
        tenant_id: &TenantId,
        write: &StatusWrite,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError> {
        let mut records = self.records.write().await;
        let record = records
            .entry(tenant_id.clone())
            .or_insert_with(|| SubscriptionRecord::new(tenant_id.clone(), now));
        record.apply(write, now);
        Ok(record.clone())
    }

    async fn apply_override(
        &self,
        tenant_id: &TenantId,
        change: &AdminOverride,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(tenant_id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("No subscription record for tenant {}", tenant_id),
            )
        })?;
        record.apply_override(change, now);
        Ok(record.clone())
    }

    async fn find_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|r| r.external_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|r| r.external_subscription_id.as_deref() == Some(subscription_id))
            .cloned())
    }

    async fn list_with_subscription(&self) -> Result<Vec<SubscriptionRecord>, DomainError> {
        let mut records: Vec<_> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.external_subscription_id.is_some())
            .cloned()
            .collect();
        records.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));
        Ok(records)
    }
}
