//! Subscription record store port.
//!
//! One row per tenant. Every method that touches `status` or
//! `entitled_until` is a single-row atomic write and names its
//! [`WriteSource`](crate::domain::subscription::WriteSource), either through a
//! [`StatusWrite`] or implicitly (trial start, admin override).
//!
//! # Concurrency
//!
//! Writes for the same tenant are serialized by the store. Reconciliation is
//! last-writer-wins: mapped state derives from provider state only, so any
//! interleaving converges.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TenantId, Timestamp};
use crate::domain::subscription::{AdminOverride, StatusWrite, SubscriptionRecord};

/// Repository port for per-tenant subscription records.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Finds a tenant's record. `None` if the tenant has none yet.
    async fn find_by_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Returns the tenant's record, creating it at status `none` if absent.
    async fn ensure_exists(
        &self,
        tenant_id: &TenantId,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError>;

    /// Starts the trial if the tenant is at `none` and never had one.
    ///
    /// Returns `true` if this call started it. Conditional single-row update;
    /// concurrent callers see exactly one `true`.
    async fn start_trial(
        &self,
        tenant_id: &TenantId,
        now: Timestamp,
        trial_days: i64,
    ) -> Result<bool, DomainError>;

    /// Records the provider customer id unless one is already stored.
    async fn attach_customer(
        &self,
        tenant_id: &TenantId,
        customer_id: &str,
        now: Timestamp,
    ) -> Result<(), DomainError>;

    /// Applies a status write, creating the row if it does not exist.
    async fn apply_status(
        &self,
        tenant_id: &TenantId,
        write: &StatusWrite,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError>;

    /// Applies an administrative override to an existing record.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the tenant has no record
    async fn apply_override(
        &self,
        tenant_id: &TenantId,
        change: &AdminOverride,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError>;

    /// Finds the record holding this provider customer id.
    async fn find_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Finds the record holding this provider subscription id.
    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// All records that reference a provider subscription.
    async fn list_with_subscription(&self) -> Result<Vec<SubscriptionRecord>, DomainError>;
}
