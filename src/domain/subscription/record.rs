//! Subscription record entity.
//!
//! One record per tenant. It is the only state the page-serving path reads
//! to decide whether a tenant's published pages are servable.
//!
//! # Design Decisions
//!
//! - **One per tenant**: `tenant_id` is the primary key and never changes
//! - **Created implicitly**: a new tenant starts at status `none`
//! - **Never deleted here**: retention is an external concern
//! - **Attributed writes**: every status/entitlement write names its [`WriteSource`]

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{TenantId, Timestamp};

use super::{SubscriptionStatus, WriteSource};

/// A tenant's locally stored subscription state.
///
/// # Invariants
///
/// - `external_customer_id` is set at most once and never cleared
/// - `status = trial` implies `trial_started_at` is set; a trial is granted once
/// - `status = canceled` implies `external_subscription_id` is set
/// - cancellation never changes `entitled_until`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Owning tenant.
    pub tenant_id: TenantId,

    /// Current lifecycle status.
    pub status: SubscriptionStatus,

    /// Provider customer, once a billing relationship exists.
    pub external_customer_id: Option<String>,

    /// Provider subscription, retained after cancellation for resync.
    pub external_subscription_id: Option<String>,

    /// When the one-and-only trial began.
    pub trial_started_at: Option<Timestamp>,

    /// Access is granted through this instant for trial and canceled tenants.
    pub entitled_until: Option<Timestamp>,

    /// Administratively exempt tenants are always entitled.
    pub is_special: bool,

    /// Which code path last wrote `status` / `entitled_until`.
    pub last_write_source: Option<WriteSource>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A single-row status write.
///
/// `entitled_until: None` leaves the stored value untouched, and
/// `external_subscription_id: None` keeps the stored id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusWrite {
    pub status: SubscriptionStatus,
    pub entitled_until: Option<Timestamp>,
    pub external_subscription_id: Option<String>,
    pub source: WriteSource,
}

impl StatusWrite {
    /// Status write that preserves the stored entitlement.
    pub fn status_only(status: SubscriptionStatus, source: WriteSource) -> Self {
        Self {
            status,
            entitled_until: None,
            external_subscription_id: None,
            source,
        }
    }

    /// Sets `entitled_until`.
    pub fn with_entitled_until(mut self, until: Option<Timestamp>) -> Self {
        self.entitled_until = until;
        self
    }

    /// Sets the provider subscription id.
    pub fn with_subscription_id(mut self, id: impl Into<String>) -> Self {
        self.external_subscription_id = Some(id.into());
        self
    }
}

impl SubscriptionRecord {
    /// Fresh record for a newly created tenant.
    pub fn new(tenant_id: TenantId, now: Timestamp) -> Self {
        Self {
            tenant_id,
            status: SubscriptionStatus::Unsubscribed,
            external_customer_id: None,
            external_subscription_id: None,
            trial_started_at: None,
            entitled_until: None,
            is_special: false,
            last_write_source: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Starts the tenant's trial.
    ///
    /// Returns `false` without touching the record unless the status is
    /// `none` and no trial was ever granted.
    pub fn start_trial(&mut self, now: Timestamp, trial_days: i64) -> bool {
        if self.status != SubscriptionStatus::Unsubscribed || self.trial_started_at.is_some() {
            return false;
        }

        self.status = SubscriptionStatus::Trial;
        self.trial_started_at = Some(now);
        self.entitled_until = Some(now.add_days(trial_days));
        self.last_write_source = Some(WriteSource::TrialStart);
        self.updated_at = now;
        true
    }

    /// Records the provider customer id if none is stored yet.
    ///
    /// Returns `true` if the id was newly attached.
    pub fn attach_customer(&mut self, customer_id: &str, now: Timestamp) -> bool {
        if self.external_customer_id.is_some() {
            return false;
        }
        self.external_customer_id = Some(customer_id.to_string());
        self.updated_at = now;
        true
    }

    /// Applies a status write.
    pub fn apply(&mut self, write: &StatusWrite, now: Timestamp) {
        self.status = write.status;
        if let Some(until) = write.entitled_until {
            self.entitled_until = Some(until);
        }
        if let Some(id) = &write.external_subscription_id {
            self.external_subscription_id = Some(id.clone());
        }
        self.last_write_source = Some(write.source);
        self.updated_at = now;
    }

    /// Applies an administrative override.
    ///
    /// Unlike [`apply`](Self::apply), this may move `entitled_until` backwards.
    pub fn apply_override(&mut self, change: &AdminOverride, now: Timestamp) {
        if let Some(status) = change.status {
            self.status = status;
        }
        if let Some(until) = change.entitled_until {
            self.entitled_until = Some(until);
        }
        if let Some(special) = change.is_special {
            self.is_special = special;
        }
        self.last_write_source = Some(WriteSource::AdminOverride);
        self.updated_at = now;
    }
}

/// Administrative change to a record. `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminOverride {
    pub status: Option<SubscriptionStatus>,
    pub entitled_until: Option<Timestamp>,
    pub is_special: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId::new("tenant-1").unwrap()
    }

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    #[test]
    fn new_record_starts_unsubscribed() {
        let record = SubscriptionRecord::new(tenant(), at(1_000));
        assert_eq!(record.status, SubscriptionStatus::Unsubscribed);
        assert!(record.entitled_until.is_none());
        assert!(record.last_write_source.is_none());
    }

    #[test]
    fn trial_start_sets_ten_day_window() {
        let now = at(1_700_000_000);
        let mut record = SubscriptionRecord::new(tenant(), now);

        assert!(record.start_trial(now, 10));
        assert_eq!(record.status, SubscriptionStatus::Trial);
        assert_eq!(record.trial_started_at, Some(now));
        assert_eq!(record.entitled_until, Some(now.add_days(10)));
        assert_eq!(record.last_write_source, Some(WriteSource::TrialStart));
    }

    #[test]
    fn second_trial_start_is_noop() {
        let first = at(1_700_000_000);
        let mut record = SubscriptionRecord::new(tenant(), first);
        record.start_trial(first, 10);

        let snapshot = record.clone();
        assert!(!record.start_trial(first.add_days(3), 10));
        assert_eq!(record, snapshot);
    }

    #[test]
    fn trial_not_regranted_after_expiry_returns_to_none() {
        let now = at(1_700_000_000);
        let mut record = SubscriptionRecord::new(tenant(), now);
        record.start_trial(now, 10);
        record.apply_override(
            &AdminOverride {
                status: Some(SubscriptionStatus::Unsubscribed),
                ..Default::default()
            },
            now,
        );

        assert!(!record.start_trial(now.add_days(20), 10));
    }

    #[test]
    fn customer_id_is_set_once() {
        let now = at(1_000);
        let mut record = SubscriptionRecord::new(tenant(), now);

        assert!(record.attach_customer("cus_1", now));
        assert!(!record.attach_customer("cus_2", now));
        assert_eq!(record.external_customer_id.as_deref(), Some("cus_1"));
    }

    #[test]
    fn status_only_write_preserves_entitlement() {
        let now = at(1_000);
        let mut record = SubscriptionRecord::new(tenant(), now);
        record.apply(
            &StatusWrite::status_only(SubscriptionStatus::Active, WriteSource::Reconciliation)
                .with_entitled_until(Some(at(5_000)))
                .with_subscription_id("sub_1"),
            now,
        );

        record.apply(
            &StatusWrite::status_only(SubscriptionStatus::Canceled, WriteSource::Cancellation),
            now,
        );

        assert_eq!(record.status, SubscriptionStatus::Canceled);
        assert_eq!(record.entitled_until, Some(at(5_000)));
        assert_eq!(record.external_subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(record.last_write_source, Some(WriteSource::Cancellation));
    }

    #[test]
    fn override_can_mark_special() {
        let now = at(1_000);
        let mut record = SubscriptionRecord::new(tenant(), now);
        record.apply_override(
            &AdminOverride {
                is_special: Some(true),
                ..Default::default()
            },
            now,
        );

        assert!(record.is_special);
        assert_eq!(record.status, SubscriptionStatus::Unsubscribed);
        assert_eq!(record.last_write_source, Some(WriteSource::AdminOverride));
    }
}
