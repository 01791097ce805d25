//! Subscription lifecycle settings

use serde::Deserialize;

use super::error::ValidationError;

/// Longest trial the service will grant.
pub const MAX_TRIAL_DAYS: i64 = 365;

/// Tunables for trials, tenant resolution and the sync sweep.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BillingConfig {
    /// Length of the one-time trial
    #[serde(default = "default_trial_days")]
    pub trial_days: i64,

    /// How many recent checkout sessions to scan when attributing a customer
    #[serde(default = "default_session_scan_limit")]
    pub checkout_session_scan_limit: usize,

    /// Concurrent provider fetches during a sync sweep
    #[serde(default = "default_sweep_concurrency")]
    pub sweep_concurrency: usize,
}

impl BillingConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=MAX_TRIAL_DAYS).contains(&self.trial_days) {
            return Err(ValidationError::InvalidBillingSetting("trial_days"));
        }
        if !(1..=100).contains(&self.checkout_session_scan_limit) {
            return Err(ValidationError::InvalidBillingSetting(
                "checkout_session_scan_limit",
            ));
        }
        if self.sweep_concurrency == 0 {
            return Err(ValidationError::InvalidBillingSetting("sweep_concurrency"));
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            trial_days: default_trial_days(),
            checkout_session_scan_limit: default_session_scan_limit(),
            sweep_concurrency: default_sweep_concurrency(),
        }
    }
}

fn default_trial_days() -> i64 {
    10
}

fn default_session_scan_limit() -> usize {
    10
}

fn default_sweep_concurrency() -> usize {
    4
}
