//! Local subscription status and the write-source attribution tag.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Locally stored subscription status.
///
/// Lifecycle: `none -> trial -> {active, expired}`, `none|trial -> active`
/// (direct payment), `active -> canceled` (entitlement preserved),
/// `canceled|active -> expired`, and `expired -> active` via a new checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// No billing relationship and no trial yet.
    #[serde(rename = "none")]
    Unsubscribed,

    /// Free trial, bounded by `entitled_until`.
    Trial,

    /// Paid and renewing. The provider owns payment retries.
    Active,

    /// Renewal revoked; access continues until `entitled_until`.
    Canceled,

    /// No entitlement left. A new checkout can reactivate.
    Expired,
}

impl SubscriptionStatus {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Unsubscribed => "none",
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(SubscriptionStatus::Unsubscribed),
            "trial" => Ok(SubscriptionStatus::Trial),
            "active" => Ok(SubscriptionStatus::Active),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            "expired" => Ok(SubscriptionStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown subscription status '{}'", other),
            )),
        }
    }
}

/// The code path responsible for a write to `status` / `entitled_until`.
///
/// Every status or entitlement write carries exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteSource {
    TrialStart,
    CheckoutCompletion,
    Reconciliation,
    Cancellation,
    AdminOverride,
}

impl WriteSource {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteSource::TrialStart => "trial_start",
            WriteSource::CheckoutCompletion => "checkout_completion",
            WriteSource::Reconciliation => "reconciliation",
            WriteSource::Cancellation => "cancellation",
            WriteSource::AdminOverride => "admin_override",
        }
    }
}

impl fmt::Display for WriteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial_start" => Ok(WriteSource::TrialStart),
            "checkout_completion" => Ok(WriteSource::CheckoutCompletion),
            "reconciliation" => Ok(WriteSource::Reconciliation),
            "cancellation" => Ok(WriteSource::Cancellation),
            "admin_override" => Ok(WriteSource::AdminOverride),
            other => Err(ValidationError::invalid_format(
                "last_write_source",
                format!("unknown write source '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SubscriptionStatus; 5] = [
        SubscriptionStatus::Unsubscribed,
        SubscriptionStatus::Trial,
        SubscriptionStatus::Active,
        SubscriptionStatus::Canceled,
        SubscriptionStatus::Expired,
    ];

    #[test]
    fn status_storage_form_parses_back() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>(), Ok(status));
        }
    }

    #[test]
    fn unsubscribed_serializes_as_none() {
        let json = serde_json::to_string(&SubscriptionStatus::Unsubscribed).unwrap();
        assert_eq!(json, "\"none\"");
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("past_due".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn write_source_parses_storage_form() {
        assert_eq!(
            "admin_override".parse::<WriteSource>(),
            Ok(WriteSource::AdminOverride)
        );
        assert!("webhook".parse::<WriteSource>().is_err());
    }
}
