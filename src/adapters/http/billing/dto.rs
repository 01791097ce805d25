//! Request and response bodies for the billing HTTP API.

use serde::{Deserialize, Serialize};

use crate::application::{
    CancelSubscriptionResult, CheckEntitlementResult, EmergencySyncOutcome, StartTrialResult,
    SweepReport, SyncReport, SyncState, WebhookOutcome,
};
use crate::domain::foundation::Timestamp;
use crate::domain::subscription::{SubscriptionRecord, SubscriptionStatus};

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

/// `POST /subscription/cancel`
#[derive(Debug, Clone, Deserialize)]
pub struct CancelSubscriptionRequest {
    #[serde(rename = "subscriptionId")]
    pub subscription_id: String,
    /// Absent is treated as not confirmed.
    #[serde(default)]
    pub confirmed: bool,
}

/// Query string for `GET /subscription/sync`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncQuery {
    /// Defaults to the tenant's stored subscription id.
    #[serde(rename = "subscriptionId")]
    pub subscription_id: Option<String>,
}

/// `POST /subscription/sync`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmergencySyncRequest {
    #[serde(rename = "subscriptionId")]
    pub subscription_id: Option<String>,
}

/// `POST /admin/subscription/override`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRequest {
    pub tenant_id: String,
    pub actor: String,
    pub status: Option<SubscriptionStatus>,
    pub entitled_until: Option<Timestamp>,
    pub is_special: Option<bool>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

/// Cancellation result. Instants are epoch seconds, as the provider reports them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CancelSubscriptionResponse {
    #[serde(rename = "subscriptionId")]
    pub subscription_id: String,
    pub status: SubscriptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<i64>,
}

impl From<CancelSubscriptionResult> for CancelSubscriptionResponse {
    fn from(result: CancelSubscriptionResult) -> Self {
        Self {
            subscription_id: result.subscription_id,
            status: result.status,
            canceled_at: result.canceled_at.map(|t| t.as_unix_secs()),
            current_period_end: result.current_period_end.map(|t| t.as_unix_secs()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementResponse {
    pub entitled: bool,
    pub status: SubscriptionStatus,
    pub entitled_until: Option<Timestamp>,
    pub is_special: bool,
}

impl From<CheckEntitlementResult> for EntitlementResponse {
    fn from(result: CheckEntitlementResult) -> Self {
        Self {
            entitled: result.entitled,
            status: result.status,
            entitled_until: result.entitled_until,
            is_special: result.is_special,
        }
    }
}

/// Subscription record as exposed over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecordResponse {
    pub tenant_id: String,
    pub status: SubscriptionStatus,
    pub external_customer_id: Option<String>,
    pub external_subscription_id: Option<String>,
    pub trial_started_at: Option<Timestamp>,
    pub entitled_until: Option<Timestamp>,
    pub is_special: bool,
    pub updated_at: Timestamp,
}

impl From<SubscriptionRecord> for SubscriptionRecordResponse {
    fn from(record: SubscriptionRecord) -> Self {
        Self {
            tenant_id: record.tenant_id.to_string(),
            status: record.status,
            external_customer_id: record.external_customer_id,
            external_subscription_id: record.external_subscription_id,
            trial_started_at: record.trial_started_at,
            entitled_until: record.entitled_until,
            is_special: record.is_special,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StartTrialResponse {
    pub started: bool,
    pub subscription: SubscriptionRecordResponse,
}

impl From<StartTrialResult> for StartTrialResponse {
    fn from(result: StartTrialResult) -> Self {
        Self {
            started: result.started,
            subscription: result.record.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStateResponse {
    pub status: SubscriptionStatus,
    pub entitled_until: Option<Timestamp>,
}

impl From<SyncState> for SyncStateResponse {
    fn from(state: SyncState) -> Self {
        Self {
            status: state.status,
            entitled_until: state.entitled_until,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncReportResponse {
    pub synced: bool,
    pub local: Option<SyncStateResponse>,
    pub provider: Option<SyncStateResponse>,
    pub provider_status: String,
}

impl From<SyncReport> for SyncReportResponse {
    fn from(report: SyncReport) -> Self {
        Self {
            synced: report.synced,
            local: report.local.map(Into::into),
            provider: report.provider.map(Into::into),
            provider_status: report.provider_status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmergencySyncResponse {
    pub was_synced: bool,
    pub reconciled: bool,
    pub before: Option<SubscriptionRecordResponse>,
    pub after: Option<SubscriptionRecordResponse>,
}

impl From<EmergencySyncOutcome> for EmergencySyncResponse {
    fn from(outcome: EmergencySyncOutcome) -> Self {
        Self {
            was_synced: outcome.was_synced,
            reconciled: outcome.reconciled,
            before: outcome.before.map(Into::into),
            after: outcome.after.map(Into::into),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub checked: usize,
    pub already_synced: usize,
    pub resynced: usize,
    pub failed: usize,
}

impl From<SweepReport> for SweepResponse {
    fn from(report: SweepReport) -> Self {
        Self {
            checked: report.checked,
            already_synced: report.already_synced,
            resynced: report.resynced,
            failed: report.failed,
        }
    }
}

/// Acknowledgement sent to the provider for every verified delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookAckResponse {
    pub received: bool,
    pub outcome: String,
}

impl From<&WebhookOutcome> for WebhookAckResponse {
    fn from(outcome: &WebhookOutcome) -> Self {
        let outcome = match outcome {
            WebhookOutcome::CustomerAttached { .. } => "customer_attached",
            WebhookOutcome::Reconciled { synced: true, .. } => "reconciled",
            WebhookOutcome::Reconciled { synced: false, .. } => "reconcile_pending",
            WebhookOutcome::Expired { .. } => "expired",
            WebhookOutcome::AlreadyCanceled { .. } => "already_canceled",
            WebhookOutcome::Unresolved => "unresolved",
            WebhookOutcome::Logged => "logged",
            WebhookOutcome::Ignored { .. } => "ignored",
            WebhookOutcome::Failed { .. } => "failed",
        };
        Self {
            received: true,
            outcome: outcome.to_string(),
        }
    }
}

/// Error body: `{ "code": "...", "message": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
