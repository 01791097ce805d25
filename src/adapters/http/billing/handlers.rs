//! HTTP handlers for subscription billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::extract::{Json, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CheckEntitlementHandler,
    CheckEntitlementQuery, HandleBillingWebhookCommand, HandleBillingWebhookHandler,
    OverrideSubscriptionCommand, OverrideSubscriptionHandler, ReconciliationService,
    StartTrialCommand, StartTrialHandler, SyncSweepHandler, verify_subscription_owner,
};
use crate::config::BillingConfig;
use crate::domain::foundation::{DomainError, TenantId};
use crate::domain::subscription::{
    AdminOverride, StripeWebhookVerifier, SubscriptionError, WebhookError,
};
use crate::ports::{BillingGateway, SubscriptionRepository};

use super::dto::{
    CancelSubscriptionRequest, CancelSubscriptionResponse, EmergencySyncRequest,
    EmergencySyncResponse, EntitlementResponse, ErrorResponse, OverrideRequest,
    StartTrialResponse, SubscriptionRecordResponse, SweepResponse, SyncQuery, SyncReportResponse,
    WebhookAckResponse,
};

/// Header carrying the caller's tenant. Authentication happens upstream.
pub const TENANT_HEADER: &str = "X-Tenant-Id";

/// Header carrying the provider's webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared dependencies, cloned per request.
#[derive(Clone)]
pub struct BillingAppState {
    pub repository: Arc<dyn SubscriptionRepository>,
    pub gateway: Arc<dyn BillingGateway>,
    pub reconciler: Arc<ReconciliationService>,
    pub verifier: Arc<StripeWebhookVerifier>,
    pub settings: BillingConfig,
}

impl BillingAppState {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        gateway: Arc<dyn BillingGateway>,
        verifier: StripeWebhookVerifier,
        settings: BillingConfig,
    ) -> Self {
        let reconciler = Arc::new(ReconciliationService::new(
            repository.clone(),
            gateway.clone(),
        ));
        Self {
            repository,
            gateway,
            reconciler,
            verifier: Arc::new(verifier),
            settings,
        }
    }

    pub fn webhook_handler(&self) -> HandleBillingWebhookHandler {
        HandleBillingWebhookHandler::new(
            self.repository.clone(),
            self.gateway.clone(),
            self.reconciler.clone(),
            self.verifier.clone(),
            self.settings.checkout_session_scan_limit,
        )
    }

    pub fn cancel_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.repository.clone(), self.gateway.clone())
    }

    pub fn entitlement_handler(&self) -> CheckEntitlementHandler {
        CheckEntitlementHandler::new(self.repository.clone())
    }

    pub fn trial_handler(&self) -> StartTrialHandler {
        StartTrialHandler::new(self.repository.clone(), self.settings.trial_days)
    }

    pub fn override_handler(&self) -> OverrideSubscriptionHandler {
        OverrideSubscriptionHandler::new(self.repository.clone())
    }

    pub fn sweep_handler(&self) -> SyncSweepHandler {
        SyncSweepHandler::new(
            self.repository.clone(),
            self.reconciler.clone(),
            self.settings.sweep_concurrency,
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Tenant Context
// ════════════════════════════════════════════════════════════════════════════════

/// Tenant the request acts for, taken from [`TENANT_HEADER`].
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: TenantId,
}

/// Rejection for a missing or blank tenant header.
pub struct TenantRequired;

impl IntoResponse for TenantRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("TENANT_REQUIRED", "X-Tenant-Id header is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = TenantRequired;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let tenant_id = parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| TenantId::new(s).ok())
            .ok_or(TenantRequired)?;

        Ok(TenantContext { tenant_id })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Tenant Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// GET /subscription/entitlement
pub async fn get_entitlement(
    State(state): State<BillingAppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .entitlement_handler()
        .handle(CheckEntitlementQuery {
            tenant_id: tenant.tenant_id,
        })
        .await?;

    Ok(Json(EntitlementResponse::from(result)))
}

/// POST /subscription/trial
pub async fn start_trial(
    State(state): State<BillingAppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .trial_handler()
        .handle(StartTrialCommand {
            tenant_id: tenant.tenant_id,
        })
        .await?;

    let status = if result.started {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(StartTrialResponse::from(result))))
}

/// POST /subscription/cancel
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    tenant: TenantContext,
    Json(request): Json<CancelSubscriptionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .cancel_handler()
        .handle(CancelSubscriptionCommand {
            tenant_id: tenant.tenant_id,
            subscription_id: request.subscription_id,
            confirmed: request.confirmed,
        })
        .await?;

    Ok(Json(CancelSubscriptionResponse::from(result)))
}

/// GET /subscription/sync - Read-only drift report
pub async fn get_sync_report(
    State(state): State<BillingAppState>,
    tenant: TenantContext,
    Query(query): Query<SyncQuery>,
) -> Result<impl IntoResponse, BillingApiError> {
    let subscription_id =
        resolve_subscription_id(&state, &tenant.tenant_id, query.subscription_id).await?;
    let report = state
        .reconciler
        .validate_sync(&tenant.tenant_id, &subscription_id)
        .await?;

    Ok(Json(SyncReportResponse::from(report)))
}

/// POST /subscription/sync - Repair drift if any
pub async fn run_emergency_sync(
    State(state): State<BillingAppState>,
    tenant: TenantContext,
    body: Option<Json<EmergencySyncRequest>>,
) -> Result<impl IntoResponse, BillingApiError> {
    let requested = body.and_then(|Json(b)| b.subscription_id);
    let subscription_id = resolve_subscription_id(&state, &tenant.tenant_id, requested).await?;
    let outcome = state
        .reconciler
        .emergency_sync(&tenant.tenant_id, &subscription_id)
        .await?;

    Ok(Json(EmergencySyncResponse::from(outcome)))
}

/// Uses the requested id, else the tenant's stored subscription id.
///
/// A requested id must belong to the tenant; foreign ids are `NotFound`.
async fn resolve_subscription_id(
    state: &BillingAppState,
    tenant_id: &TenantId,
    requested: Option<String>,
) -> Result<String, SubscriptionError> {
    let record = state
        .repository
        .find_by_tenant(tenant_id)
        .await?
        .ok_or_else(|| SubscriptionError::not_found_for_tenant(tenant_id.clone()))?;

    match requested.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => {
            verify_subscription_owner(state.gateway.as_ref(), &record, id).await?;
            Ok(id.to_string())
        }
        None => record
            .external_subscription_id
            .ok_or_else(|| SubscriptionError::not_found_for_tenant(tenant_id.clone())),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin Endpoints (authorization happens upstream)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /admin/subscription/override
pub async fn override_subscription(
    State(state): State<BillingAppState>,
    Json(request): Json<OverrideRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let tenant_id = TenantId::new(request.tenant_id).map_err(SubscriptionError::from)?;
    let record = state
        .override_handler()
        .handle(OverrideSubscriptionCommand {
            tenant_id,
            change: AdminOverride {
                status: request.status,
                entitled_until: request.entitled_until,
                is_special: request.is_special,
            },
            actor: request.actor,
        })
        .await?;

    Ok(Json(SubscriptionRecordResponse::from(record)))
}

/// POST /admin/subscription/sweep
pub async fn run_sync_sweep(
    State(state): State<BillingAppState>,
) -> Result<impl IntoResponse, BillingApiError> {
    let report = state.sweep_handler().handle().await?;
    Ok(Json(SweepResponse::from(report)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhooks (no tenant header; signature verified)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/stripe
///
/// Verified deliveries are always acknowledged with 200, whatever the
/// handler outcome, so the provider does not redeliver indefinitely.
pub async fn receive_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let outcome = state
        .webhook_handler()
        .handle(HandleBillingWebhookCommand {
            payload: body.to_vec(),
            signature,
        })
        .await?;

    Ok((StatusCode::OK, Json(WebhookAckResponse::from(&outcome))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts subscription errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(SubscriptionError);

impl From<SubscriptionError> for BillingApiError {
    fn from(err: SubscriptionError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for BillingApiError {
    fn from(err: DomainError) -> Self {
        Self(SubscriptionError::from(err))
    }
}

impl BillingApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            SubscriptionError::NotConfirmed | SubscriptionError::Validation { .. } => {
                StatusCode::BAD_REQUEST
            }
            SubscriptionError::NotFound { .. } | SubscriptionError::NotFoundForTenant(_) => {
                StatusCode::NOT_FOUND
            }
            SubscriptionError::Provider { .. } => StatusCode::BAD_GATEWAY,
            SubscriptionError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, status = status.as_u16(), "Billing request failed");
        }
        let body = ErrorResponse::new(self.0.code().to_string(), self.0.message());
        (status, Json(body)).into_response()
    }
}

/// Rejected webhook delivery.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let code = match &self.0 {
            WebhookError::MissingSignature => "MISSING_SIGNATURE",
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::TimestampOutOfRange | WebhookError::InvalidTimestamp => {
                "INVALID_SIGNATURE_TIMESTAMP"
            }
            WebhookError::ParseError(_) => "INVALID_PAYLOAD",
        };
        let body = ErrorResponse::new(code, self.0.to_string());
        (self.0.status_code(), Json(body)).into_response()
    }
}
