//! HTTP adapter for subscription billing.
//!
//! - `POST /webhooks/stripe` - Provider webhooks (signature verified)
//! - `GET /subscription/entitlement` - Access decision for the caller's tenant
//! - `POST /subscription/trial` - Start the one-time trial
//! - `POST /subscription/cancel` - Cancel renewal
//! - `GET|POST /subscription/sync` - Drift report / emergency sync
//! - `POST /admin/subscription/override` - Administrative correction
//! - `POST /admin/subscription/sweep` - Emergency sync across all tenants

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{BillingApiError, BillingAppState, TenantContext, SIGNATURE_HEADER, TENANT_HEADER};
pub use routes::billing_router;
