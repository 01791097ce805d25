//! HTTP adapters - REST API implementations.

pub mod app;
pub mod billing;

pub use app::build_router;
pub use billing::{billing_router, BillingAppState};
