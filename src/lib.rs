//! Pagegate Billing - Subscription lifecycle reconciliation.
//!
//! Keeps each tenant's local subscription record consistent with the billing
//! provider, so the page-serving path can answer "is this tenant entitled?"
//! from local state alone.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
