//! Stripe billing gateway adapter.
//!
//! Implements the `BillingGateway` port against the Stripe REST API, plus an
//! in-process mock with error injection for tests.
//!
//! # Security
//!
//! - The API key is held as `secrecy::SecretString` and only exposed when a
//!   request is authenticated
//! - Webhook signatures are verified in the domain layer
//!   (`StripeWebhookVerifier`) before any event reaches a handler

mod mock_gateway;
mod stripe_gateway;

pub use mock_gateway::{MethodCall, MockBillingGateway};
pub use stripe_gateway::{StripeBillingGateway, StripeGatewayConfig};
