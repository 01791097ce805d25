//! Adapters - Implementations of port interfaces.
//!
//! - `http` - Axum REST surface
//! - `memory` - In-memory subscription store (tests, local development)
//! - `postgres` - PostgreSQL subscription store
//! - `stripe` - Stripe billing gateway and its test double

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;

pub use memory::InMemorySubscriptionRepository;
pub use postgres::PostgresSubscriptionRepository;
pub use stripe::{MockBillingGateway, StripeBillingGateway, StripeGatewayConfig};
