//! Ports - Interfaces between the application core and the outside world.
//!
//! - `SubscriptionRepository` - Per-tenant subscription record store
//! - `BillingGateway` - External billing provider

mod billing_gateway;
mod subscription_repository;

pub use billing_gateway::{BillingGateway, GatewayError};
pub use subscription_repository::SubscriptionRepository;
