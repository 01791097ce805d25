//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresSubscriptionRepository` - Per-tenant subscription records

mod subscription_repository;

pub use subscription_repository::PostgresSubscriptionRepository;
