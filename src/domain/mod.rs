//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `subscription` - Subscription lifecycle, provider mapping and access decisions

pub mod foundation;
pub mod subscription;
