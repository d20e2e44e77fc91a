//! Gateway use-case services.
//!
//! # Responsibility
//! - Read path: primary note collection, then the deferred users fetch.
//! - Mutation path: validation, then one unary dispatch.
//! - `gateway` ties selection, call contexts and the steps together.

pub mod dispatch;
pub mod gateway;
pub mod read;
pub mod validation;
