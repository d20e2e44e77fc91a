//! Request-scoped domain values handled by the gateway.
//!
//! # Responsibility
//! - Define the note/user shapes handed to the presentation layer.
//! - Define caller identity and the owner-id set derived from a note stream.
//!
//! # Invariants
//! - Nothing in this module outlives the request that created it.
//! - The gateway treats notes and users as values; backends own them.

pub mod note;
pub mod user;
