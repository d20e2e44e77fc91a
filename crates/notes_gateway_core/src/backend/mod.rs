//! Backend implementations and their selection.
//!
//! # Responsibility
//! - Name the two interchangeable backend implementations.
//! - Define the client contracts the gateway calls through.
//! - Resolve a caller-supplied discriminator to an (address, client) pair.
//!
//! # Invariants
//! - There are exactly two implementations; selection is a closed lookup.
//! - Client handles are shared across concurrent requests and must be
//!   safe for concurrent use.

pub mod client;
pub mod grpc;
pub mod selector;

use std::fmt::{Display, Formatter};
use tonic::transport::Uri;

/// Which backend implementation services a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendChoice {
    Go,
    Rust,
}

/// Discriminator token for the Go implementation.
pub const BACKEND_TOKEN_GO: &str = "go";
/// Discriminator token for the Rust implementation.
pub const BACKEND_TOKEN_RUST: &str = "rust";

impl BackendChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Go => BACKEND_TOKEN_GO,
            Self::Rust => BACKEND_TOKEN_RUST,
        }
    }

    /// Parses one of the two accepted tokens; anything else is `None`.
    ///
    /// Tokens are matched exactly, without trimming or case folding.
    pub fn parse_strict(token: &str) -> Option<Self> {
        match token {
            BACKEND_TOKEN_GO => Some(Self::Go),
            BACKEND_TOKEN_RUST => Some(Self::Rust),
            _ => None,
        }
    }

    /// Resolves a token, falling back to `default` for missing or unknown values.
    pub fn resolve_or(token: Option<&str>, default: Self) -> Self {
        token.and_then(Self::parse_strict).unwrap_or(default)
    }
}

impl Display for BackendChoice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Absolute `http://` or `https://` URI of one backend service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceAddress(String);

impl ServiceAddress {
    /// Accepts a trimmed absolute http(s) URI whose authority is a host with
    /// an optional numeric port.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().trim_end_matches('/');
        let uri = normalized.parse::<Uri>().ok()?;
        if !matches!(uri.scheme_str(), Some("http" | "https")) {
            return None;
        }
        let authority = uri.authority()?;
        if authority.host().is_empty() {
            return None;
        }
        if authority.as_str() != authority.host() && authority.port_u16().is_none() {
            return None;
        }
        Some(Self(normalized.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ServiceAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
