//! Per-call authentication metadata.
//!
//! # Responsibility
//! - Build a fresh `CallContext` for every outbound RPC.
//! - Attach the context to exactly one request bound for its own address.
//!
//! # Invariants
//! - A context is scoped to one target address and is consumed on use.
//! - Every context carries a unique call id, so two independently built
//!   contexts are never equal, even for the same address.

pub mod signed;

use crate::backend::ServiceAddress;
use async_trait::async_trait;
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tonic::metadata::AsciiMetadataValue;
use tonic::Request;
use uuid::Uuid;

pub use signed::{CallClaims, SignedContextProvider};

/// Metadata key carrying the per-call id.
pub const CALL_ID_METADATA_KEY: &str = "x-call-id";
/// Metadata key carrying the bearer credential.
pub const AUTHORIZATION_METADATA_KEY: &str = "authorization";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// Credential lookup or signing failed.
    Credential(String),
    /// Credential could not be encoded as request metadata.
    InvalidMetadata(String),
    /// Context was built for a different address than the call targets.
    AddressMismatch { built_for: String, target: String },
}

impl Display for ContextError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credential(message) => write!(f, "credential unavailable: {message}"),
            Self::InvalidMetadata(message) => write!(f, "invalid call metadata: {message}"),
            Self::AddressMismatch { built_for, target } => write!(
                f,
                "call context built for `{built_for}` cannot be used for `{target}`"
            ),
        }
    }
}

impl Error for ContextError {}

/// Authentication metadata for one outbound call.
#[derive(Debug, PartialEq, Eq)]
pub struct CallContext {
    address: ServiceAddress,
    call_id: Uuid,
    bearer_token: Option<String>,
}

impl CallContext {
    pub fn new(address: ServiceAddress, bearer_token: Option<String>) -> Self {
        Self {
            address,
            call_id: Uuid::new_v4(),
            bearer_token,
        }
    }

    pub fn address(&self) -> &ServiceAddress {
        &self.address
    }

    pub fn call_id(&self) -> Uuid {
        self.call_id
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    /// Wraps `message` in a request carrying this context's metadata.
    ///
    /// # Errors
    /// - `AddressMismatch` when `target` is not the address this context was built for.
    /// - `InvalidMetadata` when the credential is not a valid header value.
    pub fn attach<T>(self, target: &ServiceAddress, message: T) -> Result<Request<T>, ContextError> {
        if &self.address != target {
            return Err(ContextError::AddressMismatch {
                built_for: self.address.to_string(),
                target: target.to_string(),
            });
        }

        let mut request = Request::new(message);
        let call_id = AsciiMetadataValue::try_from(self.call_id.to_string())
            .map_err(|err| ContextError::InvalidMetadata(err.to_string()))?;
        request.metadata_mut().insert(CALL_ID_METADATA_KEY, call_id);

        if let Some(token) = self.bearer_token.as_deref() {
            let value = AsciiMetadataValue::try_from(format!("Bearer {token}"))
                .map_err(|err| ContextError::InvalidMetadata(err.to_string()))?;
            request
                .metadata_mut()
                .insert(AUTHORIZATION_METADATA_KEY, value);
        }

        debug!(
            "event=call_context_attach module=context status=ok target={} call_id={} authenticated={}",
            target,
            self.call_id,
            self.bearer_token.is_some()
        );
        Ok(request)
    }
}

/// Source of call contexts; may perform I/O.
#[async_trait]
pub trait CallContextProvider: Send + Sync {
    async fn build(&self, address: &ServiceAddress) -> Result<CallContext, ContextError>;
}

/// Provider for backends that do not require credentials.
///
/// Contexts still carry a fresh call id.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousContextProvider;

#[async_trait]
impl CallContextProvider for AnonymousContextProvider {
    async fn build(&self, address: &ServiceAddress) -> Result<CallContext, ContextError> {
        Ok(CallContext::new(address.clone(), None))
    }
}
