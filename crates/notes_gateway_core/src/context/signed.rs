//! HS256 JWT call credentials, one per outbound call, bound to its address.

use super::{CallContext, CallContextProvider, ContextError};
use crate::backend::ServiceAddress;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Claims carried by a call credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallClaims {
    /// Target service address.
    pub aud: String,
    /// Issued-at (unix seconds).
    pub iat: u64,
    /// Expiry (unix seconds).
    pub exp: u64,
    /// Unique per token.
    pub jti: String,
}

/// Signs one short-lived token per call.
pub struct SignedContextProvider {
    secret: Vec<u8>,
    ttl: Duration,
}

impl Debug for SignedContextProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedContextProvider")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SignedContextProvider {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    /// Issues a token for `address` at `now` (unix seconds).
    pub fn sign(&self, address: &ServiceAddress, now: u64) -> Result<String, ContextError> {
        let claims = CallClaims {
            aud: address.as_str().to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl.as_secs()),
            jti: Uuid::new_v4().to_string(),
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|err| ContextError::Credential(format!("call token signing failed: {err}")))
    }
}

#[async_trait]
impl CallContextProvider for SignedContextProvider {
    async fn build(&self, address: &ServiceAddress) -> Result<CallContext, ContextError> {
        let now = unix_now()?;
        let token = self.sign(address, now)?;
        Ok(CallContext::new(address.clone(), Some(token)))
    }
}

fn unix_now() -> Result<u64, ContextError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|err| ContextError::Credential(format!("system clock before unix epoch: {err}")))
}
