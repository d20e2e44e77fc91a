//! Process-wide gateway configuration.
//!
//! Loaded once at startup and passed by reference; request handling never
//! reads the environment.
//!
//! | Variable                  | Default          | Description                                |
//! |---------------------------|------------------|--------------------------------------------|
//! | `URI_NOTES_GO`            | required         | Go notes service URI                       |
//! | `URI_NOTES_RUST`          | required         | Rust notes service URI                     |
//! | `URI_USERS_GO`            | required         | Go users service URI                       |
//! | `URI_USERS_RUST`          | required         | Rust users service URI                     |
//! | `GATEWAY_DEFAULT_BACKEND` | `rust`           | Fallback for unknown discriminators        |
//! | `GATEWAY_AUTH_SECRET`     | unset            | Enables signed per-call credentials        |
//! | `GATEWAY_TOKEN_TTL_SECS`  | `300`            | Lifetime of a signed credential            |
//! | `GATEWAY_LOG_LEVEL`       | build dependent  | trace/debug/info/warn/error                |
//! | `GATEWAY_LOG_DIR`         | unset (stderr)   | Absolute directory for rolling log files   |

use crate::backend::{BackendChoice, ServiceAddress};
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_URI_NOTES_GO: &str = "URI_NOTES_GO";
pub const ENV_URI_NOTES_RUST: &str = "URI_NOTES_RUST";
pub const ENV_URI_USERS_GO: &str = "URI_USERS_GO";
pub const ENV_URI_USERS_RUST: &str = "URI_USERS_RUST";
pub const ENV_DEFAULT_BACKEND: &str = "GATEWAY_DEFAULT_BACKEND";
pub const ENV_AUTH_SECRET: &str = "GATEWAY_AUTH_SECRET";
pub const ENV_TOKEN_TTL_SECS: &str = "GATEWAY_TOKEN_TTL_SECS";
pub const ENV_LOG_LEVEL: &str = "GATEWAY_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "GATEWAY_LOG_DIR";

const DEFAULT_TOKEN_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    InvalidUri { var: &'static str, value: String },
    InvalidValue { var: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "missing required variable `{var}`"),
            Self::InvalidUri { var, value } => {
                write!(f, "`{var}` must be an absolute http(s) URI, got `{value}`")
            }
            Self::InvalidValue { var, value } => write!(f, "invalid value `{value}` for `{var}`"),
        }
    }
}

impl Error for ConfigError {}

/// Addresses of both implementations of one resource family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyAddresses {
    pub go: ServiceAddress,
    pub rust: ServiceAddress,
}

#[derive(Clone)]
pub struct GatewayConfig {
    pub notes: FamilyAddresses,
    pub users: FamilyAddresses,
    pub default_backend: BackendChoice,
    /// `None` disables signed credentials.
    pub auth_secret: Option<String>,
    pub token_ttl: Duration,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Debug for GatewayConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("notes", &self.notes)
            .field("users", &self.users)
            .field("default_backend", &self.default_backend)
            .field(
                "auth_secret",
                &self.auth_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("token_ttl", &self.token_ttl)
            .field("log_level", &self.log_level)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl GatewayConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let notes = FamilyAddresses {
            go: required_address(&lookup, ENV_URI_NOTES_GO)?,
            rust: required_address(&lookup, ENV_URI_NOTES_RUST)?,
        };
        let users = FamilyAddresses {
            go: required_address(&lookup, ENV_URI_USERS_GO)?,
            rust: required_address(&lookup, ENV_URI_USERS_RUST)?,
        };

        let default_backend = match non_empty(&lookup, ENV_DEFAULT_BACKEND) {
            Some(value) => BackendChoice::parse_strict(value.as_str()).ok_or(
                ConfigError::InvalidValue {
                    var: ENV_DEFAULT_BACKEND,
                    value,
                },
            )?,
            None => BackendChoice::Rust,
        };

        let token_ttl = match non_empty(&lookup, ENV_TOKEN_TTL_SECS) {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: ENV_TOKEN_TTL_SECS,
                        value,
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
        };

        let log_dir = match non_empty(&lookup, ENV_LOG_DIR) {
            Some(value) => {
                let path = PathBuf::from(&value);
                if !path.is_absolute() {
                    return Err(ConfigError::InvalidValue {
                        var: ENV_LOG_DIR,
                        value,
                    });
                }
                Some(path)
            }
            None => None,
        };

        Ok(Self {
            notes,
            users,
            default_backend,
            auth_secret: non_empty(&lookup, ENV_AUTH_SECRET),
            token_ttl,
            log_level: non_empty(&lookup, ENV_LOG_LEVEL)
                .unwrap_or_else(|| default_log_level().to_string()),
            log_dir,
        })
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required_address(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<ServiceAddress, ConfigError> {
    let value = non_empty(lookup, var).ok_or(ConfigError::Missing(var))?;
    ServiceAddress::parse(&value).ok_or(ConfigError::InvalidUri { var, value })
}
