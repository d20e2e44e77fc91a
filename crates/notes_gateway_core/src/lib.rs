//! Core of the notes gateway.
//! Fans reads and mutations out to one of two interchangeable notes/users
//! backend families and aggregates the results.

#[allow(clippy::all)]
pub mod pb {
    tonic::include_proto!("proto");
}

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod model;
pub mod service;

pub use backend::client::{ItemStream, NotesBackend, UsersBackend};
pub use backend::selector::{BackendFamily, BackendSelector, SelectedBackend};
pub use backend::{BackendChoice, ServiceAddress};
pub use config::{ConfigError, FamilyAddresses, GatewayConfig};
pub use context::{
    AnonymousContextProvider, CallClaims, CallContext, CallContextProvider, ContextError,
    SignedContextProvider,
};
pub use error::{BackendError, GatewayError, Operation};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{CallerIdentity, Note, OwnerIdSet};
pub use model::user::{User, UserRole};
pub use service::gateway::{MutationOutcome, NotesGateway, NotesPage};
pub use service::read::PendingUsers;
pub use service::validation::{FieldErrors, FormFields};

/// Returns the core crate version.
pub fn gateway_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
