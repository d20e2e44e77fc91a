//! Discriminator-to-backend resolution for the notes and users families.
//!
//! # Invariants
//! - Selection is pure: no I/O, no state changes.
//! - Known tokens map to a stable, distinct pair per family.
//! - Lenient selection never fails; unknown tokens map to the default.

use crate::backend::client::{NotesBackend, UsersBackend};
use crate::backend::grpc::{GrpcNotesBackend, GrpcUsersBackend};
use crate::backend::{BackendChoice, ServiceAddress};
use crate::config::GatewayConfig;
use crate::error::BackendError;
use std::sync::Arc;

/// One resolved (address, client) pair.
pub struct SelectedBackend<C: ?Sized> {
    pub choice: BackendChoice,
    pub address: ServiceAddress,
    pub client: Arc<C>,
}

impl<C: ?Sized> Clone for SelectedBackend<C> {
    fn clone(&self) -> Self {
        Self {
            choice: self.choice,
            address: self.address.clone(),
            client: Arc::clone(&self.client),
        }
    }
}

/// Both implementations of one resource family.
pub struct BackendFamily<C: ?Sized> {
    go: SelectedBackend<C>,
    rust: SelectedBackend<C>,
}

impl<C: ?Sized> BackendFamily<C> {
    pub fn new(
        go_address: ServiceAddress,
        go_client: Arc<C>,
        rust_address: ServiceAddress,
        rust_client: Arc<C>,
    ) -> Self {
        Self {
            go: SelectedBackend {
                choice: BackendChoice::Go,
                address: go_address,
                client: go_client,
            },
            rust: SelectedBackend {
                choice: BackendChoice::Rust,
                address: rust_address,
                client: rust_client,
            },
        }
    }

    pub fn get(&self, choice: BackendChoice) -> SelectedBackend<C> {
        match choice {
            BackendChoice::Go => self.go.clone(),
            BackendChoice::Rust => self.rust.clone(),
        }
    }
}

/// Resolves backend choices for the notes and users families.
pub struct BackendSelector {
    notes: BackendFamily<dyn NotesBackend>,
    users: BackendFamily<dyn UsersBackend>,
    default_choice: BackendChoice,
}

impl BackendSelector {
    pub fn new(
        notes: BackendFamily<dyn NotesBackend>,
        users: BackendFamily<dyn UsersBackend>,
        default_choice: BackendChoice,
    ) -> Self {
        Self {
            notes,
            users,
            default_choice,
        }
    }

    /// Builds lazily connected gRPC clients for all four configured addresses.
    ///
    /// Must be called inside a tokio runtime.
    pub fn connect_lazy(config: &GatewayConfig) -> Result<Self, BackendError> {
        let notes_go: Arc<dyn NotesBackend> =
            Arc::new(GrpcNotesBackend::connect_lazy(&config.notes.go)?);
        let notes_rust: Arc<dyn NotesBackend> =
            Arc::new(GrpcNotesBackend::connect_lazy(&config.notes.rust)?);
        let users_go: Arc<dyn UsersBackend> =
            Arc::new(GrpcUsersBackend::connect_lazy(&config.users.go)?);
        let users_rust: Arc<dyn UsersBackend> =
            Arc::new(GrpcUsersBackend::connect_lazy(&config.users.rust)?);

        Ok(Self::new(
            BackendFamily::new(
                config.notes.go.clone(),
                notes_go,
                config.notes.rust.clone(),
                notes_rust,
            ),
            BackendFamily::new(
                config.users.go.clone(),
                users_go,
                config.users.rust.clone(),
                users_rust,
            ),
            config.default_backend,
        ))
    }

    pub fn default_choice(&self) -> BackendChoice {
        self.default_choice
    }

    /// Lenient resolution used by the read and create paths.
    pub fn resolve(&self, discriminator: Option<&str>) -> BackendChoice {
        BackendChoice::resolve_or(discriminator, self.default_choice)
    }

    pub fn notes(&self, choice: BackendChoice) -> SelectedBackend<dyn NotesBackend> {
        self.notes.get(choice)
    }

    pub fn users(&self, choice: BackendChoice) -> SelectedBackend<dyn UsersBackend> {
        self.users.get(choice)
    }

    pub fn select_notes(&self, discriminator: Option<&str>) -> SelectedBackend<dyn NotesBackend> {
        self.notes(self.resolve(discriminator))
    }

    pub fn select_users(&self, discriminator: Option<&str>) -> SelectedBackend<dyn UsersBackend> {
        self.users(self.resolve(discriminator))
    }
}
