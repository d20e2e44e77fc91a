//! Inbound operations surfaced to the presentation layer.
//!
//! # Responsibility
//! - Read: select, build context, collect notes, hand off the users fetch.
//! - Create/delete: validate, select, build context, dispatch.
//!
//! # Invariants
//! - A fresh call context is built right before every outbound call, for
//!   that call's address.
//! - Mutations are strictly sequential, one backend call at a time.
//! - Infrastructure failures are logged in full and surfaced generically.

use crate::backend::selector::BackendSelector;
use crate::config::GatewayConfig;
use crate::context::{AnonymousContextProvider, CallContextProvider, SignedContextProvider};
use crate::error::{BackendError, GatewayError, Operation};
use crate::model::note::{CallerIdentity, Note};
use crate::service::dispatch;
use crate::service::read::{fetch_notes, fetch_users, PendingUsers};
use crate::service::validation::{validate_create, validate_delete, FormFields, FIELD_TYPE};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Result of a notes read.
#[derive(Debug)]
pub struct NotesPage {
    pub notes: Vec<Note>,
    /// Wall-clock time spent before the page was returned.
    pub elapsed_ms: f64,
    pub count: usize,
    /// Users referenced by `notes`, still being fetched.
    pub users: PendingUsers,
}

/// Result of a successful create/delete.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub duration_ms: f64,
}

/// Aggregation and dispatch entry point; one instance serves all requests.
pub struct NotesGateway {
    selector: BackendSelector,
    contexts: Arc<dyn CallContextProvider>,
}

impl NotesGateway {
    pub fn new(selector: BackendSelector, contexts: Arc<dyn CallContextProvider>) -> Self {
        Self { selector, contexts }
    }

    /// Wires lazily connected gRPC backends and the configured credential mode.
    ///
    /// Must be called inside a tokio runtime.
    pub fn connect_lazy(config: &GatewayConfig) -> Result<Self, BackendError> {
        let selector = BackendSelector::connect_lazy(config)?;
        let contexts: Arc<dyn CallContextProvider> = match config.auth_secret.as_deref() {
            Some(secret) => Arc::new(SignedContextProvider::new(
                secret.as_bytes().to_vec(),
                config.token_ttl,
            )),
            None => Arc::new(AnonymousContextProvider),
        };
        Ok(Self::new(selector, contexts))
    }

    /// Loads the caller's notes and starts the users fetch.
    ///
    /// `lang` is the read-path discriminator; unknown values use the default
    /// backend. The returned page does not wait for users.
    ///
    /// Must be called inside a tokio runtime.
    pub async fn load_notes(
        &self,
        caller: &CallerIdentity,
        lang: Option<&str>,
    ) -> Result<NotesPage, GatewayError> {
        let started_at = Instant::now();
        let choice = self.selector.resolve(lang);

        let notes_backend = self.selector.notes(choice);
        let context = self
            .contexts
            .build(&notes_backend.address)
            .await
            .map_err(|err| report(Operation::LoadNotes, &BackendError::from(err)))?;
        let collection = fetch_notes(caller, &notes_backend, context)
            .await
            .map_err(|err| report(Operation::LoadNotes, &err))?;

        let users_backend = self.selector.users(choice);
        let context = self
            .contexts
            .build(&users_backend.address)
            .await
            .map_err(|err| report(Operation::LoadNotes, &BackendError::from(err)))?;
        let users = fetch_users(collection.owner_ids, users_backend, context);

        let count = collection.notes.len();
        let elapsed_ms = elapsed_ms(started_at);
        info!(
            "event=load_notes module=gateway status=ok backend={} count={} duration_ms={:.3}",
            choice, count, elapsed_ms
        );
        Ok(NotesPage {
            notes: collection.notes,
            elapsed_ms,
            count,
            users,
        })
    }

    /// Validates and dispatches a create-note form.
    ///
    /// The form `type` field selects the backend with the same fallback as
    /// reads; the owner is always `caller`.
    pub async fn create_note(
        &self,
        caller: &CallerIdentity,
        form: &FormFields,
    ) -> Result<MutationOutcome, GatewayError> {
        let started_at = Instant::now();
        let validated = validate_create(form, caller).map_err(|errors| {
            warn!(
                "event=create_note module=gateway status=rejected fields={}",
                errors.fields().collect::<Vec<_>>().join(",")
            );
            GatewayError::Validation(errors)
        })?;

        let backend = self.selector.select_notes(form.get(FIELD_TYPE));
        let context = self
            .contexts
            .build(&backend.address)
            .await
            .map_err(|err| report(Operation::CreateNote, &BackendError::from(err)))?;
        dispatch::create_note(caller, &validated, &backend, context)
            .await
            .map_err(|err| report(Operation::CreateNote, &err))?;

        Ok(MutationOutcome {
            duration_ms: elapsed_ms(started_at),
        })
    }

    /// Validates and dispatches a delete-note form.
    ///
    /// The form `type` field must name a backend exactly; there is no fallback.
    pub async fn delete_note(
        &self,
        caller: &CallerIdentity,
        form: &FormFields,
    ) -> Result<MutationOutcome, GatewayError> {
        let started_at = Instant::now();
        let validated = validate_delete(form).map_err(|errors| {
            warn!(
                "event=delete_note module=gateway status=rejected fields={}",
                errors.fields().collect::<Vec<_>>().join(",")
            );
            GatewayError::BadRequest(errors)
        })?;

        let backend = self.selector.notes(validated.backend);
        let context = self
            .contexts
            .build(&backend.address)
            .await
            .map_err(|err| report(Operation::DeleteNote, &BackendError::from(err)))?;
        dispatch::delete_note(caller, &validated.id, &backend, context)
            .await
            .map_err(|err| report(Operation::DeleteNote, &err))?;

        Ok(MutationOutcome {
            duration_ms: elapsed_ms(started_at),
        })
    }
}

fn report(operation: Operation, err: &BackendError) -> GatewayError {
    error!(
        "event={} module=gateway status=error error_code={} error={}",
        operation.as_str(),
        err.code(),
        err
    );
    GatewayError::Internal(operation)
}

fn elapsed_ms(started_at: Instant) -> f64 {
    started_at.elapsed().as_secs_f64() * 1000.0
}
