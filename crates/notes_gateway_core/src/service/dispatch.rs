//! Unary create/delete dispatch.
//!
//! # Invariants
//! - The dispatched owner is always the caller's session identity.
//! - Ownership checks for delete belong to the backend; whatever it
//!   reports is surfaced unchanged.

use crate::backend::client::NotesBackend;
use crate::backend::selector::SelectedBackend;
use crate::context::CallContext;
use crate::error::BackendError;
use crate::model::note::CallerIdentity;
use crate::pb;
use crate::service::validation::ValidatedCreate;
use log::info;
use std::time::Instant;

/// Issues `CreateNote` for validated input, owned by `caller`.
pub async fn create_note(
    caller: &CallerIdentity,
    data: &ValidatedCreate,
    backend: &SelectedBackend<dyn NotesBackend>,
    context: CallContext,
) -> Result<(), BackendError> {
    let started_at = Instant::now();
    let note = pb::Note {
        id: data.id.clone().unwrap_or_default(),
        user_id: caller.as_str().to_string(),
        title: data.title.clone(),
        content: data.content.clone(),
        ..pb::Note::default()
    };

    backend.client.create_note(note, context).await?;
    info!(
        "event=dispatch_create module=dispatch status=ok backend={} backend_assigns_id={} duration_ms={}",
        backend.choice,
        data.id.is_none(),
        started_at.elapsed().as_millis()
    );
    Ok(())
}

/// Issues `DeleteNote` for `note_id` on behalf of `caller`.
pub async fn delete_note(
    caller: &CallerIdentity,
    note_id: &str,
    backend: &SelectedBackend<dyn NotesBackend>,
    context: CallContext,
) -> Result<(), BackendError> {
    let started_at = Instant::now();
    let request = pb::NoteId {
        note_id: note_id.to_string(),
        user_id: caller.as_str().to_string(),
    };

    backend.client.delete_note(request, context).await?;
    info!(
        "event=dispatch_delete module=dispatch status=ok backend={} duration_ms={}",
        backend.choice,
        started_at.elapsed().as_millis()
    );
    Ok(())
}
