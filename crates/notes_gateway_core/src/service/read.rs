//! Read-path fetchers.
//!
//! # Invariants
//! - The note stream is consumed to its terminal event before anything
//!   derived from it is used; a failed stream discards partial results.
//! - The users fetch only ever receives a finalized `OwnerIdSet`.
//! - The users fetch runs as a background task; its failure surfaces when
//!   the `PendingUsers` handle is resolved, not earlier.

use crate::backend::client::{NotesBackend, UsersBackend};
use crate::backend::selector::SelectedBackend;
use crate::context::CallContext;
use crate::error::{BackendError, GatewayError, Operation};
use crate::model::note::{CallerIdentity, Note, OwnerIdCollector, OwnerIdSet};
use crate::model::user::User;
use crate::pb;
use futures::StreamExt;
use log::{debug, error, info};
use std::time::Instant;
use tokio::task::JoinHandle;

/// Complete note collection plus the owners it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesCollection {
    pub notes: Vec<Note>,
    pub owner_ids: OwnerIdSet,
}

/// Streams every note of `caller` from `backend` to completion.
///
/// # Errors
/// Returns the stream failure; notes received before it are dropped.
pub async fn fetch_notes(
    caller: &CallerIdentity,
    backend: &SelectedBackend<dyn NotesBackend>,
    context: CallContext,
) -> Result<NotesCollection, BackendError> {
    let started_at = Instant::now();
    let request = pb::UserId {
        user_id: caller.as_str().to_string(),
    };

    let mut stream = backend.client.get_notes(request, context).await?;
    let mut notes = Vec::new();
    let mut owners = OwnerIdCollector::new();
    while let Some(item) = stream.next().await {
        let note = item?;
        owners.record(&note);
        notes.push(note);
    }
    let owner_ids = owners.finish();

    info!(
        "event=fetch_notes module=read status=ok backend={} count={} owners={} duration_ms={}",
        backend.choice,
        notes.len(),
        owner_ids.len(),
        started_at.elapsed().as_millis()
    );
    Ok(NotesCollection { notes, owner_ids })
}

/// Streams users for exactly `owner_ids` and collects them.
///
/// An empty set still issues the call.
pub async fn collect_users(
    owner_ids: OwnerIdSet,
    backend: &SelectedBackend<dyn UsersBackend>,
    context: CallContext,
) -> Result<Vec<User>, BackendError> {
    let request = pb::UserIds {
        user_ids: owner_ids.into_vec(),
    };
    let mut stream = backend.client.get_users(request, context).await?;
    let mut users = Vec::new();
    while let Some(item) = stream.next().await {
        users.push(item?);
    }
    Ok(users)
}

/// Starts the users fetch in the background and returns its handle.
///
/// Must be called inside a tokio runtime.
pub fn fetch_users(
    owner_ids: OwnerIdSet,
    backend: SelectedBackend<dyn UsersBackend>,
    context: CallContext,
) -> PendingUsers {
    let task = tokio::spawn(async move {
        let started_at = Instant::now();
        let requested = owner_ids.len();
        let result = collect_users(owner_ids, &backend, context).await;
        match &result {
            Ok(users) => info!(
                "event=fetch_users module=read status=ok backend={} requested={} count={} duration_ms={}",
                backend.choice,
                requested,
                users.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=fetch_users module=read status=error backend={} requested={} duration_ms={} error_code={} error={}",
                backend.choice,
                requested,
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
        }
        result
    });
    PendingUsers { task: Some(task) }
}

/// Users fetch already in flight, resolved later by the presentation layer.
///
/// Resolving may fail even though the read that produced this handle
/// succeeded. Dropping an unresolved handle aborts the fetch.
#[derive(Debug)]
pub struct PendingUsers {
    task: Option<JoinHandle<Result<Vec<User>, BackendError>>>,
}

impl PendingUsers {
    /// Waits for the users fetch.
    ///
    /// # Errors
    /// `GatewayError::Internal(Operation::LoadUsers)` for any fetch failure.
    pub async fn resolve(mut self) -> Result<Vec<User>, GatewayError> {
        let Some(task) = self.task.take() else {
            return Err(GatewayError::Internal(Operation::LoadUsers));
        };
        match task.await {
            Ok(Ok(users)) => Ok(users),
            Ok(Err(_)) => Err(GatewayError::Internal(Operation::LoadUsers)),
            Err(join_err) => {
                let err = BackendError::TaskAborted(join_err.to_string());
                error!(
                    "event=resolve_users module=read status=error error_code={} error={}",
                    err.code(),
                    err
                );
                Err(GatewayError::Internal(Operation::LoadUsers))
            }
        }
    }
}

impl Drop for PendingUsers {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!("event=pending_users_drop module=read status=ok action=abort");
            }
            task.abort();
        }
    }
}
