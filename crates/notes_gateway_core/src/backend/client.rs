//! Client contracts for the notes and users backends.
//!
//! Both implementations of a family speak the same protocol, so one trait
//! per family covers them. Tests plug in-memory fakes in at this seam.

use crate::context::CallContext;
use crate::error::BackendError;
use crate::model::note::Note;
use crate::model::user::User;
use crate::pb;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Lazy, finite, single-pass sequence produced by a server-streaming call.
///
/// Ends either with `None` (completion) or after yielding one `Err`
/// (failure); consumers stop at the first error.
pub type ItemStream<T> = BoxStream<'static, Result<T, BackendError>>;

#[async_trait]
pub trait NotesBackend: Send + Sync {
    /// Opens `GetNotes`, streaming every note owned by `request.user_id`.
    async fn get_notes(
        &self,
        request: pb::UserId,
        context: CallContext,
    ) -> Result<ItemStream<Note>, BackendError>;

    /// Unary `CreateNote`; the backend assigns an id when `note.id` is empty.
    async fn create_note(&self, note: pb::Note, context: CallContext) -> Result<(), BackendError>;

    /// Unary `DeleteNote`; the backend enforces ownership.
    async fn delete_note(
        &self,
        request: pb::NoteId,
        context: CallContext,
    ) -> Result<(), BackendError>;
}

#[async_trait]
pub trait UsersBackend: Send + Sync {
    /// Opens `GetUsers` for exactly the requested ids.
    async fn get_users(
        &self,
        request: pb::UserIds,
        context: CallContext,
    ) -> Result<ItemStream<User>, BackendError>;
}
