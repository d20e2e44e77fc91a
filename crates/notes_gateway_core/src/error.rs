//! Error taxonomy for gateway operations.
//!
//! # Responsibility
//! - `BackendError` keeps full infrastructure detail for logs.
//! - `GatewayError` is what callers see: field-level detail for their own
//!   input, one generic message per operation for everything else.
//!
//! # Invariants
//! - `GatewayError::Internal` never carries backend detail.

use crate::context::ContextError;
use crate::service::validation::FieldErrors;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tonic::Status;

/// Inbound operation an error is reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LoadNotes,
    LoadUsers,
    CreateNote,
    DeleteNote,
}

impl Operation {
    /// Stable name used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LoadNotes => "load_notes",
            Self::LoadUsers => "load_users",
            Self::CreateNote => "create_note",
            Self::DeleteNote => "delete_note",
        }
    }

    /// Generic caller-facing failure message.
    pub fn public_message(self) -> &'static str {
        match self {
            Self::LoadNotes => "Could not load notes",
            Self::LoadUsers => "Could not load users",
            Self::CreateNote => "Could not create note",
            Self::DeleteNote => "Failed to delete note",
        }
    }
}

/// Infrastructure failure talking to a backend.
#[derive(Debug)]
pub enum BackendError {
    /// Channel could not be established.
    Connect(String),
    /// Call credentials could not be built.
    Context(ContextError),
    /// Server-streaming call failed to open or terminated with an error.
    Stream(Status),
    /// Unary call failed.
    Unary(Status),
    /// Background fetch task panicked or was cancelled.
    TaskAborted(String),
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect(message) => write!(f, "backend connect failed: {message}"),
            Self::Context(err) => write!(f, "call context build failed: {err}"),
            Self::Stream(status) => write!(
                f,
                "stream failed: code={:?} message={}",
                status.code(),
                status.message()
            ),
            Self::Unary(status) => write!(
                f,
                "unary call failed: code={:?} message={}",
                status.code(),
                status.message()
            ),
            Self::TaskAborted(message) => write!(f, "background fetch aborted: {message}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Context(err) => Some(err),
            Self::Stream(status) | Self::Unary(status) => Some(status),
            Self::Connect(_) | Self::TaskAborted(_) => None,
        }
    }
}

impl From<ContextError> for BackendError {
    fn from(value: ContextError) -> Self {
        Self::Context(value)
    }
}

impl BackendError {
    /// Short machine-readable code for log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect_failed",
            Self::Context(_) => "context_build_failed",
            Self::Stream(_) => "stream_failed",
            Self::Unary(_) => "unary_call_failed",
            Self::TaskAborted(_) => "task_aborted",
        }
    }
}

/// Failure surfaced to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Create-note input rejected; details are safe to show.
    Validation(FieldErrors),
    /// Delete-note input rejected, including an unknown backend choice.
    BadRequest(FieldErrors),
    /// Infrastructure failure, logged in full and reported generically.
    Internal(Operation),
}

impl GatewayError {
    /// HTTP-style status for the presentation layer.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 409,
            Self::BadRequest(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Invalid note",
            Self::BadRequest(_) => "Missing id",
            Self::Internal(operation) => operation.public_message(),
        }
    }

    /// Field-level detail, present only for caller-input failures.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) | Self::BadRequest(errors) => Some(errors),
            Self::Internal(_) => None,
        }
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.public_message(), self.status_code())
    }
}

impl Error for GatewayError {}
