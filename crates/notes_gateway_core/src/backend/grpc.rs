//! tonic-backed implementations of the backend contracts.
//!
//! # Invariants
//! - Channels connect lazily; building a client never blocks on the network.
//! - Each call consumes its own `CallContext`, checked against this
//!   client's address before the request leaves the process.

use crate::backend::client::{ItemStream, NotesBackend, UsersBackend};
use crate::backend::ServiceAddress;
use crate::context::CallContext;
use crate::error::BackendError;
use crate::model::note::Note;
use crate::model::user::User;
use crate::pb;
use crate::pb::notes_service_client::NotesServiceClient;
use crate::pb::users_service_client::UsersServiceClient;
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use tonic::transport::{Channel, Endpoint};

fn lazy_channel(address: &ServiceAddress) -> Result<Channel, BackendError> {
    let endpoint = Endpoint::from_shared(address.as_str().to_string())
        .map_err(|err| BackendError::Connect(format!("{address}: {err}")))?;
    Ok(endpoint.connect_lazy())
}

/// Notes service client bound to one address.
#[derive(Clone)]
pub struct GrpcNotesBackend {
    address: ServiceAddress,
    channel: Channel,
}

impl GrpcNotesBackend {
    /// Must be called inside a tokio runtime.
    pub fn connect_lazy(address: &ServiceAddress) -> Result<Self, BackendError> {
        Ok(Self {
            address: address.clone(),
            channel: lazy_channel(address)?,
        })
    }

    fn client(&self) -> NotesServiceClient<Channel> {
        NotesServiceClient::new(self.channel.clone())
    }
}

#[async_trait]
impl NotesBackend for GrpcNotesBackend {
    async fn get_notes(
        &self,
        request: pb::UserId,
        context: CallContext,
    ) -> Result<ItemStream<Note>, BackendError> {
        let request = context.attach(&self.address, request)?;
        let response = self
            .client()
            .get_notes(request)
            .await
            .map_err(BackendError::Stream)?;
        Ok(response
            .into_inner()
            .map_ok(Note::from)
            .map_err(BackendError::Stream)
            .boxed())
    }

    async fn create_note(&self, note: pb::Note, context: CallContext) -> Result<(), BackendError> {
        let request = context.attach(&self.address, note)?;
        self.client()
            .create_note(request)
            .await
            .map(|_| ())
            .map_err(BackendError::Unary)
    }

    async fn delete_note(
        &self,
        request: pb::NoteId,
        context: CallContext,
    ) -> Result<(), BackendError> {
        let request = context.attach(&self.address, request)?;
        self.client()
            .delete_note(request)
            .await
            .map(|_| ())
            .map_err(BackendError::Unary)
    }
}

/// Users service client bound to one address.
#[derive(Clone)]
pub struct GrpcUsersBackend {
    address: ServiceAddress,
    channel: Channel,
}

impl GrpcUsersBackend {
    /// Must be called inside a tokio runtime.
    pub fn connect_lazy(address: &ServiceAddress) -> Result<Self, BackendError> {
        Ok(Self {
            address: address.clone(),
            channel: lazy_channel(address)?,
        })
    }
}

#[async_trait]
impl UsersBackend for GrpcUsersBackend {
    async fn get_users(
        &self,
        request: pb::UserIds,
        context: CallContext,
    ) -> Result<ItemStream<User>, BackendError> {
        let request = context.attach(&self.address, request)?;
        let response = UsersServiceClient::new(self.channel.clone())
            .get_users(request)
            .await
            .map_err(BackendError::Stream)?;
        Ok(response
            .into_inner()
            .map_ok(User::from)
            .map_err(BackendError::Stream)
            .boxed())
    }
}
