#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use notes_gateway_core::pb;
use notes_gateway_core::{
    AnonymousContextProvider, BackendChoice, BackendError, BackendFamily, BackendSelector,
    CallContext, CallContextProvider, ContextError, ItemStream, Note, NotesBackend,
    NotesGateway, ServiceAddress, User, UsersBackend,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tonic::Status;
use uuid::Uuid;

pub const U1: &str = "11111111-1111-4111-8111-111111111111";
pub const U2: &str = "22222222-2222-4222-8222-222222222222";
pub const U3: &str = "33333333-3333-4333-8333-333333333333";
pub const NOTE_ID: &str = "aaaaaaaa-aaaa-4aaa-8aaa-aaaaaaaaaaaa";

pub const NOTES_GO: &str = "http://notes-go:50051";
pub const NOTES_RUST: &str = "http://notes-rust:50052";
pub const USERS_GO: &str = "http://users-go:50053";
pub const USERS_RUST: &str = "http://users-rust:50054";

/// Observable backend interaction, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    GetNotes {
        family: BackendChoice,
        user_id: String,
        call_id: Uuid,
        authorization: Option<String>,
    },
    NotesDrained {
        family: BackendChoice,
    },
    GetUsers {
        family: BackendChoice,
        user_ids: Vec<String>,
        call_id: Uuid,
        authorization: Option<String>,
    },
    CreateNote {
        family: BackendChoice,
        note: pb::Note,
    },
    DeleteNote {
        family: BackendChoice,
        request: pb::NoteId,
    },
}

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, predicate: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events().iter().position(predicate)
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }
}

pub fn address(value: &str) -> ServiceAddress {
    ServiceAddress::parse(value).unwrap()
}

pub fn note(id: &str, owner: &str, title: &str) -> Note {
    Note {
        id: id.to_string(),
        user_id: owner.to_string(),
        title: title.to_string(),
        content: format!("{title} body"),
        created: "2024-01-01T00:00:00Z".to_string(),
        updated: "2024-01-01T00:00:00Z".to_string(),
    }
}

pub fn user(id: &str, name: &str) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{name}@example.com"),
        ..User::default()
    }
}

fn authorization<T>(request: &tonic::Request<T>) -> Option<String> {
    request
        .metadata()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn call_id<T>(request: &tonic::Request<T>) -> Uuid {
    let raw = request.metadata().get("x-call-id").unwrap().to_str().unwrap();
    Uuid::parse_str(raw).unwrap()
}

pub struct FakeNotes {
    pub family: BackendChoice,
    pub address: ServiceAddress,
    pub notes: Vec<Note>,
    /// Yields an error after this many notes.
    pub fail_after: Option<usize>,
    pub fail_unary: bool,
    pub log: EventLog,
}

#[async_trait]
impl NotesBackend for FakeNotes {
    async fn get_notes(
        &self,
        request: pb::UserId,
        context: CallContext,
    ) -> Result<ItemStream<Note>, BackendError> {
        let request = context.attach(&self.address, request)?;
        self.log.push(Event::GetNotes {
            family: self.family,
            user_id: request.get_ref().user_id.clone(),
            call_id: call_id(&request),
            authorization: authorization(&request),
        });

        let mut items: VecDeque<Result<Note, BackendError>> = VecDeque::new();
        match self.fail_after {
            Some(limit) => {
                items.extend(self.notes.iter().take(limit).cloned().map(Ok));
                items.push_back(Err(BackendError::Stream(Status::unavailable(
                    "notes backend went away",
                ))));
            }
            None => items.extend(self.notes.iter().cloned().map(Ok)),
        }

        let log = self.log.clone();
        let family = self.family;
        Ok(stream::unfold(items, move |mut items| {
            let log = log.clone();
            async move {
                match items.pop_front() {
                    Some(item) => Some((item, items)),
                    None => {
                        log.push(Event::NotesDrained { family });
                        None
                    }
                }
            }
        })
        .boxed())
    }

    async fn create_note(&self, note: pb::Note, context: CallContext) -> Result<(), BackendError> {
        let request = context.attach(&self.address, note)?;
        self.log.push(Event::CreateNote {
            family: self.family,
            note: request.into_inner(),
        });
        if self.fail_unary {
            return Err(BackendError::Unary(Status::internal("insert failed")));
        }
        Ok(())
    }

    async fn delete_note(
        &self,
        request: pb::NoteId,
        context: CallContext,
    ) -> Result<(), BackendError> {
        let request = context.attach(&self.address, request)?;
        self.log.push(Event::DeleteNote {
            family: self.family,
            request: request.into_inner(),
        });
        if self.fail_unary {
            return Err(BackendError::Unary(Status::permission_denied("not the owner")));
        }
        Ok(())
    }
}

/// Holds a users stream open until released, and reports when it is dropped.
#[derive(Clone, Default)]
pub struct UsersGate {
    release: Arc<Notify>,
    dropped: Arc<AtomicBool>,
}

impl UsersGate {
    pub fn open(&self) {
        self.release.notify_one();
    }

    pub fn stream_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Polls `condition` until it holds, failing the test after one second.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 1s");
}

pub struct FakeUsers {
    pub family: BackendChoice,
    pub address: ServiceAddress,
    pub users: Vec<User>,
    pub fail: bool,
    pub gate: Option<UsersGate>,
    pub log: EventLog,
}

#[async_trait]
impl UsersBackend for FakeUsers {
    async fn get_users(
        &self,
        request: pb::UserIds,
        context: CallContext,
    ) -> Result<ItemStream<User>, BackendError> {
        let request = context.attach(&self.address, request)?;
        let user_ids = request.get_ref().user_ids.clone();
        self.log.push(Event::GetUsers {
            family: self.family,
            user_ids: user_ids.clone(),
            call_id: call_id(&request),
            authorization: authorization(&request),
        });

        if self.fail {
            let failed: Result<User, BackendError> =
                Err(BackendError::Stream(Status::unavailable("users backend went away")));
            return Ok(stream::iter(vec![failed]).boxed());
        }
        let matching: Vec<Result<User, BackendError>> = self
            .users
            .iter()
            .filter(|user| user_ids.contains(&user.id))
            .cloned()
            .map(Ok)
            .collect();

        match self.gate.clone() {
            Some(gate) => {
                let guard = DropFlag(Arc::clone(&gate.dropped));
                let held = stream::once(async move {
                    let _guard = guard;
                    gate.release.notified().await;
                    stream::iter(matching)
                })
                .flatten();
                Ok(held.boxed())
            }
            None => Ok(stream::iter(matching).boxed()),
        }
    }
}

/// Records every address a context was built for.
pub struct RecordingContexts {
    inner: Arc<dyn CallContextProvider>,
    pub built: Arc<Mutex<Vec<ServiceAddress>>>,
    pub fail_for: Option<ServiceAddress>,
}

impl RecordingContexts {
    pub fn anonymous() -> Self {
        Self::wrapping(Arc::new(AnonymousContextProvider))
    }

    pub fn wrapping(inner: Arc<dyn CallContextProvider>) -> Self {
        Self {
            inner,
            built: Arc::new(Mutex::new(Vec::new())),
            fail_for: None,
        }
    }
}

#[async_trait]
impl CallContextProvider for RecordingContexts {
    async fn build(&self, address: &ServiceAddress) -> Result<CallContext, ContextError> {
        self.built.lock().unwrap().push(address.clone());
        if self.fail_for.as_ref() == Some(address) {
            return Err(ContextError::Credential("token service unavailable".to_string()));
        }
        self.inner.build(address).await
    }
}

/// Knobs for one test gateway.
#[derive(Default)]
pub struct Setup {
    pub go_notes: Vec<Note>,
    pub rust_notes: Vec<Note>,
    pub users: Vec<User>,
    pub notes_fail_after: Option<usize>,
    pub notes_fail_unary: bool,
    pub users_fail: bool,
    pub users_gate: Option<UsersGate>,
    pub context_fail_for: Option<&'static str>,
    pub contexts: Option<Arc<dyn CallContextProvider>>,
}

pub struct Harness {
    pub gateway: NotesGateway,
    pub log: EventLog,
    pub built: Arc<Mutex<Vec<ServiceAddress>>>,
}

impl Harness {
    pub fn built_addresses(&self) -> Vec<String> {
        self.built
            .lock()
            .unwrap()
            .iter()
            .map(|address| address.to_string())
            .collect()
    }
}

pub fn harness(setup: Setup) -> Harness {
    let log = EventLog::default();

    let notes = |family: BackendChoice, addr: &str, items: Vec<Note>| -> Arc<dyn NotesBackend> {
        Arc::new(FakeNotes {
            family,
            address: address(addr),
            notes: items,
            fail_after: setup.notes_fail_after,
            fail_unary: setup.notes_fail_unary,
            log: log.clone(),
        })
    };
    let users = |family: BackendChoice, addr: &str| -> Arc<dyn UsersBackend> {
        Arc::new(FakeUsers {
            family,
            address: address(addr),
            users: setup.users.clone(),
            fail: setup.users_fail,
            gate: setup.users_gate.clone(),
            log: log.clone(),
        })
    };

    let selector = BackendSelector::new(
        BackendFamily::new(
            address(NOTES_GO),
            notes(BackendChoice::Go, NOTES_GO, setup.go_notes.clone()),
            address(NOTES_RUST),
            notes(BackendChoice::Rust, NOTES_RUST, setup.rust_notes.clone()),
        ),
        BackendFamily::new(
            address(USERS_GO),
            users(BackendChoice::Go, USERS_GO),
            address(USERS_RUST),
            users(BackendChoice::Rust, USERS_RUST),
        ),
        BackendChoice::Rust,
    );

    let mut contexts = match setup.contexts.clone() {
        Some(inner) => RecordingContexts::wrapping(inner),
        None => RecordingContexts::anonymous(),
    };
    contexts.fail_for = setup.context_fail_for.map(address);
    let built = Arc::clone(&contexts.built);

    Harness {
        gateway: NotesGateway::new(selector, Arc::new(contexts)),
        log,
        built,
    }
}
