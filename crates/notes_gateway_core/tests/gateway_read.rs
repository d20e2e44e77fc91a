mod common;

use common::{
    harness, note, user, wait_until, Event, Setup, UsersGate, NOTES_GO, NOTES_RUST, U1, U2, U3,
    USERS_GO, USERS_RUST,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use notes_gateway_core::{
    BackendChoice, CallClaims, CallerIdentity, GatewayError, Operation, SignedContextProvider,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn shared_notes() -> Vec<notes_gateway_core::Note> {
    vec![
        note("n1", U1, "first"),
        note("n2", U2, "shared"),
        note("n3", U1, "third"),
    ]
}

#[tokio::test]
async fn load_requests_exactly_the_referenced_owners_after_notes_drain() {
    let h = harness(Setup {
        rust_notes: shared_notes(),
        users: vec![user(U1, "ada"), user(U2, "grace"), user(U3, "linus")],
        ..Setup::default()
    });

    let page = h
        .gateway
        .load_notes(&CallerIdentity::new(U1), None)
        .await
        .unwrap();
    assert_eq!(page.count, 3);
    assert_eq!(page.notes.len(), 3);
    assert_eq!(page.notes[1].title, "shared");
    assert!(page.elapsed_ms >= 0.0);

    let mut users = page.users.resolve().await.unwrap();
    users.sort_by(|a, b| a.id.cmp(&b.id));
    let ids: Vec<&str> = users.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec![U1, U2]);

    let events = h.log.events();
    let requested = events
        .iter()
        .find_map(|event| match event {
            Event::GetUsers { user_ids, .. } => Some(user_ids.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(requested, vec![U1.to_string(), U2.to_string()]);

    let drained = h
        .log
        .position(|event| matches!(event, Event::NotesDrained { .. }))
        .unwrap();
    let users_call = h
        .log
        .position(|event| matches!(event, Event::GetUsers { .. }))
        .unwrap();
    assert!(drained < users_call);
}

#[tokio::test]
async fn load_sends_caller_identity_to_notes_backend() {
    let h = harness(Setup::default());

    let page = h
        .gateway
        .load_notes(&CallerIdentity::new(U2), None)
        .await
        .unwrap();
    drop(page);

    let user_id = h
        .log
        .events()
        .into_iter()
        .find_map(|event| match event {
            Event::GetNotes { user_id, .. } => Some(user_id),
            _ => None,
        })
        .unwrap();
    assert_eq!(user_id, U2);
}

#[tokio::test]
async fn lang_go_routes_both_calls_to_go_family() {
    let h = harness(Setup {
        go_notes: vec![note("g1", U1, "from go")],
        rust_notes: vec![note("r1", U1, "from rust")],
        users: vec![user(U1, "ada")],
        ..Setup::default()
    });

    let page = h
        .gateway
        .load_notes(&CallerIdentity::new(U1), Some("go"))
        .await
        .unwrap();
    assert_eq!(page.notes[0].title, "from go");
    page.users.resolve().await.unwrap();

    for event in h.log.events() {
        match event {
            Event::GetNotes { family, .. }
            | Event::GetUsers { family, .. }
            | Event::NotesDrained { family } => assert_eq!(family, BackendChoice::Go),
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(h.built_addresses(), vec![NOTES_GO, USERS_GO]);
}

#[tokio::test]
async fn unknown_or_missing_lang_falls_back_to_default_family() {
    for lang in [None, Some("python"), Some("GO"), Some("")] {
        let h = harness(Setup {
            go_notes: vec![note("g1", U1, "from go")],
            rust_notes: vec![note("r1", U1, "from rust")],
            ..Setup::default()
        });

        let page = h
            .gateway
            .load_notes(&CallerIdentity::new(U1), lang)
            .await
            .unwrap();
        assert_eq!(page.notes[0].title, "from rust", "lang={lang:?}");
        page.users.resolve().await.unwrap();
        assert_eq!(h.built_addresses(), vec![NOTES_RUST, USERS_RUST]);
    }
}

#[tokio::test]
async fn empty_collection_still_issues_users_call_with_no_ids() {
    let h = harness(Setup::default());

    let page = h
        .gateway
        .load_notes(&CallerIdentity::new(U1), None)
        .await
        .unwrap();
    assert_eq!(page.count, 0);
    assert!(page.users.resolve().await.unwrap().is_empty());

    let requested = h
        .log
        .events()
        .into_iter()
        .find_map(|event| match event {
            Event::GetUsers { user_ids, .. } => Some(user_ids),
            _ => None,
        })
        .unwrap();
    assert!(requested.is_empty());
}

#[tokio::test]
async fn notes_stream_failure_discards_partial_results_and_skips_users() {
    for fail_after in [0, 2] {
        let h = harness(Setup {
            rust_notes: shared_notes(),
            notes_fail_after: Some(fail_after),
            ..Setup::default()
        });

        let err = h
            .gateway
            .load_notes(&CallerIdentity::new(U1), None)
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::Internal(Operation::LoadNotes));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.public_message(), "Could not load notes");
        assert!(err.field_errors().is_none());
        assert_eq!(
            h.log
                .count(|event| matches!(event, Event::GetUsers { .. })),
            0
        );
    }
}

#[tokio::test]
async fn users_failure_surfaces_only_when_resolved() {
    let h = harness(Setup {
        rust_notes: shared_notes(),
        users_fail: true,
        ..Setup::default()
    });

    let page = h
        .gateway
        .load_notes(&CallerIdentity::new(U1), None)
        .await
        .unwrap();
    assert_eq!(page.count, 3);

    let err = page.users.resolve().await.unwrap_err();
    assert_eq!(err, GatewayError::Internal(Operation::LoadUsers));
    assert_eq!(err.public_message(), "Could not load users");
}

#[tokio::test]
async fn every_outbound_call_gets_a_fresh_context_for_its_address() {
    let h = harness(Setup {
        rust_notes: shared_notes(),
        ..Setup::default()
    });
    let caller = CallerIdentity::new(U1);

    for _ in 0..2 {
        let page = h.gateway.load_notes(&caller, None).await.unwrap();
        page.users.resolve().await.unwrap();
    }

    assert_eq!(
        h.built_addresses(),
        vec![NOTES_RUST, USERS_RUST, NOTES_RUST, USERS_RUST]
    );
    let mut call_ids: Vec<_> = h
        .log
        .events()
        .into_iter()
        .filter_map(|event| match event {
            Event::GetNotes { call_id, .. } | Event::GetUsers { call_id, .. } => Some(call_id),
            _ => None,
        })
        .collect();
    assert_eq!(call_ids.len(), 4);
    call_ids.sort();
    call_ids.dedup();
    assert_eq!(call_ids.len(), 4);
}

#[tokio::test]
async fn context_failure_for_users_aborts_the_read() {
    let h = harness(Setup {
        rust_notes: shared_notes(),
        context_fail_for: Some(USERS_RUST),
        ..Setup::default()
    });

    let err = h
        .gateway
        .load_notes(&CallerIdentity::new(U1), None)
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::Internal(Operation::LoadNotes));
    assert_eq!(
        h.log
            .count(|event| matches!(event, Event::GetUsers { .. })),
        0
    );
}

#[tokio::test]
async fn context_failure_for_notes_makes_no_backend_call() {
    let h = harness(Setup {
        context_fail_for: Some(NOTES_RUST),
        ..Setup::default()
    });

    let err = h
        .gateway
        .load_notes(&CallerIdentity::new(U1), None)
        .await
        .unwrap_err();
    assert_eq!(err.public_message(), "Could not load notes");
    assert!(h.log.events().is_empty());
}

#[tokio::test]
async fn signed_contexts_carry_audience_bound_bearer_tokens() {
    let signer = Arc::new(SignedContextProvider::new(
        b"integration-secret".to_vec(),
        Duration::from_secs(60),
    ));
    let h = harness(Setup {
        rust_notes: shared_notes(),
        contexts: Some(signer),
        ..Setup::default()
    });

    let page = h
        .gateway
        .load_notes(&CallerIdentity::new(U1), None)
        .await
        .unwrap();
    page.users.resolve().await.unwrap();

    let decode = |token: &str, audience: &str| {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        jsonwebtoken::decode::<CallClaims>(
            token,
            &DecodingKey::from_secret(b"integration-secret"),
            &validation,
        )
    };

    let mut checked = 0;
    for event in h.log.events() {
        let (header, target, other) = match event {
            Event::GetNotes { authorization, .. } => (authorization, NOTES_RUST, USERS_RUST),
            Event::GetUsers { authorization, .. } => (authorization, USERS_RUST, NOTES_RUST),
            _ => continue,
        };
        let header = header.expect("authorization metadata");
        let token = header.strip_prefix("Bearer ").unwrap();
        assert_eq!(decode(token, target).unwrap().claims.aud, target);
        assert!(decode(token, other).is_err());
        checked += 1;
    }
    assert_eq!(checked, 2);
}

#[tokio::test]
async fn load_returns_while_users_fetch_is_still_running() {
    let gate = UsersGate::default();
    let h = harness(Setup {
        rust_notes: shared_notes(),
        users: vec![user(U1, "ada"), user(U2, "grace")],
        users_gate: Some(gate.clone()),
        ..Setup::default()
    });

    let page = timeout(
        Duration::from_secs(1),
        h.gateway.load_notes(&CallerIdentity::new(U1), None),
    )
    .await
    .expect("read must not wait for users")
    .unwrap();
    assert_eq!(page.count, 3);

    let mut resolving = Box::pin(page.users.resolve());
    assert!(futures::poll!(resolving.as_mut()).is_pending());

    gate.open();
    let users = timeout(Duration::from_secs(1), resolving)
        .await
        .expect("users resolve once released")
        .unwrap();
    assert_eq!(users.len(), 2);
}

#[tokio::test]
async fn dropping_an_unresolved_page_aborts_the_users_fetch() {
    let gate = UsersGate::default();
    let h = harness(Setup {
        rust_notes: shared_notes(),
        users_gate: Some(gate.clone()),
        ..Setup::default()
    });

    let page = h
        .gateway
        .load_notes(&CallerIdentity::new(U1), None)
        .await
        .unwrap();
    let log = h.log.clone();
    wait_until(|| log.count(|event| matches!(event, Event::GetUsers { .. })) == 1).await;
    assert!(!gate.stream_dropped());

    drop(page);
    wait_until(|| gate.stream_dropped()).await;
}

#[tokio::test]
async fn dropping_an_unresolved_page_does_not_disturb_later_reads() {
    let h = harness(Setup {
        rust_notes: shared_notes(),
        users: vec![user(U1, "ada"), user(U2, "grace")],
        ..Setup::default()
    });
    let caller = CallerIdentity::new(U1);

    let first = h.gateway.load_notes(&caller, None).await.unwrap();
    drop(first);

    let second = h.gateway.load_notes(&caller, None).await.unwrap();
    assert_eq!(second.users.resolve().await.unwrap().len(), 2);
}
