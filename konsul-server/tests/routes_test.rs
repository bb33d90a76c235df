//! HTTP route tests driven through the router with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use http_body_util::BodyExt;
use konsul_core::{AuthUser, Role, ServerEvent};
use konsul_server::{build_components_with_store, routes, AuthGateway, ServerComponents, ServerConfig};
use serde_json::{json, Value};
use storage::{AppointmentRecord, ProfileKind, ProfileRecord, Store};
use tower::ServiceExt;

const SECRET: &str = "secret";

async fn components() -> ServerComponents {
    let store = Store::open("sqlite::memory:").await.unwrap();
    store
        .directory
        .upsert(ProfileKind::Doctor, &ProfileRecord::new("d-1", "dr. Sari"))
        .await
        .unwrap();
    store
        .directory
        .upsert(ProfileKind::Citizen, &ProfileRecord::new("c-1", "Budi"))
        .await
        .unwrap();
    build_components_with_store(&ServerConfig::with_defaults(SECRET), store).unwrap()
}

fn token(id: &str, role: Role) -> String {
    AuthGateway::new(SECRET)
        .issue(&AuthUser::new(id, role), Duration::hours(1))
        .unwrap()
}

fn request(method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health_ok() {
    let c = components().await;
    let app = routes::build(c.state.clone());

    let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 0);
}

#[tokio::test]
async fn test_missing_or_bad_token_is_401() {
    let c = components().await;
    let app = routes::build(c.state.clone());

    let (status, body) = send(&app, request(Method::GET, "/api/chatlist/c-1", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let forged = AuthGateway::new("other")
        .issue(&AuthUser::new("c-1", Role::Masyarakat), Duration::hours(1))
        .unwrap();
    let (status, _) = send(
        &app,
        request(Method::GET, "/api/chatlist/c-1", Some(&forged), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

/// **Test:** Article creation is limited to admin/dokter and unique per name and category.
///
/// **Setup:** Empty articles table.
///
/// **Action:** masyarakat posts; admin posts; admin posts the same again.
///
/// **Expected:** 403, 201, 409.
#[tokio::test]
async fn test_create_article_roles_and_conflict() {
    let c = components().await;
    let app = routes::build(c.state.clone());
    let body = json!({"name": "Demam", "category": "Anak", "body": "Kompres hangat."});

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/artikel",
            Some(&token("c-1", Role::Masyarakat)),
            Some(body.clone()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = token("a-1", Role::Admin);
    let (status, created) = send(
        &app,
        request(Method::POST, "/api/artikel", Some(&admin), Some(body.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Demam");

    let (status, err) = send(
        &app,
        request(Method::POST, "/api/artikel", Some(&admin), Some(body)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(err["error"].as_str().unwrap().contains("already exists"));
    assert_eq!(c.state.store.articles.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_chatlist_is_private() {
    let c = components().await;
    let app = routes::build(c.state.clone());

    let (status, _) = send(
        &app,
        request(
            Method::GET,
            "/api/chatlist/d-1",
            Some(&token("c-1", Role::Masyarakat)),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/api/chatlist/d-1",
            Some(&token("a-1", Role::Admin)),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

/// **Test:** Reading a conversation resets only the caller's counter.
///
/// **Setup:** One message c-1 → d-1 recorded in the chat list.
///
/// **Action:** d-1 lists, marks read, lists again; c-2 tries to mark it read.
///
/// **Expected:** unread 1, then 204 and unread 0; the stranger gets 403.
#[tokio::test]
async fn test_mark_read() {
    let c = components().await;
    let app = routes::build(c.state.clone());
    c.state
        .chat_lists
        .record_message(
            "c-1",
            konsul_core::ChatRole::Citizen,
            "d-1",
            "halo dok",
            Utc::now(),
            None,
        )
        .await
        .unwrap();
    let doctor = token("d-1", Role::Dokter);

    let (_, inbox) = send(
        &app,
        request(Method::GET, "/api/chatlist/d-1", Some(&doctor), None),
    )
    .await;
    assert_eq!(inbox[0]["unreadCount"], 1);
    assert_eq!(inbox[0]["participant"]["name"], "Budi");
    let id = inbox[0]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/chatlist/{}/read", id),
            Some(&token("c-2", Role::Masyarakat)),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/chatlist/{}/read", id),
            Some(&doctor),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, inbox) = send(
        &app,
        request(Method::GET, "/api/chatlist/d-1", Some(&doctor), None),
    )
    .await;
    assert_eq!(inbox[0]["unreadCount"], 0);
}

/// **Test:** Accepting an appointment wakes the scheduler, which then greets both participants.
///
/// **Setup:** Waiting appointment d-1/c-1 on 2024-01-01 09:00; doctor and citizen connected.
///
/// **Action:** another doctor accepts; d-1 accepts; the notification is read; one sweep runs at
/// 09:05 (+07:00).
///
/// **Expected:** 403 for the stranger, 200 with status accepted, the notifier yields the id, and
/// both connections receive the greeting exactly once.
#[tokio::test]
async fn test_accept_then_greeting_delivered() {
    let mut c = components().await;
    let app = routes::build(c.state.clone());
    let appointment = AppointmentRecord::new(
        "d-1",
        "c-1",
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        "09:00",
        "Demam",
    );
    c.state.store.appointments.insert(&appointment).await.unwrap();
    let uri = format!("/api/jadwal/{}/accept", appointment.id);

    let (status, _) = send(
        &app,
        request(Method::POST, &uri, Some(&token("d-2", Role::Dokter)), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        request(Method::POST, &uri, Some(&token("d-1", Role::Dokter)), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");
    assert_eq!(c.accepted_rx.recv().await.as_deref(), Some(appointment.id.as_str()));

    let hub = &c.state.hub;
    let (_, mut doctor_rx) = hub.connect(AuthUser::new("d-1", Role::Dokter)).await.unwrap();
    let (_, mut citizen_rx) = hub
        .connect(AuthUser::new("c-1", Role::Masyarakat))
        .await
        .unwrap();
    let (_, mut bystander_rx) = hub
        .connect(AuthUser::new("c-9", Role::Masyarakat))
        .await
        .unwrap();
    for rx in [&mut doctor_rx, &mut citizen_rx, &mut bystander_rx] {
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
    }

    // 09:05 in +07:00
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 2, 5, 0).unwrap();
    let report = c.scheduler.tick(now).await.unwrap();
    assert_eq!(report.sent, 1);
    assert_eq!(c.scheduler.tick(now).await.unwrap().sent, 0);

    for rx in [&mut doctor_rx, &mut citizen_rx] {
        let Some(ServerEvent::ChatMessage(greeting)) = rx.recv().await else {
            panic!("expected greeting");
        };
        assert_eq!(greeting.text.as_deref(), Some("Halo, ada yang bisa dibantu?"));
        assert_eq!(greeting.sender_id, "d-1");
        assert!(rx.try_recv().is_err());
    }
    assert!(bystander_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_status_done_closes_conversation() {
    let c = components().await;
    let app = routes::build(c.state.clone());
    let appointment = AppointmentRecord::new(
        "d-1",
        "c-1",
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        "09:00",
        "Batuk",
    );
    c.state.store.appointments.insert(&appointment).await.unwrap();
    c.state
        .chat_lists
        .record_message(
            "d-1",
            konsul_core::ChatRole::Doctor,
            "c-1",
            "Halo",
            Utc::now(),
            Some(appointment.id.as_str()),
        )
        .await
        .unwrap();
    let uri = format!("/api/jadwal/{}/status", appointment.id);

    let (status, _) = send(
        &app,
        request(
            Method::PATCH,
            &uri,
            Some(&token("c-1", Role::Masyarakat)),
            Some(json!({"status": "done"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request(
            Method::PATCH,
            &uri,
            Some(&token("a-1", Role::Admin)),
            Some(json!({"status": "bogus"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        request(
            Method::PATCH,
            &uri,
            Some(&token("a-1", Role::Admin)),
            Some(json!({"status": "selesai"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "done");

    let inbox = c.state.chat_lists.list_conversations("c-1").await.unwrap();
    assert_eq!(inbox[0].status, "done");
}

#[tokio::test]
async fn test_history_between_route() {
    let c = components().await;
    let app = routes::build(c.state.clone());
    let (conn, _rx) = c
        .state
        .hub
        .connect(AuthUser::new("c-1", Role::Masyarakat))
        .await
        .unwrap();
    let incoming = serde_json::from_value(json!({"receiverId": "d-1", "text": "pusing"})).unwrap();
    c.state
        .hub
        .submit(conn, &AuthUser::new("c-1", Role::Masyarakat), incoming)
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/api/chat/history/d-1/c-1",
            Some(&token("d-1", Role::Dokter)),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["text"], "pusing");
}
