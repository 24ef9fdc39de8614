use std::sync::Arc;
use std::time::Duration;

use blogdesk_auth::{MemorySessionStore, SessionStore};
use blogdesk_bus::{EventBus, Topic};
use blogdesk_client::api::{self, Credentials, ListQuery, LoginStyle, SortDirection, TagDraft};
use blogdesk_client::{ClientConfig, DispatchError, RequestDispatcher, RequestOptions};
use blogdesk_schema::{BusMessage, NoticeKind};
use tokio::sync::mpsc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    dispatcher: Arc<RequestDispatcher>,
    session: Arc<MemorySessionStore>,
    notices: mpsc::Receiver<BusMessage>,
    redirects: mpsc::Receiver<BusMessage>,
    settled: mpsc::Receiver<BusMessage>,
    _bus: EventBus,
}

async fn harness(base_url: &str, token: Option<&str>) -> Harness {
    let bus = EventBus::new(16);
    let notices = bus.subscribe(Topic::Notice).await;
    let redirects = bus.subscribe(Topic::Redirect).await;
    let settled = bus.subscribe(Topic::RequestsSettled).await;

    let session = Arc::new(match token {
        Some(t) => MemorySessionStore::with_token(t),
        None => MemorySessionStore::new(),
    });
    let dispatcher = RequestDispatcher::new(
        &ClientConfig::with_base_url(base_url),
        session.clone(),
        bus.publisher(),
    )
    .unwrap();

    Harness {
        dispatcher: Arc::new(dispatcher),
        session,
        notices,
        redirects,
        settled,
        _bus: bus,
    }
}

fn drain(rx: &mut mpsc::Receiver<BusMessage>) -> Vec<BusMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

#[tokio::test]
async fn success_returns_body_and_settles_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles/42"))
        .and(header("x-auth-token", "tok-1"))
        .and(header("content-type", "application/json; charset=utf-8"))
        .and(header("x-url-path", "/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"article": {"id": "42", "title": "hi"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server.uri(), Some("tok-1")).await;
    let body = h
        .dispatcher
        .dispatch(RequestOptions::get("articles/42"))
        .await
        .unwrap();

    assert_eq!(body["article"]["title"], "hi");
    assert!(h.dispatcher.registry().is_empty());
    assert_eq!(drain(&mut h.settled), vec![BusMessage::RequestsSettled]);
    assert!(drain(&mut h.notices).is_empty());
}

#[tokio::test]
async fn url_is_registered_while_request_is_outstanding() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tags"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"tags": []}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("tok")).await;
    let dispatcher = h.dispatcher.clone();
    let task = tokio::spawn(async move { dispatcher.dispatch(RequestOptions::get("tags")).await });

    let mut seen = false;
    for _ in 0..50 {
        if h.dispatcher.registry().contains("tags") {
            seen = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(seen, "tags should be in flight before the response arrives");

    task.await.unwrap().unwrap();
    assert!(!h.dispatcher.registry().contains("tags"));
}

#[tokio::test]
async fn dropped_request_is_deregistered_and_settles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"categories": []}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let mut h = harness(&server.uri(), Some("tok")).await;
    let timed_out = tokio::time::timeout(
        Duration::from_millis(50),
        h.dispatcher.dispatch(RequestOptions::get("categories")),
    )
    .await;

    assert!(timed_out.is_err());
    assert!(h.dispatcher.registry().is_empty());
    let settled = tokio::time::timeout(Duration::from_secs(1), h.settled.recv())
        .await
        .unwrap();
    assert_eq!(settled, Some(BusMessage::RequestsSettled));
}

#[tokio::test]
async fn unauthenticated_clears_session_and_redirects_to_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut h = harness(&server.uri(), Some("expired")).await;
    let err = api::categories(&h.dispatcher)
        .list(&ListQuery::default())
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Unauthenticated));
    assert!(!h.session.has_token());
    assert_eq!(drain(&mut h.redirects), vec![BusMessage::redirect("login")]);
    assert_eq!(
        drain(&mut h.notices),
        vec![BusMessage::notice(NoticeKind::SessionExpired)]
    );
    assert!(h.dispatcher.registry().is_empty());
}

#[tokio::test]
async fn delete_article_server_fault_notifies_and_keeps_session() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/articles/42"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let mut h = harness(&server.uri(), Some("tok")).await;
    let err = api::articles(&h.dispatcher).delete("42").await.unwrap_err();

    assert!(matches!(err, DispatchError::ServerFault { status: 500, .. }));
    assert_eq!(h.session.token().as_deref(), Some("tok"));
    assert_eq!(
        drain(&mut h.notices),
        vec![BusMessage::notice(NoticeKind::ServerFault)]
    );
    assert!(drain(&mut h.redirects).is_empty());
    assert_eq!(drain(&mut h.settled).len(), 1);
}

#[tokio::test]
async fn other_status_is_left_to_the_caller() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/9"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({"message": "not found"})),
        )
        .mount(&server)
        .await;

    let mut h = harness(&server.uri(), Some("tok")).await;
    let err = api::users(&h.dispatcher).get("9").await.unwrap_err();

    match err {
        DispatchError::Other { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body["message"], "not found");
        }
        other => panic!("expected Other, got {other:?}"),
    }
    assert!(drain(&mut h.notices).is_empty());
    assert!(h.session.has_token());
    assert!(h.dispatcher.registry().is_empty());
}

#[tokio::test]
async fn unreachable_backend_notifies_and_unregisters() {
    // Nothing listens on port 9 of the loopback interface in the test environment.
    let mut h = harness("http://127.0.0.1:9/", Some("tok")).await;
    let err = h
        .dispatcher
        .dispatch(RequestOptions::get("sources"))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::NetworkUnreachable(_)));
    assert_eq!(
        drain(&mut h.notices),
        vec![BusMessage::notice(NoticeKind::Unreachable)]
    );
    assert!(h.dispatcher.registry().is_empty());
    assert_eq!(drain(&mut h.settled).len(), 1);
    assert!(h.session.has_token());
}

#[tokio::test]
async fn concurrent_requests_settle_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tags"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"tags": []}))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/roles"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"roles": []}))
                .set_delay(Duration::from_millis(150)),
        )
        .mount(&server)
        .await;

    let mut h = harness(&server.uri(), Some("tok")).await;
    let tags = api::tags(&h.dispatcher);
    let roles = api::roles(&h.dispatcher);
    let query = ListQuery::default();
    let (a, b) = tokio::join!(tags.list(&query), roles.list(&query));

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(drain(&mut h.settled), vec![BusMessage::RequestsSettled]);
}

#[tokio::test]
async fn login_never_sends_a_token_and_returns_issued_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tokens"))
        .and(body_json(serde_json::json!({
            "auth": {"username": "hanmei", "password": "passwd"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": {
                "id": "new-token",
                "user": {"id": 1, "uuid": "u-1", "name": "hanmei", "roles": ["admin"]}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("stale")).await;
    let issued = api::tokens(&h.dispatcher)
        .login(&Credentials::new("hanmei", "passwd"), LoginStyle::Flat)
        .await
        .unwrap();

    assert_eq!(issued.id, "new-token");
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("x-auth-token").is_none());
}

#[tokio::test]
async fn current_user_reads_nested_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tokens"))
        .and(header("x-auth-token", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": {
                "id": "tok",
                "user": {"id": "5", "name": "lilei", "roles": ["user"]}
            }
        })))
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("tok")).await;
    let user = api::tokens(&h.dispatcher).current_user().await.unwrap();

    assert_eq!(user.id, "5");
    assert_eq!(user.roles, vec!["user".to_string()]);
}

#[tokio::test]
async fn list_sends_paging_params_and_create_wraps_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles"))
        .and(query_param("page", "2"))
        .and(query_param("pagesize", "10"))
        .and(query_param("sort", "title"))
        .and(query_param("direction", "asc"))
        .and(query_param("published", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"articles": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tags"))
        .and(body_json(serde_json::json!({"tag": {"name": "rust"}})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({"tag": {"id": "1"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("tok")).await;
    let query = ListQuery::default()
        .page(2, 10)
        .sorted_by("title", SortDirection::Asc)
        .filter("published", "true");
    api::articles(&h.dispatcher).list(&query).await.unwrap();

    let created = api::tags(&h.dispatcher)
        .create(&TagDraft::named(" rust "))
        .await
        .unwrap();
    assert_eq!(created["tag"]["id"], "1");
}
