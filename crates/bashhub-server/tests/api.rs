//! End-to-end tests of the HTTP API against an in-memory database.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use bashhub_core::db::unix_millis;
use bashhub_server::server::{AppState, build_router};
use bashhub_server::storage::HistoryDatabase;

const COMMANDS: [&str; 10] = [
    "cat foo.txt",
    "ls",
    "pwd",
    "whoami",
    "which cat",
    "head foo.txt",
    "sed 's/fooobaar/foobar/g' somefile.txt",
    "curl google.com",
    "file /dev/null",
    "df -h",
];

const PIDS: [i64; 5] = [90226, 90227, 90228, 90229, 90230];

async fn app() -> Router {
    let db = HistoryDatabase::open_in_memory().await.unwrap();
    let state = AppState::new(db, Duration::from_secs(30)).await.unwrap();
    build_router(state)
}

/// Send a request and return (status, body text).
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

fn json_of(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

async fn create_user(app: &Router, username: &str, email: &str) -> StatusCode {
    let body = json!({ "Username": username, "email": email, "password": "tester" });
    send(app, "POST", "/api/v1/user", None, Some(body)).await.0
}

async fn login(app: &Router, username: &str, mac: &str) -> String {
    let body = json!({ "username": username, "password": "tester", "mac": mac });
    let (status, text) = send(app, "POST", "/api/v1/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK, "{text}");
    json_of(&text)["accessToken"].as_str().unwrap().to_string()
}

async fn search(app: &Router, token: &str, query: &str) -> Vec<Value> {
    let uri = format!("/api/v1/command/search?{query}");
    let (status, text) = send(app, "GET", &uri, Some(token), None).await;
    assert_eq!(status, StatusCode::OK, "{text}");
    match json_of(&text) {
        Value::Array(rows) => rows,
        Value::Object(map) if map.is_empty() => Vec::new(),
        other => panic!("unexpected search body {other}"),
    }
}

/// User `tester` with three systems, logged in on `system-1`.
async fn registered(app: &Router) -> String {
    assert_eq!(create_user(app, "tester", "test@email.com").await, StatusCode::OK);
    let token = login(app, "tester", "").await;

    for (mac, name) in [("m1", "system-1"), ("m2", "system-2"), ("m3", "system-3")] {
        let body = json!({
            "mac": mac,
            "name": name,
            "hostname": format!("{name}.local"),
            "clientVersion": "1.2.0",
        });
        let (status, _) = send(app, "POST", "/api/v1/system", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    login(app, "tester", "m1").await
}

/// 50 stored commands plus 10 dropped ones (exit 127); returns stored uuids.
async fn post_history(app: &Router, token: &str) -> Vec<String> {
    let base = unix_millis() - 120_000;
    let mut stored = Vec::new();
    let mut i = 0_i64;
    for pid in PIDS {
        for command in COMMANDS {
            let uuid = format!("{pid}-{i}");
            let body = json!({
                "command": command,
                "path": "/tmp/foo",
                "created": base + i,
                "uuid": uuid,
                "exitStatus": 0,
                "processId": pid,
                "processStartTime": base,
            });
            let (status, _) = send(app, "POST", "/api/v1/command", Some(token), Some(body)).await;
            assert_eq!(status, StatusCode::OK);
            stored.push(uuid);
            i += 1;
        }
        for typo in ["catt", "cay"] {
            let body = json!({
                "command": typo,
                "path": "/tmp/foo",
                "created": base + i,
                "uuid": format!("dropped-{i}"),
                "exitStatus": 127,
                "processId": pid,
                "processStartTime": base,
            });
            let (status, _) = send(app, "POST", "/api/v1/command", Some(token), Some(body)).await;
            assert_eq!(status, StatusCode::OK);
            i += 1;
        }
    }
    stored
}

#[tokio::test]
async fn ping_pongs() {
    let app = app().await;
    let (status, text) = send(&app, "GET", "/ping", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&text), json!({ "message": "pong" }));
}

#[tokio::test]
async fn user_registration_conflicts() {
    let app = app().await;
    assert_eq!(create_user(&app, "tester", "test@email.com").await, StatusCode::OK);

    let body = json!({ "Username": "tester", "email": "other@email.com", "password": "x" });
    let (status, text) = send(&app, "POST", "/api/v1/user", None, Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(text, "Username already taken");

    let body = json!({ "Username": "other", "email": "test@email.com", "password": "x" });
    let (status, text) = send(&app, "POST", "/api/v1/user", None, Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(text, "This email address is already registered.");

    let body = json!({ "Username": "nomail", "password": "x" });
    let (status, text) = send(&app, "POST", "/api/v1/user", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_of(&text), json!({ "error": "email required" }));

    let (status, text) = send(
        &app,
        "POST",
        "/api/v1/user",
        None,
        Some(json!(["not", "an", "object"])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_of(&text)["error"].as_str().unwrap().contains("array"));

    // Nothing was created from the positional body.
    let body = json!({ "username": "not", "password": "object" });
    let (status, _) = send(&app, "POST", "/api/v1/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn array_bodies_are_rejected() {
    let app = app().await;
    let token = registered(&app).await;

    let command = json!(["ls", "/tmp", 1, "uuid-a", 0]);
    let (status, _) = send(&app, "POST", "/api/v1/command", Some(&token), Some(command)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(search(&app, &token, "").await.is_empty());

    let system = json!(["m9", "system-9", "host", "1.0"]);
    let (status, text) = send(&app, "POST", "/api/v1/system", Some(&token), Some(system)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_of(&text)["error"].is_string());
    let (status, _) = send(&app, "GET", "/api/v1/system?mac=m9", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let import = json!(["htop", "/", 1, "uuid-b", 0, "box", null]);
    let (status, _) = send(&app, "POST", "/api/v1/import", Some(&token), Some(import)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let login = json!(["tester", "tester", "m1"]);
    let (status, text) = send(&app, "POST", "/api/v1/login", None, Some(login)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_of(&text)["message"], "missing Username or Password");
}

#[tokio::test]
async fn login_failures_are_unauthorized() {
    let app = app().await;
    create_user(&app, "tester", "test@email.com").await;

    let body = json!({ "username": "tester", "password": "wrong" });
    let (status, text) = send(&app, "POST", "/api/v1/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_of(&text),
        json!({ "code": 401, "message": "incorrect Username or Password" })
    );

    let body = json!({ "username": "tester" });
    let (status, text) = send(&app, "POST", "/api/v1/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_of(&text)["message"], "missing Username or Password");

    let body = json!({ "username": "ghost", "password": "tester" });
    let (status, _) = send(&app, "POST", "/api/v1/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = app().await;
    let token = registered(&app).await;

    let (status, text) = send(&app, "GET", "/api/v1/command/search", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_of(&text)["code"], 401);

    let (status, _) = send(&app, "GET", "/api/v1/command/search", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let uri = format!("/api/v1/command/search?token={token}");
    let (status, _) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);

    let req = Request::builder()
        .uri("/api/v1/command/search")
        .header("cookie", format!("jwt={token}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn token_for_other_instance_is_rejected() {
    let app_a = app().await;
    let app_b = app().await;
    let token = registered(&app_a).await;
    create_user(&app_b, "tester", "test@email.com").await;

    // Each instance generates its own signing secret.
    let (status, _) = send(&app_b, "GET", "/api/v1/command/search", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn history_scenario() {
    let app = app().await;
    let token = registered(&app).await;
    let uuids = post_history(&app, &token).await;

    let all = search(&app, &token, "limit=100").await;
    assert_eq!(all.len(), 50);
    let created: Vec<i64> = all.iter().map(|r| r["created"].as_i64().unwrap()).collect();
    assert!(created.windows(2).all(|w| w[0] >= w[1]));
    assert!(all.iter().all(|r| r["command"] != "catt" && r["command"] != "cay"));

    assert_eq!(search(&app, &token, "unique=true").await.len(), 10);

    let curl = search(&app, &token, "query=%5Ecurl&unique=true").await;
    assert_eq!(curl.len(), 1);
    assert!(curl[0]["command"].as_str().unwrap().starts_with("curl"));

    assert_eq!(
        search(&app, &token, "path=%2Ftmp%2Ffoo&query=%5Ecurl").await.len(),
        5
    );
    assert_eq!(
        search(&app, &token, "systemName=system-1&unique=true").await.len(),
        10
    );
    assert!(search(&app, &token, "systemName=system-2").await.is_empty());
    assert_eq!(search(&app, &token, "limit=1").await.len(), 1);
    assert_eq!(search(&app, &token, "limit=abc").await.len(), 50);

    // Fetch one record.
    let uri = format!("/api/v1/command/{}", uuids[7]);
    let (status, text) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let record = json_of(&text);
    assert_eq!(record["command"], "curl google.com");
    assert_eq!(record["path"], "/tmp/foo");
    assert_eq!(record["uuid"], uuids[7].as_str());
    assert_eq!(record["exitStatus"], 0);
    assert_eq!(record["systemName"], "system-1");
    assert_eq!(record["username"], "tester");
    assert_eq!(record["sessionId"], PIDS[0].to_string());

    let (status, text) = send(&app, "GET", "/api/v1/command/unknown", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_of(&text), json!({ "error": "no rows in result set" }));

    // Delete one from the first session.
    let uri = format!("/api/v1/command/{}", uuids[0]);
    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(search(&app, &token, "limit=100").await.len(), 49);

    let uri = format!(
        "/api/v1/client-view/status?processId={}&startTime=1577836800000",
        PIDS[0]
    );
    let (status, text) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{text}");
    let status_view = json_of(&text);
    assert_eq!(status_view["totalCommands"], 49);
    assert_eq!(status_view["totalSessions"], 5);
    assert_eq!(status_view["totalSystems"], 3);
    assert_eq!(status_view["totalCommandsToday"], 49);
    assert_eq!(status_view["sessionTotalCommands"], 9);
    assert_eq!(status_view["sessionName"], PIDS[0].to_string());
    assert_eq!(status_view["sessionStartTime"], 1_577_836_800_000_i64);
    assert_eq!(status_view["username"], "tester");
}

#[tokio::test]
async fn duplicate_post_is_ignored() {
    let app = app().await;
    let token = registered(&app).await;

    for command in ["first", "second"] {
        let body = json!({
            "command": command,
            "path": "/",
            "created": 1,
            "uuid": "same-uuid",
            "exitStatus": 130,
            "processId": 1,
            "processStartTime": 1,
        });
        let (status, _) = send(&app, "POST", "/api/v1/command", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let rows = search(&app, &token, "").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["command"], "first");
}

#[tokio::test]
async fn empty_search_is_an_empty_object() {
    let app = app().await;
    let token = registered(&app).await;

    let (status, text) = send(&app, "GET", "/api/v1/command/search", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "{}");
}

#[tokio::test]
async fn bad_search_input_is_rejected() {
    let app = app().await;
    let token = registered(&app).await;

    let (status, text) = send(
        &app,
        "GET",
        "/api/v1/command/search?query=%28unclosed",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_of(&text)["error"].is_string());

    let (status, _) = send(
        &app,
        "GET",
        "/api/v1/command/search?path=%2Ftmp%00",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn system_lifecycle() {
    let app = app().await;
    let token = registered(&app).await;

    let (status, text) = send(&app, "GET", "/api/v1/system?mac=m2", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let system = json_of(&text);
    assert_eq!(system["mac"], "m2");
    assert_eq!(system["name"], "system-2");
    assert_eq!(system["hostname"], "system-2.local");
    assert_eq!(system["clientVersion"], "1.2.0");
    assert!(system["Created"].is_i64());
    assert!(system["Updated"].is_i64());
    assert!(system["userId"].is_i64());

    let body = json!({ "hostname": "renamed" });
    let (status, _) = send(&app, "PATCH", "/api/v1/system/m2", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, text) = send(&app, "GET", "/api/v1/system?mac=m2", Some(&token), None).await;
    assert_eq!(json_of(&text)["hostname"], "renamed");

    let (status, _) = send(&app, "GET", "/api/v1/system", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, text) = send(&app, "GET", "/api/v1/system?mac=zz", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json_of(&text)["error"].is_string());
}

#[tokio::test]
async fn status_needs_integer_parameters() {
    let app = app().await;
    let token = registered(&app).await;

    for uri in [
        "/api/v1/client-view/status?processId=1",
        "/api/v1/client-view/status?processId=abc&startTime=1",
        "/api/v1/client-view/status?processId=1&startTime=later",
    ] {
        let (status, text) = send(&app, "GET", uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(json_of(&text)["error"].is_string());
    }
}

#[tokio::test]
async fn import_assigns_caller() {
    let app = app().await;
    let token = registered(&app).await;

    let body = json!({
        "command": "htop",
        "path": "/home/tester",
        "created": 1_600_000_000_000_i64,
        "uuid": "imported-1",
        "exitStatus": 0,
        "systemName": "old-box",
        "sessionId": "4242",
    });
    for _ in 0..2 {
        let (status, _) =
            send(&app, "POST", "/api/v1/import", Some(&token), Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
    }

    let rows = search(&app, &token, "systemName=old-box").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["uuid"], "imported-1");
}

/// Runs the core flow against a real server engine when
/// `BASHHUB_TEST_POSTGRES_URI` is set.
#[tokio::test]
async fn postgres_search_flow() {
    let Ok(uri) = std::env::var("BASHHUB_TEST_POSTGRES_URI") else {
        return;
    };
    let db = HistoryDatabase::open(&uri).await.unwrap();
    assert!(!db.single_writer());
    let app = build_router(AppState::new(db, Duration::from_secs(30)).await.unwrap());

    let username = format!("pg-{}", uuid::Uuid::new_v4().simple());
    let email = format!("{username}@example.com");
    assert_eq!(create_user(&app, &username, &email).await, StatusCode::OK);
    let token = login(&app, &username, "").await;

    let base = unix_millis();
    for (i, command) in COMMANDS.iter().chain(COMMANDS.iter()).enumerate() {
        let body = json!({
            "command": command,
            "path": "/tmp/foo",
            "created": base + i64::try_from(i).unwrap(),
            "uuid": uuid::Uuid::new_v4().to_string(),
            "exitStatus": 0,
            "processId": 1,
            "processStartTime": base,
        });
        let (status, _) = send(&app, "POST", "/api/v1/command", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(search(&app, &token, "limit=100").await.len(), 20);
    let unique = search(&app, &token, "unique=true").await;
    assert_eq!(unique.len(), 10);
    let created: Vec<i64> = unique.iter().map(|r| r["created"].as_i64().unwrap()).collect();
    assert!(created.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(
        search(&app, &token, "query=%5Ecurl&path=%2Ftmp%2Ffoo").await.len(),
        2
    );
}
