use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use nook_api::pin::{Params, PinHasher};
use nook_api::{AppState, AppStateInner, Config, router};
use nook_db::Database;

const SECRET: &str = "integration-test-secret";

fn app() -> (Router, AppState) {
    let config = Config {
        jwt_secret: SECRET.to_string(),
        ..Config::default()
    };
    let hasher = PinHasher::with_params(Params::new(Params::MIN_M_COST, 1, 1, None).unwrap());
    let state: AppState = Arc::new(
        AppStateInner::new(Database::open_in_memory().unwrap(), &config).with_hasher(hasher),
    );
    (router(state.clone()), state)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn sign_in(app: &Router, state: &AppState, email: &str) -> String {
    let (status, _) = call(app, Method::POST, "/auth/request-code", None, Some(json!({ "email": email }))).await;
    assert_eq!(status, StatusCode::OK);

    let code = state.codes.pending_code(email).expect("code issued");
    let (status, body) = call(
        app,
        Method::POST,
        "/auth/verify-code",
        None,
        Some(json!({ "email": email, "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["accessToken"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_open_and_everything_else_needs_a_token() {
    let (app, _) = app();
    let (status, body) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = call(&app, Method::GET, "/folders/list?kind=NOTES", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = call(&app, Method::GET, "/folders/list?kind=NOTES", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_code_is_rejected() {
    let (app, _) = app();
    call(&app, Method::POST, "/auth/request-code", None, Some(json!({ "email": "x@example.com" }))).await;
    let (status, _) = call(
        &app,
        Method::POST,
        "/auth/verify-code",
        None,
        Some(json!({ "email": "x@example.com", "code": "not-it" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, Method::POST, "/auth/request-code", None, Some(json!({ "email": "nope" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn new_account_gets_the_starter_folders() {
    let (app, state) = app();
    let token = sign_in(&app, &state, "alice@example.com").await;

    let (status, body) = call(&app, Method::GET, "/folders/list?kind=NOTES", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Category 1") && names.contains(&"Category 2"));

    let (status, body) = call(&app, Method::GET, "/folders/list?kind=URLS", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (status, _) = call(&app, Method::GET, "/folders/list", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn private_partition_round_trip() {
    let (app, state) = app();
    let token = sign_in(&app, &state, "bob@example.com").await;
    let t = Some(token.as_str());

    let (_, body) = call(&app, Method::GET, "/private/status", t, None).await;
    assert_eq!(body["data"], json!({ "hasPassword": false, "unlocked": false }));

    // Locked: the guarded surface says so with a marker.
    let (status, body) = call(&app, Method::GET, "/private/items/list?type=NOTE", t, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "PRIVATE_LOCKED");
    assert_eq!(body["message"], "private locked");

    let (status, body) = call(&app, Method::POST, "/private/setup", t, Some(json!({ "pin": "1234", "confirm": "1234" }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["unlocked"], true);

    let (status, _) = call(&app, Method::POST, "/private/setup", t, Some(json!({ "pin": "5678", "confirm": "5678" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(
        &app,
        Method::POST,
        "/private/items",
        t,
        Some(json!({ "title": "diary", "content": "buried treasure" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let secret_id = body["data"]["id"].as_str().unwrap().to_string();

    // Search never reaches the private partition, even while unlocked.
    let (status, body) = call(&app, Method::GET, "/search?q=treasure&type=NOTE", t, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = call(&app, Method::GET, &format!("/items/{secret_id}"), t, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, Method::POST, "/private/lock", t, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::GET, &format!("/items/{secret_id}"), t, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "PRIVATE_LOCKED");

    let (status, body) = call(&app, Method::POST, "/private/unlock", t, Some(json!({ "pin": "0000" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "pin incorrect");

    let (status, body) = call(&app, Method::POST, "/private/unlock", t, Some(json!({ "pin": "1234" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["expiresAt"].is_string());

    let (status, body) = call(&app, Method::GET, &format!("/private/items/{secret_id}"), t, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "buried treasure");

    // Changing the PIN forces a fresh unlock.
    let (status, _) = call(
        &app,
        Method::POST,
        "/private/change-pin",
        t,
        Some(json!({ "oldPin": "1234", "newPin": "98765", "confirmNewPin": "98765" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, Method::GET, "/private/status", t, None).await;
    assert_eq!(body["data"], json!({ "hasPassword": true, "unlocked": false }));
}

#[tokio::test]
async fn private_misses_do_not_reveal_existence() {
    let (app, state) = app();
    let alice = sign_in(&app, &state, "alice@example.com").await;
    let mallory = sign_in(&app, &state, "mallory@example.com").await;

    call(&app, Method::POST, "/private/setup", Some(&alice), Some(json!({ "pin": "1234", "confirm": "1234" }))).await;
    let (_, body) = call(&app, Method::GET, "/private/folders/list", Some(&alice), None).await;
    let alice_private = body["data"][0]["id"].as_str().unwrap().to_string();

    call(&app, Method::POST, "/private/setup", Some(&mallory), Some(json!({ "pin": "4321", "confirm": "4321" }))).await;
    let foreign = call(&app, Method::GET, &format!("/private/folders/{alice_private}"), Some(&mallory), None).await;
    let missing = call(
        &app,
        Method::GET,
        "/private/folders/00000000-0000-4000-8000-000000000000",
        Some(&mallory),
        None,
    )
    .await;
    assert_eq!(foreign.0, StatusCode::FORBIDDEN);
    assert_eq!(foreign, missing);
    assert!(foreign.1.get("code").is_none());

    // The public surface treats the private folder as absent.
    let (status, _) = call(&app, Method::GET, &format!("/folders/{alice_private}"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn folder_and_item_lifecycle() {
    let (app, state) = app();
    let token = sign_in(&app, &state, "carol@example.com").await;
    let t = Some(token.as_str());

    let (status, body) = call(&app, Method::POST, "/folders", t, Some(json!({ "name": "Work", "kind": "NOTES" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["isPrivate"], false);
    let work = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(&app, Method::POST, "/folders", t, Some(json!({ "name": "Work", "kind": "NOTES" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        Method::POST,
        "/items",
        t,
        Some(json!({ "type": "NOTE", "content": "ship it", "folderId": work })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["folder"]["name"], "Work");
    let item = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, Method::DELETE, &format!("/folders/{work}"), t, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "folder not empty");

    let (status, body) = call(
        &app,
        Method::PATCH,
        &format!("/items/{item}"),
        t,
        Some(json!({ "title": "done", "isStarred": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "done");
    assert_eq!(body["data"]["content"], "ship it");

    let (status, body) = call(&app, Method::GET, &format!("/items/list?type=NOTE&folderId={work}"), t, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = call(&app, Method::DELETE, &format!("/items/{item}"), t, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::GET, &format!("/items/{item}"), t, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::DELETE, &format!("/folders/{work}"), t, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, Method::GET, "/items/not-a-uuid", t, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_requests_get_the_error_envelope() {
    let (app, state) = app();
    let token = sign_in(&app, &state, "shape@example.com").await;
    let t = Some(token.as_str());

    let cases = [
        (Method::POST, "/items", Some(json!({ "content": "no type" }))),
        (Method::POST, "/items", Some(json!({ "type": "NOTE", "content": 7 }))),
        (Method::POST, "/folders", Some(json!({ "name": "x", "kind": "NOTES", "color": "red" }))),
        (Method::POST, "/private/setup", Some(json!({ "pin": "1234" }))),
        (Method::GET, "/items/list?type=NOTE&includeUnfiled=yes", None),
        (Method::GET, "/items/not-a-uuid", None),
    ];
    for (method, uri, body) in cases {
        let (status, body) = call(&app, method, uri, t, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}: {body}");
        assert_eq!(body["success"], false, "{uri}");
        assert_eq!(body["statusCode"], 400, "{uri}");
        assert!(body["message"].is_string(), "{uri}");
    }
}
