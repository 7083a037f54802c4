use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use festquest::api;
use festquest::auth::AuthConfig;
use festquest::config::AppConfig;
use festquest::state::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

// "admin:secret"
const ADMIN_BASIC: &str = "Basic YWRtaW46c2VjcmV0";
const PASSWORD: &str = "Tr0ub4dor&Z";

fn app() -> Router {
    let config = AppConfig {
        admin_email: Some("organiser@fest.edu".to_string()),
        ..AppConfig::default()
    };
    let auth_config = AuthConfig {
        username: Some("admin".to_string()),
        password: Some("secret".to_string()),
    };
    api::router(Arc::new(AppState::new(config)), Arc::new(auth_config))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn request(method: &str, uri: &str, auth: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn register(app: &Router, name: &str, email: &str) -> String {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/register",
            None,
            Some(json!({ "name": name, "email": email, "password": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    format!("Bearer {}", body["token"].as_str().unwrap())
}

#[tokio::test]
async fn test_register_login_and_progress() {
    let app = app();
    let bearer = register(&app, "Asha Verma", "asha@fest.edu").await;

    let (status, body) = send(&app, request("GET", "/api/me/progress", Some(&bearer), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["level"], 0);
    assert_eq!(body["total_games"], 5);
    assert_eq!(body["remaining_count"], 5);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/login",
            None,
            Some(json!({ "email": "asha@fest.edu", "password": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/login",
            None,
            Some(json!({ "email": "asha@fest.edu", "password": "wrong-Pass1" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_registration_rejections() {
    let app = app();
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/register",
            None,
            Some(json!({ "name": "Asha", "email": "asha@fest.edu", "password": "password" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at least 3"));

    register(&app, "Asha Verma", "asha@fest.edu").await;
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/register",
            None,
            Some(json!({ "name": "Asha Verma", "email": "asha@fest.edu", "password": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_player_routes_require_token() {
    let app = app();
    let (status, _) = send(&app, request("GET", "/api/games", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request("GET", "/api/games", Some("Bearer bogus"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_play_riddle_rush_over_http() {
    let app = app();
    let bearer = register(&app, "Asha Verma", "asha@fest.edu").await;

    let (status, tiles) = send(&app, request("GET", "/api/games", Some(&bearer), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tiles[0]["game"], "riddle-rush");
    assert_eq!(tiles[0]["unlocked"], true);
    assert_eq!(tiles[1]["unlocked"], false);

    let (status, _) = send(
        &app,
        request("POST", "/api/games/who-said-it/sessions", Some(&bearer), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request("POST", "/api/games/chess/sessions", Some(&bearer), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, session) = send(
        &app,
        request("POST", "/api/games/riddle-rush/sessions", Some(&bearer), None),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["phase"], "running");
    assert_eq!(session["item"]["kind"], "multiple_choice");
    let id = session["id"].as_str().unwrap().to_string();
    let respond_uri = format!("/api/sessions/{id}/respond");

    // Wrong response kind for a multiple-choice item
    let (status, _) = send(
        &app,
        request(
            "POST",
            &respond_uri,
            Some(&bearer),
            Some(json!({ "type": "answer", "text": "echo" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let total = session["total_items"].as_u64().unwrap();
    let mut last = Value::Null;
    for _ in 0..total {
        let (status, body) = send(
            &app,
            request("POST", &respond_uri, Some(&bearer), Some(json!({ "type": "skip" }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        last = body;
    }
    assert_eq!(last["phase"], "completed");
    assert_eq!(last["submission"]["state"], "recorded");
    assert_eq!(last["submission"]["leveled_up"], true);
    assert_eq!(last["summary"]["skipped"], 10);

    let (status, body) = send(
        &app,
        request("POST", "/api/games/riddle-rush/sessions", Some(&bearer), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["redirect"], "/dashboard");

    let (status, board) = send(&app, request("GET", "/api/leaderboard?by=level", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board[0]["display_name"], "Asha Verma");
    assert_eq!(board[0]["level"], 1);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/api/sessions/{id}"), Some(&bearer), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_admin_routes() {
    let app = app();
    register(&app, "Asha Verma", "asha@fest.edu").await;
    register(&app, "Fest Organiser", "organiser@fest.edu").await;

    let (status, _) = send(&app, request("GET", "/api/admin/stats", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, stats) = send(&app, request("GET", "/api/admin/stats", Some(ADMIN_BASIC), None)).await;
    assert_eq!(status, StatusCode::OK);
    // Organiser account is the admin email and is not counted
    assert_eq!(stats["total_users"], 1);

    let (status, event) = send(
        &app,
        request(
            "POST",
            "/api/admin/events",
            Some(ADMIN_BASIC),
            Some(json!({ "name": "Battle of Bands", "date": "2026-03-02", "time": "6:00 PM" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let event_id = event["id"].as_str().unwrap().to_string();

    let (status, events) = send(&app, request("GET", "/api/events", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(events[0]["name"], "Battle of Bands");

    let (status, _) = send(
        &app,
        request(
            "DELETE",
            &format!("/api/admin/events/{event_id}"),
            Some(ADMIN_BASIC),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, users) = send(&app, request("GET", "/api/admin/users", Some(ADMIN_BASIC), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 1);
    let uid = users[0]["uid"].as_str().unwrap().to_string();

    let (status, snapshot) = send(&app, request("GET", "/api/admin/export", Some(ADMIN_BASIC), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["users"].as_array().unwrap().len(), 2);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/api/admin/users/{uid}"), Some(ADMIN_BASIC), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        request("GET", &format!("/api/admin/users/{uid}"), Some(ADMIN_BASIC), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        request("POST", "/api/admin/import", Some(ADMIN_BASIC), Some(snapshot)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, users) = send(&app, request("GET", "/api/admin/users", Some(ADMIN_BASIC), None)).await;
    assert_eq!(users.as_array().unwrap().len(), 1);
}
