//! Integration tests for the HTTP API.
//!
//! Drives the router in-process over the memory backend: lifecycle, roster,
//! results and the error to status mapping.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use league_engine::{
    CompetitionManager, EngineConfig, audit::MemoryAuditSink, authz::StaticAuthorizer,
    db::MemoryRepository, notify::NoopNotifier,
};
use league_server::api::{AppState, actor::USER_ID_HEADER, create_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

const OWNER: i64 = 1;

/// Helper to create a router over fresh in-memory storage
fn create_test_app() -> axum::Router {
    let manager = CompetitionManager::new(
        Arc::new(MemoryRepository::new()),
        Arc::new(StaticAuthorizer::new()),
        Arc::new(MemoryAuditSink::new()),
        Arc::new(NoopNotifier),
        EngineConfig::default(),
    );
    create_router(AppState::new(Arc::new(manager), None))
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    actor: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header(USER_ID_HEADER, actor.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Creates and publishes a single-elimination tournament, returning its id
async fn open_tournament(app: &axum::Router, max_teams: u32) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/tournaments",
        Some(OWNER),
        Some(json!({"name": "Spring Cup", "format": "single_elimination", "max_teams": max_teams})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        app,
        "POST",
        &format!("/api/v1/tournaments/{id}/publish"),
        Some(OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "open");
    id
}

#[tokio::test]
async fn test_health_check_memory_backend() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_full_tournament_over_http() {
    let app = create_test_app();
    let id = open_tournament(&app, 2).await;
    let base = format!("/api/v1/tournaments/{id}");

    let (status, teams) = send(
        &app,
        "POST",
        &format!("{base}/teams/bulk"),
        Some(OWNER),
        Some(json!({"count": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(teams.as_array().unwrap().len(), 2);
    assert_eq!(teams[0]["name"], "Team 1");

    for user in [100, 101] {
        let (status, registration) = send(
            &app,
            "POST",
            &format!("{base}/registrations"),
            Some(user),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(registration["user_id"], user);
        assert_eq!(registration["status"], "confirmed");
    }

    let (status, report) = send(
        &app,
        "POST",
        &format!("{base}/teams/auto-assign"),
        Some(OWNER),
        Some(json!({"balance_by_skill": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["assigned"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, "POST", &format!("{base}/close"), Some(OWNER), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, started) = send(&app, "POST", &format!("{base}/start"), Some(OWNER), None).await;
    assert_eq!(status, StatusCode::OK);
    let matches = started["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    let final_id = matches[0]["id"].as_str().unwrap().to_string();
    let home = matches[0]["home_team_id"].clone();

    // A second start returns the same bracket
    let (status, again) = send(&app, "POST", &format!("{base}/start"), Some(OWNER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again, started);

    let (status, rejected) = send(
        &app,
        "POST",
        &format!("{base}/matches/{final_id}/score"),
        Some(OWNER),
        Some(json!({"home_score": u32::MAX, "away_score": u32::MAX - 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(rejected["kind"], "score_out_of_range");

    let (status, change) = send(
        &app,
        "POST",
        &format!("{base}/matches/{final_id}/score"),
        Some(OWNER),
        Some(json!({"home_score": 3, "away_score": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(change["winner"], home);

    let (status, standings) =
        send(&app, "POST", &format!("{base}/complete"), Some(OWNER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(standings["rows"][0]["team_id"], home);
    assert_eq!(standings["rows"][0]["placement"], 1);

    let (status, tournament) = send(&app, "GET", &base, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tournament["status"], "completed");
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let app = create_test_app();
    open_tournament(&app, 4).await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(OWNER),
        Some(json!({"name": "Draft Cup", "format": "round_robin", "max_teams": 4})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, all) = send(&app, "GET", "/api/v1/tournaments", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, open) = send(&app, "GET", "/api/v1/tournaments?status=open", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let open = open.as_array().unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0]["config"]["name"], "Spring Cup");

    let (status, body) = send(&app, "GET", "/api/v1/tournaments?status=bogus", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");
}

#[tokio::test]
async fn test_missing_actor_is_unauthorized() {
    let app = create_test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        None,
        Some(json!({"name": "Cup", "format": "single_elimination", "max_teams": 4})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "missing_actor");
}

#[tokio::test]
async fn test_non_owner_is_forbidden() {
    let app = create_test_app();
    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(OWNER),
        Some(json!({"name": "Cup", "format": "single_elimination", "max_teams": 4})),
    )
    .await;
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/publish"),
        Some(42),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "unauthorized");
    assert_eq!(body["class"], "forbidden");
}

#[tokio::test]
async fn test_unknown_tournament_is_not_found() {
    let app = create_test_app();
    let id = uuid::Uuid::new_v4();
    let (status, body) = send(&app, "GET", &format!("/api/v1/tournaments/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "tournament_not_found");
}

#[tokio::test]
async fn test_invalid_transition_is_conflict() {
    let app = create_test_app();
    let id = open_tournament(&app, 4).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/publish"),
        Some(OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_state_transition");
    assert_eq!(body["class"], "fix_input");
}

#[tokio::test]
async fn test_full_tournament_waitlists_registration() {
    let app = create_test_app();
    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(OWNER),
        Some(json!({
            "name": "Small Cup",
            "format": "single_elimination",
            "max_teams": 2,
            "max_participants": 2
        })),
    )
    .await;
    let id = body["id"].as_str().unwrap().to_string();
    let base = format!("/api/v1/tournaments/{id}");
    send(&app, "POST", &format!("{base}/publish"), Some(OWNER), None).await;

    for user in [100, 101] {
        let (status, _) = send(&app, "POST", &format!("{base}/registrations"), Some(user), Some(json!({}))).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, late) = send(&app, "POST", &format!("{base}/registrations"), Some(102), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(late["status"], "waitlisted");
    assert_eq!(late["waitlist_position"], 1);

    let (status, duplicate) =
        send(&app, "POST", &format!("{base}/registrations"), Some(100), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(duplicate["kind"], "already_registered");

    let (status, registrations) = send(&app, "GET", &format!("{base}/registrations"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(registrations.as_array().unwrap().len(), 3);
}
