//! Error normalization through the HTTP stack

mod common;

use axum::{
    http::{Method, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;

use common::{app, request, send, token};
use libris_server::{
    api::middleware::{handle_panic, normalize_errors, route_not_found},
    config::RunMode,
    error::{AppError, AppResult, DbFailure, GENERIC_ERROR_MESSAGE, MISSING_CREDENTIAL_MESSAGE},
};

async fn leaky() -> AppResult<&'static str> {
    Err(AppError::internal("connection string postgres://secret@db"))
}

async fn duplicate_isbn() -> AppResult<&'static str> {
    Err(DbFailure {
        code: Some("23505".to_string()),
        constraint: Some("books_isbn_key".to_string()),
        detail: Some("Key (isbn)=(9783161484100) already exists.".to_string()),
        ..Default::default()
    }
    .classify())
}

async fn boom() -> &'static str {
    panic!("handler exploded")
}

fn failing_app(run_mode: RunMode) -> Router {
    Router::new()
        .route("/leaky", get(leaky))
        .route("/duplicate", get(duplicate_isbn))
        .route("/boom", get(boom))
        .fallback(route_not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(from_fn_with_state(run_mode, normalize_errors))
}

#[tokio::test]
async fn production_masks_unexpected_errors() {
    let (status, body) = send(failing_app(RunMode::Production), request(Method::GET, "/leaky", None, None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"status": "error", "message": GENERIC_ERROR_MESSAGE}));
}

#[tokio::test]
async fn development_exposes_diagnostics() {
    let (status, body) = send(failing_app(RunMode::Development), request(Method::GET, "/leaky", None, None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "connection string postgres://secret@db");
    assert_eq!(body["error"]["status_code"], 500);
    assert_eq!(body["error"]["is_operational"], false);
    assert!(body["stack"].as_array().map(|s| !s.is_empty()).unwrap_or(false));
}

#[tokio::test]
async fn unique_violation_becomes_conflict_naming_the_field() {
    let (status, body) = send(
        failing_app(RunMode::Production),
        request(Method::GET, "/duplicate", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "fail");
    assert!(body["message"].as_str().unwrap().contains("isbn"));
}

#[tokio::test]
async fn panics_become_internal_errors() {
    let (status, body) = send(failing_app(RunMode::Production), request(Method::GET, "/boom", None, None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], GENERIC_ERROR_MESSAGE);

    let (status, body) = send(failing_app(RunMode::Development), request(Method::GET, "/boom", None, None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].as_str().unwrap().contains("handler exploded"));
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let (status, body) = send(
        failing_app(RunMode::Production),
        request(Method::GET, "/nowhere", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Can't find /nowhere on this server!");
}

#[tokio::test]
async fn router_health_is_public() {
    let (status, body) = send(app(RunMode::Production), request(Method::GET, "/api/v1/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn router_rejects_anonymous_access_to_protected_routes() {
    let (status, body) = send(app(RunMode::Production), request(Method::GET, "/api/v1/students", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], MISSING_CREDENTIAL_MESSAGE);
}

#[tokio::test]
async fn router_denies_students_owner_operations() {
    let student = token("42", "student", 3600);

    for (method, uri) in [
        (Method::GET, "/api/v1/students"),
        (Method::DELETE, "/api/v1/students/42"),
        (Method::GET, "/api/v1/borrows"),
        (Method::GET, "/api/v1/reports/summary"),
        (Method::GET, "/api/v1/students/7"),
        (Method::GET, "/api/v1/students/7/balance"),
    ] {
        let (status, body) = send(app(RunMode::Production), request(method.clone(), uri, Some(&student), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{} {}", method, uri);
        assert_eq!(body["status"], "fail");
    }

    let (status, _) = send(
        app(RunMode::Production),
        request(
            Method::POST,
            "/api/v1/borrows",
            Some(&student),
            Some(json!({"student_id": 7, "book_id": 1})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn router_unknown_path_and_method_are_not_found() {
    let (status, body) = send(app(RunMode::Production), request(Method::GET, "/api/v1/nope", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Can't find /api/v1/nope on this server!");

    let (status, _) = send(app(RunMode::Production), request(Method::PATCH, "/api/v1/health", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn router_rejects_invalid_payloads_before_the_database() {
    let (status, body) = send(
        app(RunMode::Production),
        request(Method::POST, "/api/v1/auth/login", None, Some(json!({"email": "not-an-email", "password": "x"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
    assert!(body["message"].as_str().unwrap().contains("email"));
}

#[tokio::test]
async fn router_masks_database_outage_in_production() {
    let (status, body) = send(app(RunMode::Production), request(Method::GET, "/api/v1/ready", None, None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"status": "error", "message": GENERIC_ERROR_MESSAGE}));
}
