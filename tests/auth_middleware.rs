//! Authentication and authorization behaviour through the HTTP stack

mod common;

use axum::{
    http::{Method, StatusCode},
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use tower_http::catch_panic::CatchPanicLayer;

use common::{request, send, token, SECRET};
use libris_server::{
    api::{
        guards::{authorize, check_ownership, require_permission},
        middleware::{
            authenticate, handle_panic, normalize_errors, optional_authenticate, route_not_found,
            AuthState, DevBypass,
        },
    },
    config::{AuthConfig, RunMode},
    error::{EXPIRED_CREDENTIAL_MESSAGE, FORBIDDEN_MESSAGE, MALFORMED_CREDENTIAL_MESSAGE, MISSING_CREDENTIAL_MESSAGE},
    models::user::{Identity, Role},
    permissions::{PermissionTable, DELETE_STUDENTS},
};

async fn whoami(Extension(identity): Extension<Identity>) -> Json<Identity> {
    Json(identity)
}

async fn maybe_whoami(identity: Option<Extension<Identity>>) -> Json<Value> {
    Json(json!({ "identity": identity.map(|Extension(i)| i) }))
}

async fn echo(body: String) -> String {
    body
}

fn auth_state(run_mode: RunMode) -> AuthState {
    let config = AuthConfig {
        jwt_secret: SECRET.to_string(),
        dev_bypass_enabled: true,
        dev_bypass_token: Some("dev-token".to_string()),
        ..AuthConfig::default()
    };
    AuthState::new(
        SECRET,
        PermissionTable::standard().expect("standard permission table"),
        DevBypass::resolve(run_mode, &config),
    )
}

/// Small router exercising every gate with trivial handlers
fn gated_app(run_mode: RunMode) -> Router {
    let auth = auth_state(run_mode);
    let perms = auth.permissions().clone();

    let protected = Router::new()
        .route("/me", get(whoami))
        .route("/owners", get(whoami).route_layer(authorize(&[Role::LibraryOwner])))
        .route("/students/:id", get(whoami).route_layer(check_ownership("id")))
        .route(
            "/students/:id",
            axum::routing::delete(whoami).route_layer(require_permission(&perms, DELETE_STUDENTS)),
        )
        .route("/borrows", post(echo).route_layer(check_ownership("student_id")))
        .route_layer(from_fn_with_state(auth.clone(), authenticate));

    let optional = Router::new()
        .route("/catalog", get(maybe_whoami))
        .route_layer(from_fn_with_state(auth, optional_authenticate));

    protected
        .merge(optional)
        .fallback(route_not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(from_fn_with_state(run_mode, normalize_errors))
}

#[tokio::test]
async fn missing_credential_is_rejected() {
    let (status, body) = send(gated_app(RunMode::Production), request(Method::GET, "/me", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], MISSING_CREDENTIAL_MESSAGE);
}

#[tokio::test]
async fn expired_and_malformed_credentials_have_distinct_messages() {
    let expired = token("42", "student", -60);
    let (status, body) = send(
        gated_app(RunMode::Production),
        request(Method::GET, "/me", Some(&expired), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], EXPIRED_CREDENTIAL_MESSAGE);

    let (status, body) = send(
        gated_app(RunMode::Production),
        request(Method::GET, "/me", Some("garbage.token.value"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], MALFORMED_CREDENTIAL_MESSAGE);
}

#[tokio::test]
async fn valid_credential_attaches_canonical_identity() {
    let admin = token("1", "Admin", 3600);
    let (status, body) = send(
        gated_app(RunMode::Production),
        request(Method::GET, "/me", Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "1");
    assert_eq!(body["role"], "LIBRARY_OWNER");
}

#[tokio::test]
async fn authorize_admits_only_listed_roles() {
    let student = token("42", "student", 3600);
    let (status, body) = send(
        gated_app(RunMode::Production),
        request(Method::GET, "/owners", Some(&student), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], FORBIDDEN_MESSAGE);

    let owner = token("1", "owner", 3600);
    let (status, _) = send(
        gated_app(RunMode::Production),
        request(Method::GET, "/owners", Some(&owner), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_roles_hold_no_permissions() {
    let guest = token("5", "guest", 3600);
    let (status, _) = send(
        gated_app(RunMode::Production),
        request(Method::DELETE, "/students/5", Some(&guest), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn require_permission_checks_the_role_table() {
    let student = token("42", "student", 3600);
    let (status, _) = send(
        gated_app(RunMode::Production),
        request(Method::DELETE, "/students/42", Some(&student), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owner = token("1", "LIBRARY_OWNER", 3600);
    let (status, _) = send(
        gated_app(RunMode::Production),
        request(Method::DELETE, "/students/42", Some(&owner), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ownership_from_route_parameter() {
    let student = token("42", "student", 3600);

    let (status, _) = send(
        gated_app(RunMode::Production),
        request(Method::GET, "/students/42", Some(&student), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        gated_app(RunMode::Production),
        request(Method::GET, "/students/7", Some(&student), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], FORBIDDEN_MESSAGE);

    let owner = token("1", "admin", 3600);
    let (status, _) = send(
        gated_app(RunMode::Production),
        request(Method::GET, "/students/7", Some(&owner), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ownership_from_body_keeps_the_body_intact() {
    let student = token("42", "student", 3600);

    let response = send(
        gated_app(RunMode::Production),
        request(Method::POST, "/borrows", Some(&student), Some(json!({"student_id": 42, "book_id": 3}))),
    )
    .await;
    assert_eq!(response.0, StatusCode::OK);
    assert_eq!(response.1["student_id"], 42);
    assert_eq!(response.1["book_id"], 3);

    let (status, _) = send(
        gated_app(RunMode::Production),
        request(Method::POST, "/borrows", Some(&student), Some(json!({"student_id": 7, "book_id": 3}))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        gated_app(RunMode::Production),
        request(Method::POST, "/borrows", Some(&student), Some(json!({"book_id": 3}))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn optional_authentication_never_rejects() {
    let (status, body) = send(
        gated_app(RunMode::Production),
        request(Method::GET, "/catalog", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["identity"].is_null());

    let expired = token("42", "student", -60);
    let (status, body) = send(
        gated_app(RunMode::Production),
        request(Method::GET, "/catalog", Some(&expired), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["identity"].is_null());

    let student = token("42", "student", 3600);
    let (status, body) = send(
        gated_app(RunMode::Production),
        request(Method::GET, "/catalog", Some(&student), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["identity"]["id"], "42");
}

#[tokio::test]
async fn development_bypass_token_maps_to_an_owner() {
    let (status, body) = send(
        gated_app(RunMode::Development),
        request(Method::GET, "/catalog", Some("dev-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["identity"]["id"], "dev");
    assert_eq!(body["identity"]["role"], "LIBRARY_OWNER");
}

#[tokio::test]
async fn bypass_token_does_not_pass_strict_authentication() {
    for path in ["/me", "/owners"] {
        let (status, body) = send(
            gated_app(RunMode::Development),
            request(Method::GET, path, Some("dev-token"), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", path);
        assert_eq!(body["message"], MALFORMED_CREDENTIAL_MESSAGE);
    }
}

#[tokio::test]
async fn bypass_token_is_refused_in_production() {
    let (status, body) = send(
        gated_app(RunMode::Production),
        request(Method::GET, "/me", Some("dev-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], MALFORMED_CREDENTIAL_MESSAGE);

    let (_, body) = send(
        gated_app(RunMode::Production),
        request(Method::GET, "/catalog", Some("dev-token"), None),
    )
    .await;
    assert!(body["identity"].is_null());
}
