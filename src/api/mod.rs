//! API handlers for Libris REST endpoints

pub mod auth;
pub mod books;
pub mod borrows;
pub mod guards;
pub mod health;
pub mod middleware;
pub mod notifications;
pub mod openapi;
pub mod payments;
pub mod reports;
pub mod students;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{Identity, Role},
    permissions::*,
    repository::Page,
    AppState,
};

use guards::{authorize, check_ownership, require_permission};
use middleware::{authenticate, handle_panic, normalize_errors, optional_authenticate, route_not_found};

/// Identity attached by [`middleware::authenticate`]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(AppError::missing_credential)
    }
}

/// Identity attached by [`middleware::optional_authenticate`], if any
pub struct MaybeUser(pub Option<Identity>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<Identity>().cloned()))
    }
}

/// JSON body deserialized and then checked with `validator`
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Current page content
    pub items: Vec<T>,
    /// Total number of matching records
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, total: i64, page: Option<i64>, per_page: Option<i64>) -> Self {
        let page = Page::new(page, per_page);
        Self {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        }
    }
}

/// Build the application router with every route and the shared layers
pub fn router(state: AppState) -> Router {
    let perms = state.auth.permissions().clone();
    let owner_only = [Role::LibraryOwner];

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/auth/login", post(auth::login));

    // Catalog browsing; a credential is used when present
    let catalog = Router::new()
        .route("/books", get(books::list_books))
        .route("/books/:id", get(books::get_book))
        .route_layer(from_fn_with_state(state.auth.clone(), optional_authenticate));

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        // Books
        .route(
            "/books",
            post(books::create_book).route_layer(require_permission(&perms, WRITE_BOOKS)),
        )
        .route(
            "/books/:id",
            put(books::update_book).route_layer(require_permission(&perms, WRITE_BOOKS)),
        )
        .route(
            "/books/:id",
            delete(books::delete_book).route_layer(require_permission(&perms, DELETE_BOOKS)),
        )
        // Students
        .route(
            "/students",
            get(students::list_students).route_layer(require_permission(&perms, READ_STUDENTS)),
        )
        .route(
            "/students",
            post(students::create_student).route_layer(require_permission(&perms, WRITE_STUDENTS)),
        )
        .route(
            "/students/:id",
            get(students::get_student)
                .put(students::update_student)
                .route_layer(check_ownership("id")),
        )
        .route(
            "/students/:id",
            delete(students::delete_student).route_layer(require_permission(&perms, DELETE_STUDENTS)),
        )
        .route(
            "/students/:id/borrows",
            get(borrows::list_student_borrows)
                .route_layer(check_ownership("id"))
                .route_layer(require_permission(&perms, READ_BORROWS)),
        )
        .route(
            "/students/:id/balance",
            get(payments::get_student_balance)
                .route_layer(check_ownership("id"))
                .route_layer(require_permission(&perms, READ_PAYMENTS)),
        )
        .route(
            "/students/:id/notifications",
            get(notifications::list_student_notifications)
                .route_layer(check_ownership("id"))
                .route_layer(require_permission(&perms, READ_NOTIFICATIONS)),
        )
        // Borrowing
        .route(
            "/borrows",
            get(borrows::list_borrows)
                .route_layer(require_permission(&perms, READ_BORROWS))
                .route_layer(authorize(&owner_only)),
        )
        .route(
            "/borrows",
            post(borrows::create_borrow)
                .route_layer(check_ownership("student_id"))
                .route_layer(require_permission(&perms, CREATE_BORROWS)),
        )
        .route(
            "/borrows/:id",
            get(borrows::get_borrow).route_layer(require_permission(&perms, READ_BORROWS)),
        )
        .route(
            "/borrows/:id/return",
            post(borrows::return_borrow).route_layer(require_permission(&perms, WRITE_BORROWS)),
        )
        // Payments
        .route(
            "/payments",
            get(payments::list_payments)
                .route_layer(require_permission(&perms, READ_PAYMENTS))
                .route_layer(authorize(&owner_only)),
        )
        .route(
            "/payments",
            post(payments::create_payment).route_layer(require_permission(&perms, WRITE_PAYMENTS)),
        )
        // Notifications
        .route(
            "/notifications",
            get(notifications::list_notifications)
                .route_layer(require_permission(&perms, READ_NOTIFICATIONS))
                .route_layer(authorize(&owner_only)),
        )
        .route(
            "/notifications",
            post(notifications::send_notification)
                .route_layer(require_permission(&perms, WRITE_NOTIFICATIONS)),
        )
        .route(
            "/notifications/:id/read",
            patch(notifications::mark_notification_read)
                .route_layer(require_permission(&perms, READ_NOTIFICATIONS)),
        )
        // Reports
        .route(
            "/reports/summary",
            get(reports::get_summary).route_layer(require_permission(&perms, READ_REPORTS)),
        )
        .route(
            "/reports/overdue",
            get(reports::get_overdue).route_layer(require_permission(&perms, READ_REPORTS)),
        )
        .route_layer(from_fn_with_state(state.auth.clone(), authenticate));

    let api_v1 = public
        .merge(catalog)
        .merge(protected)
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .fallback(route_not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(from_fn_with_state(state.config.run_mode, normalize_errors))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
