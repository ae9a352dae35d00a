//! Error types for Libris server
//!
//! Every failure is an [`AppError`]: an [`ErrorKind`] discriminant, a message
//! and an `operational` flag. Operational errors are anticipated failures whose
//! message is safe to show to the caller; anything else is masked in
//! production. Conversions from the persistence, credential and validation
//! layers live here so handlers can simply use `?`.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::config::RunMode;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What clients see in production instead of a non-operational error
pub const GENERIC_ERROR_MESSAGE: &str = "Something went very wrong!";

pub const MISSING_CREDENTIAL_MESSAGE: &str = "You are not logged in! Please log in to get access.";
pub const EXPIRED_CREDENTIAL_MESSAGE: &str = "Your token has expired! Please log in again.";
pub const MALFORMED_CREDENTIAL_MESSAGE: &str = "Invalid token. Please log in again.";
pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action";

// PostgreSQL SQLSTATE codes
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const NOT_NULL_VIOLATION: &str = "23502";
const CHECK_VIOLATION: &str = "23514";
const DATA_EXCEPTION_CLASS: &str = "22";

/// Error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Unauthenticated,
    ExpiredCredential,
    MalformedCredential,
    Forbidden,
    ValidationError,
    Conflict,
    NotFound,
    InternalError,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::Unauthenticated
            | ErrorKind::ExpiredCredential
            | ErrorKind::MalformedCredential => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Closest kind for a status produced outside of [`AppError`]
    /// (extractor rejections, method mismatches, panics).
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ErrorKind::Unauthenticated,
            StatusCode::FORBIDDEN => ErrorKind::Forbidden,
            StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED => ErrorKind::NotFound,
            StatusCode::CONFLICT => ErrorKind::Conflict,
            s if s.is_client_error() => ErrorKind::ValidationError,
            _ => ErrorKind::InternalError,
        }
    }
}

/// `"fail"` for 4xx responses, `"error"` for everything else
pub fn status_label(status: StatusCode) -> &'static str {
    if status.is_client_error() {
        "fail"
    } else {
        "error"
    }
}

/// Main application error type
#[derive(Error, Debug)]
#[error("{kind:?}: {message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    operational: bool,
    source: Option<BoxError>,
}

impl AppError {
    /// Build an error of the given kind. Every kind except
    /// [`ErrorKind::InternalError`] is operational.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            operational: kind != ErrorKind::InternalError,
            source: None,
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    pub fn missing_credential() -> Self {
        Self::unauthenticated(MISSING_CREDENTIAL_MESSAGE)
    }

    pub fn expired_credential() -> Self {
        Self::new(ErrorKind::ExpiredCredential, EXPIRED_CREDENTIAL_MESSAGE)
    }

    pub fn malformed_credential() -> Self {
        Self::new(ErrorKind::MalformedCredential, MALFORMED_CREDENTIAL_MESSAGE)
    }

    pub fn forbidden() -> Self {
        Self::new(ErrorKind::Forbidden, FORBIDDEN_MESSAGE)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Non-operational failure: logged in full, masked for clients in production
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    /// Attach the underlying cause
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_operational(&self) -> bool {
        self.operational
    }

    pub fn status_code(&self) -> StatusCode {
        if self.operational {
            self.kind.status_code()
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// The message a production client is allowed to see
    pub fn public_message(&self) -> &str {
        if self.operational {
            &self.message
        } else {
            GENERIC_ERROR_MESSAGE
        }
    }

    /// This error followed by its chain of causes, one entry per line
    pub fn stack(&self) -> Vec<String> {
        let mut stack = vec![self.to_string()];
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            stack.push(format!("caused by: {}", cause));
            current = cause.source();
        }
        stack
    }

    /// Shape the response body for the given run mode
    pub fn render(&self, mode: RunMode) -> Response {
        let status = self.status_code();
        let label = status_label(status).to_string();

        if mode.is_production() {
            let body = ErrorResponse {
                status: label,
                message: self.public_message().to_string(),
            };
            return (status, Json(body)).into_response();
        }

        let body = DiagnosticErrorResponse {
            status: label,
            error: ErrorDetail {
                kind: self.kind,
                status_code: status.as_u16(),
                is_operational: self.operational,
                message: self.message.clone(),
            },
            message: self.message.clone(),
            stack: self.stack(),
        };
        (status, Json(body)).into_response()
    }
}

/// Error response body (production)
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// "fail" for client errors, "error" for server errors
    pub status: String,
    pub message: String,
}

/// Error response body (development)
#[derive(Debug, Serialize)]
pub struct DiagnosticErrorResponse {
    pub status: String,
    pub error: ErrorDetail,
    pub message: String,
    pub stack: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub status_code: u16,
    pub is_operational: bool,
    pub message: String,
}

/// The original error, carried in response extensions so the
/// normalization layer can log it and re-render it for the run mode.
#[derive(Debug, Clone)]
pub struct ErrorReport(pub Arc<AppError>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Production shape unless the normalization layer says otherwise
        let mut response = self.render(RunMode::Production);
        response.extensions_mut().insert(ErrorReport(Arc::new(self)));
        response
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

static KEY_DETAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Key \(([^)]+)\)=").expect("valid key detail pattern"));

/// The parts of a database constraint failure the classifier looks at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbFailure {
    pub code: Option<String>,
    pub constraint: Option<String>,
    pub table: Option<String>,
    pub column: Option<String>,
    pub detail: Option<String>,
}

impl DbFailure {
    pub fn from_database_error(err: &dyn sqlx::error::DatabaseError) -> Self {
        let mut failure = DbFailure {
            code: err.code().map(|code| code.into_owned()),
            constraint: err.constraint().map(str::to_owned),
            ..Default::default()
        };

        if let Some(pg) = err.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
            failure.table = pg.table().map(str::to_owned);
            failure.column = pg.column().map(str::to_owned);
            failure.detail = pg.detail().map(str::to_owned);
        }

        failure
    }

    /// Column(s) named by the failure, e.g. `isbn` for `Key (isbn)=(...)`
    pub fn offending_field(&self) -> Option<String> {
        if let Some(captures) = self.detail.as_deref().and_then(|d| KEY_DETAIL.captures(d)) {
            return Some(captures[1].to_string());
        }
        if let Some(column) = &self.column {
            return Some(column.clone());
        }

        // Fall back to PostgreSQL default constraint naming: <table>_<column>_key
        let constraint = self.constraint.as_deref()?;
        let stripped = ["_key", "_fkey", "_check"]
            .iter()
            .find_map(|suffix| constraint.strip_suffix(suffix))
            .unwrap_or(constraint);
        let field = match &self.table {
            Some(table) => stripped
                .strip_prefix(table.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .unwrap_or(stripped),
            None => stripped,
        };
        Some(field.to_string())
    }

    pub fn classify(&self) -> AppError {
        let field = self.offending_field();

        match self.code.as_deref() {
            Some(UNIQUE_VIOLATION) => {
                let field = field.unwrap_or_else(|| "A record with this value".to_string());
                AppError::conflict(format!("{} already exists. Please use another value", field))
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                let still_referenced = self
                    .detail
                    .as_deref()
                    .map(|d| d.contains("still referenced"))
                    .unwrap_or(false);
                if still_referenced {
                    AppError::validation("This record is still referenced by other records")
                } else {
                    AppError::validation(format!(
                        "{} does not reference an existing record",
                        field.unwrap_or_else(|| "A related field".to_string())
                    ))
                }
            }
            Some(NOT_NULL_VIOLATION) => AppError::validation(format!(
                "Missing required field: {}",
                field.unwrap_or_else(|| "unknown".to_string())
            )),
            Some(CHECK_VIOLATION) => AppError::validation(format!(
                "Invalid value for {}",
                field.unwrap_or_else(|| "a constrained field".to_string())
            )),
            Some(code) if code.starts_with(DATA_EXCEPTION_CLASS) => {
                AppError::validation("Invalid input data")
            }
            code => {
                tracing::error!(
                    code = code.unwrap_or("none"),
                    constraint = ?self.constraint,
                    "Unhandled database error code"
                );
                AppError::internal("Unhandled database error")
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let classified = match &err {
            sqlx::Error::RowNotFound => AppError::not_found("No record found with that ID"),
            sqlx::Error::Database(db_err) => DbFailure::from_database_error(db_err.as_ref()).classify(),
            sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => {
                AppError::validation("Invalid data for the requested operation")
            }
            _ => AppError::internal("Database operation failed"),
        };
        classified.with_source(err)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        let classified = match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::expired_credential(),
            _ => AppError::malformed_credential(),
        };
        classified.with_source(err)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: invalid ({})", field, e.code),
                })
            })
            .collect();
        messages.sort();
        AppError::validation(format!("Invalid input data. {}", messages.join(". ")))
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AppError::internal(format!("Password hashing failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn unique_violation(detail: &str, constraint: &str) -> DbFailure {
        DbFailure {
            code: Some(UNIQUE_VIOLATION.to_string()),
            constraint: Some(constraint.to_string()),
            table: Some("books".to_string()),
            detail: Some(detail.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn unique_violation_names_the_field() {
        let err = unique_violation("Key (isbn)=(978-0) already exists.", "books_isbn_key").classify();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(err.message().contains("isbn already exists"));
    }

    #[test]
    fn unique_violation_falls_back_to_constraint_name() {
        let failure = DbFailure {
            code: Some(UNIQUE_VIOLATION.to_string()),
            constraint: Some("books_isbn_key".to_string()),
            table: Some("books".to_string()),
            ..Default::default()
        };
        assert!(failure.classify().message().contains("isbn already exists"));
    }

    #[test]
    fn row_not_found_is_404() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.is_operational());
    }

    #[test]
    fn relation_failures_are_validation_errors() {
        let fk = DbFailure {
            code: Some(FOREIGN_KEY_VIOLATION.to_string()),
            detail: Some("Key (book_id)=(99) is not present in table \"books\".".to_string()),
            ..Default::default()
        }
        .classify();
        assert_eq!(fk.kind(), ErrorKind::ValidationError);
        assert!(fk.message().starts_with("book_id"));

        let missing = DbFailure {
            code: Some(NOT_NULL_VIOLATION.to_string()),
            column: Some("title".to_string()),
            ..Default::default()
        }
        .classify();
        assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
        assert!(missing.message().contains("title"));
    }

    #[test]
    fn unknown_database_code_is_internal() {
        let err = DbFailure {
            code: Some("40P01".to_string()),
            ..Default::default()
        }
        .classify();
        assert_eq!(err.kind(), ErrorKind::InternalError);
        assert!(!err.is_operational());
        assert_eq!(err.public_message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn status_label_follows_status_class() {
        assert_eq!(status_label(StatusCode::BAD_REQUEST), "fail");
        assert_eq!(status_label(StatusCode::CONFLICT), "fail");
        assert_eq!(status_label(StatusCode::INTERNAL_SERVER_ERROR), "error");
    }

    #[test]
    fn credential_kinds_are_distinct() {
        assert_ne!(
            AppError::expired_credential().message(),
            AppError::malformed_credential().message()
        );
        assert_eq!(
            AppError::expired_credential().status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn production_masks_non_operational_errors() {
        let err = AppError::internal("index out of bounds in report builder");
        let response = err.render(RunMode::Production);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], GENERIC_ERROR_MESSAGE);
        assert!(body.get("stack").is_none());
    }

    #[tokio::test]
    async fn production_shows_operational_messages() {
        let response = AppError::not_found("No book found with that ID").render(RunMode::Production);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "No book found with that ID");
    }

    #[tokio::test]
    async fn development_includes_diagnostics() {
        let err = AppError::internal("boom").with_source(std::io::Error::other("disk full"));
        let body = body_json(err.render(RunMode::Development)).await;

        assert_eq!(body["message"], "boom");
        assert_eq!(body["error"]["is_operational"], false);
        let stack = body["stack"].as_array().unwrap();
        assert_eq!(stack.len(), 2);
        assert!(stack[1].as_str().unwrap().contains("disk full"));
    }

    #[test]
    fn into_response_carries_report() {
        let response = AppError::forbidden().into_response();
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert_eq!(report.0.kind(), ErrorKind::Forbidden);
    }
}
