//! Borrowing endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::borrow::{Borrow, BorrowDetails, BorrowQuery, CreateBorrow},
    AppState,
};

use super::{CurrentUser, PaginatedResponse, ValidatedJson};

/// List all borrows (library owner)
#[utoipa::path(
    get,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(BorrowQuery),
    responses(
        (status = 200, description = "List of borrows", body = PaginatedResponse<BorrowDetails>),
        (status = 403, description = "Library owners only", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_borrows(
    State(state): State<AppState>,
    Query(query): Query<BorrowQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowDetails>>> {
    let (borrows, total) = state.services.borrows.search_borrows(&query).await?;
    Ok(Json(PaginatedResponse::new(borrows, total, query.page, query.per_page)))
}

/// List the borrows of one student
#[utoipa::path(
    get,
    path = "/students/{id}/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Student ID"), BorrowQuery),
    responses(
        (status = 200, description = "Borrows of the student", body = PaginatedResponse<BorrowDetails>),
        (status = 403, description = "Not the owner of this record", body = crate::error::ErrorResponse),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_student_borrows(
    State(state): State<AppState>,
    Path(student_id): Path<i32>,
    Query(query): Query<BorrowQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowDetails>>> {
    let (borrows, total) = state
        .services
        .borrows
        .get_student_borrows(student_id, &query)
        .await?;
    Ok(Json(PaginatedResponse::new(borrows, total, query.page, query.per_page)))
}

/// Get one borrow; students only see their own
#[utoipa::path(
    get,
    path = "/borrows/{id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow ID")),
    responses(
        (status = 200, description = "Borrow details", body = BorrowDetails),
        (status = 403, description = "Not the owner of this borrow", body = crate::error::ErrorResponse),
        (status = 404, description = "Borrow not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_borrow(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowDetails>> {
    let borrow = state.services.borrows.get_borrow(id).await?;
    if !identity.can_access(&borrow.student_id.to_string()) {
        return Err(AppError::forbidden());
    }
    Ok(Json(borrow))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    request_body = CreateBorrow,
    responses(
        (status = 201, description = "Book borrowed", body = Borrow),
        (status = 400, description = "Borrow limit reached or book already held", body = crate::error::ErrorResponse),
        (status = 403, description = "Borrowing for another student", body = crate::error::ErrorResponse),
        (status = 404, description = "Student or book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "No copy available", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_borrow(
    State(state): State<AppState>,
    ValidatedJson(borrow): ValidatedJson<CreateBorrow>,
) -> AppResult<(StatusCode, Json<Borrow>)> {
    let created = state.services.borrows.create_borrow(borrow).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrows/{id}/return",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow ID")),
    responses(
        (status = 200, description = "Book returned", body = Borrow),
        (status = 404, description = "Borrow not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_borrow(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Borrow>> {
    let returned = state.services.borrows.return_borrow(id).await?;
    Ok(Json(returned))
}
