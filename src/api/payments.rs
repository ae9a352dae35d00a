//! Payment endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::payment::{CreatePayment, Payment, PaymentQuery, StudentBalance},
    AppState,
};

use super::{PaginatedResponse, ValidatedJson};

/// List all payments (library owner)
#[utoipa::path(
    get,
    path = "/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(PaymentQuery),
    responses(
        (status = 200, description = "List of payments", body = PaginatedResponse<Payment>),
        (status = 403, description = "Library owners only", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentQuery>,
) -> AppResult<Json<PaginatedResponse<Payment>>> {
    let (payments, total) = state.services.payments.search_payments(&query).await?;
    Ok(Json(PaginatedResponse::new(payments, total, query.page, query.per_page)))
}

/// Record a payment
#[utoipa::path(
    post,
    path = "/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    request_body = CreatePayment,
    responses(
        (status = 201, description = "Payment recorded", body = Payment),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Student or borrow not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_payment(
    State(state): State<AppState>,
    ValidatedJson(payment): ValidatedJson<CreatePayment>,
) -> AppResult<(StatusCode, Json<Payment>)> {
    let created = state.services.payments.create_payment(payment).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Fines, payments and outstanding balance of a student
#[utoipa::path(
    get,
    path = "/students/{id}/balance",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Balance", body = StudentBalance),
        (status = 403, description = "Not the owner of this record", body = crate::error::ErrorResponse),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_student_balance(
    State(state): State<AppState>,
    Path(student_id): Path<i32>,
) -> AppResult<Json<StudentBalance>> {
    let balance = state.services.payments.student_balance(student_id).await?;
    Ok(Json(balance))
}
