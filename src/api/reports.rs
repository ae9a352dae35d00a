//! Reporting endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{borrow::BorrowDetails, report::SummaryReport},
    AppState,
};

/// Library-wide totals
#[utoipa::path(
    get,
    path = "/reports/summary",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Summary", body = SummaryReport),
        (status = 403, description = "Missing read:reports", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_summary(State(state): State<AppState>) -> AppResult<Json<SummaryReport>> {
    let report = state.services.reports.summary().await?;
    Ok(Json(report))
}

/// Active borrows past their due date
#[utoipa::path(
    get,
    path = "/reports/overdue",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue borrows", body = Vec<BorrowDetails>),
        (status = 403, description = "Missing read:reports", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_overdue(State(state): State<AppState>) -> AppResult<Json<Vec<BorrowDetails>>> {
    let overdue = state.services.reports.overdue().await?;
    Ok(Json(overdue))
}
