//! Notification endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::notification::{CreateNotification, Notification},
    AppState,
};

use super::{CurrentUser, ValidatedJson};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct NotificationQuery {
    /// Only unread notifications
    #[serde(default)]
    pub unread: bool,
}

/// List every notification (library owner)
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(NotificationQuery),
    responses(
        (status = 200, description = "Notifications", body = Vec<Notification>),
        (status = 403, description = "Library owners only", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = state.services.notifications.list_all(query.unread).await?;
    Ok(Json(notifications))
}

/// Notifications of a student, broadcasts included
#[utoipa::path(
    get,
    path = "/students/{id}/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Student ID"), NotificationQuery),
    responses(
        (status = 200, description = "Notifications", body = Vec<Notification>),
        (status = 403, description = "Not the owner of this record", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_student_notifications(
    State(state): State<AppState>,
    Path(student_id): Path<i32>,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = state
        .services
        .notifications
        .list_for_student(student_id, query.unread)
        .await?;
    Ok(Json(notifications))
}

/// Send a notification to one student or to all of them
#[utoipa::path(
    post,
    path = "/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    request_body = CreateNotification,
    responses(
        (status = 201, description = "Notification sent", body = Notification),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn send_notification(
    State(state): State<AppState>,
    ValidatedJson(notification): ValidatedJson<CreateNotification>,
) -> AppResult<(StatusCode, Json<Notification>)> {
    let created = state.services.notifications.send(notification).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Mark a notification as read
#[utoipa::path(
    patch,
    path = "/notifications/{id}/read",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification updated", body = Notification),
        (status = 403, description = "Not the recipient", body = crate::error::ErrorResponse),
        (status = 404, description = "Notification not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Notification>> {
    let notification = state.services.notifications.mark_read(&identity, id).await?;
    Ok(Json(notification))
}
