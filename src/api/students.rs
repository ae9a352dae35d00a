//! Student management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::student::{CreateStudent, Student, StudentQuery, StudentShort, UpdateStudent},
    AppState,
};

use super::{CurrentUser, PaginatedResponse, ValidatedJson};

/// List students
#[utoipa::path(
    get,
    path = "/students",
    tag = "students",
    security(("bearer_auth" = [])),
    params(StudentQuery),
    responses(
        (status = 200, description = "List of students", body = PaginatedResponse<StudentShort>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 403, description = "Missing read:students", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_students(
    State(state): State<AppState>,
    Query(query): Query<StudentQuery>,
) -> AppResult<Json<PaginatedResponse<StudentShort>>> {
    let (students, total) = state.services.students.search_students(&query).await?;
    Ok(Json(PaginatedResponse::new(students, total, query.page, query.per_page)))
}

/// Get a student; students may only read their own record
#[utoipa::path(
    get,
    path = "/students/{id}",
    tag = "students",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student details", body = Student),
        (status = 403, description = "Not the owner of this record", body = crate::error::ErrorResponse),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Student>> {
    let student = state.services.students.get_student(id).await?;
    Ok(Json(student))
}

/// Register a student account
#[utoipa::path(
    post,
    path = "/students",
    tag = "students",
    security(("bearer_auth" = [])),
    request_body = CreateStudent,
    responses(
        (status = 201, description = "Student created", body = Student),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Email or student number already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_student(
    State(state): State<AppState>,
    ValidatedJson(student): ValidatedJson<CreateStudent>,
) -> AppResult<(StatusCode, Json<Student>)> {
    let created = state.services.students.create_student(student).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a student; only library owners may change the active flag
#[utoipa::path(
    put,
    path = "/students/{id}",
    tag = "students",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Student ID")),
    request_body = UpdateStudent,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_student(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i32>,
    ValidatedJson(student): ValidatedJson<UpdateStudent>,
) -> AppResult<Json<Student>> {
    if student.is_active.is_some() && !identity.is_library_owner() {
        return Err(AppError::forbidden());
    }

    let updated = state.services.students.update_student(id, student).await?;
    Ok(Json(updated))
}

/// Delete a student and their account
#[utoipa::path(
    delete,
    path = "/students/{id}",
    tag = "students",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 204, description = "Student deleted"),
        (status = 403, description = "Missing delete:students", body = crate::error::ErrorResponse),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.students.delete_student(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
