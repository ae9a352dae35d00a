//! Student model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Student profile joined with its account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    /// Same as the account id; the value a student's token carries as subject
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub student_number: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Short student representation for lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudentShort {
    pub id: i32,
    pub full_name: String,
    pub student_number: String,
    pub is_active: bool,
    pub active_borrows: i64,
}

/// Student query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct StudentQuery {
    /// Matches name, email or student number
    pub search: Option<String>,
    pub active: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create student request (library owner)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStudent {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 255, message = "Please provide the student's name"))]
    pub full_name: String,
    /// Generated when omitted
    #[validate(length(min = 3, max = 32, message = "Student number must be 3-32 characters"))]
    pub student_number: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Update student request (owner or the student)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStudent {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Name must not be empty"))]
    pub full_name: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Only library owners may change this
    pub is_active: Option<bool>,
}
