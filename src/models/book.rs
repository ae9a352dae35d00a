//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// Book from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub category: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Book query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Matches title or author (case-insensitive)
    pub search: Option<String>,
    pub category: Option<String>,
    /// Only books with at least one copy on the shelf
    pub available: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: String,
    #[validate(length(min = 1, max = 500, message = "A book must have a title"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "A book must have an author"))]
    pub author: String,
    pub publisher: Option<String>,
    #[validate(range(min = 1000, max = 2100, message = "Publication year is out of range"))]
    pub published_year: Option<i32>,
    pub category: Option<String>,
    #[validate(range(min = 0, max = 10000, message = "Copies must be between 0 and 10000"))]
    pub total_copies: Option<i32>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: Option<String>,
    #[validate(length(min = 1, max = 500, message = "A book must have a title"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "A book must have an author"))]
    pub author: Option<String>,
    pub publisher: Option<String>,
    #[validate(range(min = 1000, max = 2100, message = "Publication year is out of range"))]
    pub published_year: Option<i32>,
    pub category: Option<String>,
    /// New total; available copies shift by the same difference
    #[validate(range(min = 0, max = 10000, message = "Copies must be between 0 and 10000"))]
    pub total_copies: Option<i32>,
}

/// ISBN-10 or ISBN-13, hyphens and spaces ignored
fn validate_isbn(isbn: &str) -> Result<(), ValidationError> {
    let digits: Vec<char> = isbn.chars().filter(|c| *c != '-' && *c != ' ').collect();
    let valid = match digits.len() {
        10 => {
            digits[..9].iter().all(|c| c.is_ascii_digit())
                && (digits[9].is_ascii_digit() || digits[9] == 'X' || digits[9] == 'x')
        }
        13 => digits.iter().all(|c| c.is_ascii_digit()),
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("isbn");
        err.message = Some("ISBN must have 10 or 13 digits".into());
        Err(err)
    }
}
