//! Borrow (loan) model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Borrow row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrow {
    pub id: i32,
    pub student_id: i32,
    pub book_id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, example = "1.50")]
    pub fine_amount: Decimal,
}

/// Borrow with book and student details for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowDetails {
    pub id: i32,
    pub student_id: i32,
    pub student_name: String,
    pub book_id: i32,
    pub book_title: String,
    pub isbn: String,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, example = "0.00")]
    pub fine_amount: Decimal,
    pub is_overdue: bool,
}

/// Borrow query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BorrowQuery {
    /// Only borrows not yet returned
    pub active: Option<bool>,
    /// Only active borrows past their due date
    pub overdue: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Borrow request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBorrow {
    #[validate(range(min = 1, message = "Invalid student id"))]
    pub student_id: i32,
    #[validate(range(min = 1, message = "Invalid book id"))]
    pub book_id: i32,
}

/// Fine for a return at `returned_at`: `daily_fine` for each started day late
pub fn late_fine(due_date: DateTime<Utc>, returned_at: DateTime<Utc>, daily_fine: Decimal) -> Decimal {
    if returned_at <= due_date {
        return Decimal::ZERO;
    }
    const DAY_MS: i64 = 86_400_000;
    let late_ms = (returned_at - due_date).num_milliseconds();
    let started_days = (late_ms + DAY_MS - 1) / DAY_MS;
    daily_fine * Decimal::from(started_days)
}

/// Title of the notification sent for a late return
pub const LATE_FINE_TITLE: &str = "Late return fine";

pub fn late_fine_message(book_title: &str, fine: Decimal) -> String {
    format!(
        "\"{}\" was returned after its due date. A fine of {} has been charged.",
        book_title, fine
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn no_fine_when_on_time() {
        let due = Utc::now();
        assert_eq!(late_fine(due, due, Decimal::new(50, 2)), Decimal::ZERO);
        assert_eq!(late_fine(due, due - Duration::days(3), Decimal::new(50, 2)), Decimal::ZERO);
    }

    #[test]
    fn fine_counts_started_days() {
        let due = Utc::now();
        let fine = Decimal::new(50, 2);
        assert_eq!(late_fine(due, due + Duration::minutes(5), fine), Decimal::new(50, 2));
        assert_eq!(late_fine(due, due + Duration::days(3), fine), Decimal::new(150, 2));
        assert_eq!(
            late_fine(due, due + Duration::days(3) + Duration::seconds(1), fine),
            Decimal::new(200, 2)
        );
    }

    #[test]
    fn sub_second_lateness_starts_a_day() {
        let due = Utc::now();
        let fine = Decimal::new(50, 2);
        assert_eq!(late_fine(due, due + Duration::milliseconds(1), fine), Decimal::new(50, 2));
        assert_eq!(
            late_fine(due, due + Duration::days(1) + Duration::milliseconds(1), fine),
            Decimal::new(100, 2)
        );
    }

    #[test]
    fn late_fine_message_names_book_and_amount() {
        let message = late_fine_message("Dune", Decimal::new(150, 2));
        assert_eq!(
            message,
            "\"Dune\" was returned after its due date. A fine of 1.50 has been charged."
        );
    }
}
