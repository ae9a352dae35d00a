//! Payment model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// Accepted payment methods
pub const PAYMENT_METHODS: &[&str] = &["cash", "card", "transfer"];

/// Payment from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: i32,
    pub student_id: i32,
    pub borrow_id: Option<i32>,
    #[schema(value_type = String, example = "2.50")]
    pub amount: Decimal,
    pub method: String,
    pub description: Option<String>,
    pub paid_at: DateTime<Utc>,
}

/// Payment query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct PaymentQuery {
    pub method: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Record payment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePayment {
    #[validate(range(min = 1, message = "Invalid student id"))]
    pub student_id: i32,
    pub borrow_id: Option<i32>,
    #[schema(value_type = String, example = "2.50")]
    #[validate(custom(function = "validate_amount"))]
    pub amount: Decimal,
    #[validate(custom(function = "validate_method"))]
    pub method: String,
    #[validate(length(max = 500, message = "Description is too long"))]
    pub description: Option<String>,
}

/// A student's fines, payments and what remains to be paid
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentBalance {
    pub student_id: i32,
    #[schema(value_type = String)]
    pub total_fines: Decimal,
    #[schema(value_type = String)]
    pub total_paid: Decimal,
    /// Fines minus payments, never below zero
    #[schema(value_type = String)]
    pub outstanding: Decimal,
    pub payments: Vec<Payment>,
}

fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() && amount.scale() <= 2 {
        Ok(())
    } else {
        let mut err = ValidationError::new("amount");
        err.message = Some("Amount must be positive with at most two decimals".into());
        Err(err)
    }
}

fn validate_method(method: &str) -> Result<(), ValidationError> {
    if PAYMENT_METHODS.contains(&method) {
        Ok(())
    } else {
        let mut err = ValidationError::new("method");
        err.message = Some("Payment method must be cash, card or transfer".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_must_be_positive_cents() {
        assert!(validate_amount(&Decimal::new(250, 2)).is_ok());
        assert!(validate_amount(&Decimal::ZERO).is_err());
        assert!(validate_amount(&Decimal::new(-100, 2)).is_err());
        assert!(validate_amount(&Decimal::new(1005, 3)).is_err());
    }

    #[test]
    fn method_is_one_of_known_values() {
        assert!(validate_method("cash").is_ok());
        assert!(validate_method("bitcoin").is_err());
    }
}
