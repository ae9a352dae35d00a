//! Report types

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

/// Library-wide totals
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SummaryReport {
    pub books: BookTotals,
    pub students: StudentTotals,
    pub borrows: BorrowTotals,
    pub finances: FinanceTotals,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct BookTotals {
    pub titles: i64,
    pub copies: i64,
    pub available_copies: i64,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct StudentTotals {
    pub total: i64,
    pub active: i64,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct BorrowTotals {
    pub total: i64,
    pub active: i64,
    pub overdue: i64,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct FinanceTotals {
    #[schema(value_type = String)]
    pub fines_charged: Decimal,
    #[schema(value_type = String)]
    pub payments_received: Decimal,
    #[schema(value_type = String)]
    pub outstanding: Decimal,
}
