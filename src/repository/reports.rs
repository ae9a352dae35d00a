//! Aggregate queries for reports

use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::report::{BookTotals, BorrowTotals, FinanceTotals, StudentTotals, SummaryReport},
};

#[derive(Clone)]
pub struct ReportsRepository {
    pool: Pool<Postgres>,
}

impl ReportsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Library-wide totals
    pub async fn summary(&self) -> AppResult<SummaryReport> {
        let (titles, copies, available_copies): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(total_copies), 0)::BIGINT,
                   COALESCE(SUM(available_copies), 0)::BIGINT
            FROM books
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let (students_total, students_active): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM students",
        )
        .fetch_one(&self.pool)
        .await?;

        let (borrows_total, borrows_active, borrows_overdue): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE returned_at IS NULL),
                   COUNT(*) FILTER (WHERE returned_at IS NULL AND due_date < NOW())
            FROM borrows
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let (fines_charged, payments_received): (Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT (SELECT COALESCE(SUM(fine_amount), 0) FROM borrows),
                   (SELECT COALESCE(SUM(amount), 0) FROM payments)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(SummaryReport {
            books: BookTotals {
                titles,
                copies,
                available_copies,
            },
            students: StudentTotals {
                total: students_total,
                active: students_active,
            },
            borrows: BorrowTotals {
                total: borrows_total,
                active: borrows_active,
                overdue: borrows_overdue,
            },
            finances: FinanceTotals {
                fines_charged,
                payments_received,
                outstanding: (fines_charged - payments_received).max(Decimal::ZERO),
            },
        })
    }
}
