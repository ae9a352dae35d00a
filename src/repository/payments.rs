//! Payments repository for database operations

use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::AppResult,
    models::payment::{CreatePayment, Payment, PaymentQuery},
};

use super::Page;

const PAYMENT_COLUMNS: &str = "id, student_id, borrow_id, amount, method, description, paid_at";

#[derive(Clone)]
pub struct PaymentsRepository {
    pool: Pool<Postgres>,
}

impl PaymentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Record a payment
    pub async fn create(&self, payment: &CreatePayment) -> AppResult<Payment> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (student_id, borrow_id, amount, method, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(payment.student_id)
        .bind(payment.borrow_id)
        .bind(payment.amount)
        .bind(&payment.method)
        .bind(&payment.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(payment)
    }

    /// Search payments, optionally restricted to one student
    pub async fn search(
        &self,
        student_id: Option<i32>,
        query: &PaymentQuery,
    ) -> AppResult<(Vec<Payment>, i64)> {
        let page = Page::new(query.page, query.per_page);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM payments WHERE TRUE");
        push_payment_filters(&mut count, student_id, query);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM payments WHERE TRUE",
            PAYMENT_COLUMNS
        ));
        push_payment_filters(&mut select, student_id, query);
        select
            .push(" ORDER BY paid_at DESC, id DESC LIMIT ")
            .push_bind(page.per_page)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let payments = select.build_query_as::<Payment>().fetch_all(&self.pool).await?;

        Ok((payments, total))
    }

    /// All payments of one student, most recent first
    pub async fn list_by_student(&self, student_id: i32) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {} FROM payments WHERE student_id = $1 ORDER BY paid_at DESC, id DESC",
            PAYMENT_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    /// Total fines charged and total paid for one student
    pub async fn totals_for_student(&self, student_id: i32) -> AppResult<(Decimal, Decimal)> {
        let totals: (Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COALESCE(SUM(fine_amount), 0) FROM borrows WHERE student_id = $1),
                (SELECT COALESCE(SUM(amount), 0) FROM payments WHERE student_id = $1)
            "#,
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }
}

fn push_payment_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    student_id: Option<i32>,
    query: &PaymentQuery,
) {
    if let Some(student_id) = student_id {
        builder.push(" AND student_id = ").push_bind(student_id);
    }
    if let Some(method) = query.method.as_deref().filter(|m| !m.is_empty()) {
        builder.push(" AND method = ").push_bind(method.to_lowercase());
    }
}
