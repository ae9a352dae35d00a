//! Borrows repository for database operations

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::borrow::{late_fine, late_fine_message, Borrow, BorrowDetails, BorrowQuery, LATE_FINE_TITLE},
};

use super::Page;

const BORROW_DETAILS_SELECT: &str = r#"
    SELECT b.id, b.student_id, u.full_name AS student_name, b.book_id,
           bk.title AS book_title, bk.isbn, b.borrowed_at, b.due_date,
           b.returned_at, b.fine_amount,
           (b.returned_at IS NULL AND b.due_date < NOW()) AS is_overdue
    FROM borrows b
    JOIN users u ON u.id = b.student_id
    JOIN books bk ON bk.id = b.book_id
"#;

/// Limits applied when a borrow is recorded
#[derive(Debug, Clone, Copy)]
pub struct BorrowRules {
    pub loan_days: i64,
    pub max_active_borrows: i64,
}

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a borrow with student and book details
    pub async fn get_details(&self, id: i32) -> AppResult<BorrowDetails> {
        sqlx::query_as::<_, BorrowDetails>(&format!("{} WHERE b.id = $1", BORROW_DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No borrow found with id {}", id)))
    }

    /// Search borrows, optionally restricted to one student
    pub async fn search(
        &self,
        student_id: Option<i32>,
        query: &BorrowQuery,
    ) -> AppResult<(Vec<BorrowDetails>, i64)> {
        let page = Page::new(query.page, query.per_page);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM borrows b WHERE TRUE");
        push_borrow_filters(&mut count, student_id, query);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(BORROW_DETAILS_SELECT);
        select.push(" WHERE TRUE");
        push_borrow_filters(&mut select, student_id, query);
        select
            .push(" ORDER BY b.borrowed_at DESC, b.id DESC LIMIT ")
            .push_bind(page.per_page)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let borrows = select
            .build_query_as::<BorrowDetails>()
            .fetch_all(&self.pool)
            .await?;

        Ok((borrows, total))
    }

    /// Record a borrow, taking one copy off the shelf.
    ///
    /// The student and book rows are locked for the duration of the
    /// transaction: borrows for one student are serialized against the
    /// active-borrow limit, and two borrows cannot both take the last copy.
    pub async fn create(&self, student_id: i32, book_id: i32, rules: BorrowRules) -> AppResult<Borrow> {
        let mut tx = self.pool.begin().await?;

        let student_active: Option<bool> =
            sqlx::query_scalar("SELECT is_active FROM students WHERE id = $1 FOR UPDATE")
                .bind(student_id)
                .fetch_optional(&mut *tx)
                .await?;
        match student_active {
            None => {
                return Err(AppError::not_found(format!("No student found with id {}", student_id)))
            }
            Some(false) => {
                return Err(AppError::validation("Student account is not active"));
            }
            Some(true) => {}
        }

        let available: Option<i32> =
            sqlx::query_scalar("SELECT available_copies FROM books WHERE id = $1 FOR UPDATE")
                .bind(book_id)
                .fetch_optional(&mut *tx)
                .await?;
        let available = available
            .ok_or_else(|| AppError::not_found(format!("No book found with id {}", book_id)))?;
        if available <= 0 {
            return Err(AppError::conflict("No copies of this book are available"));
        }

        let (active, same_book): (i64, bool) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(BOOL_OR(book_id = $2), FALSE)
            FROM borrows
            WHERE student_id = $1 AND returned_at IS NULL
            "#,
        )
        .bind(student_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if same_book {
            return Err(AppError::validation("Student already has this book on loan"));
        }
        if active >= rules.max_active_borrows {
            return Err(AppError::validation(format!(
                "Student has reached the limit of {} active borrows",
                rules.max_active_borrows
            )));
        }

        sqlx::query(
            "UPDATE books SET available_copies = available_copies - 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        let now = Utc::now();
        let borrow = sqlx::query_as::<_, Borrow>(
            r#"
            INSERT INTO borrows (student_id, book_id, borrowed_at, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, student_id, book_id, borrowed_at, due_date, returned_at, fine_amount
            "#,
        )
        .bind(student_id)
        .bind(book_id)
        .bind(now)
        .bind(now + Duration::days(rules.loan_days))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(borrow)
    }

    /// Close a borrow, charge the late fine and put the copy back on the shelf.
    ///
    /// A late return also notifies the student in the same transaction.
    pub async fn return_borrow(
        &self,
        id: i32,
        returned_at: DateTime<Utc>,
        daily_fine: Decimal,
    ) -> AppResult<Borrow> {
        let mut tx = self.pool.begin().await?;

        let borrow = sqlx::query_as::<_, Borrow>(
            r#"
            SELECT id, student_id, book_id, borrowed_at, due_date, returned_at, fine_amount
            FROM borrows WHERE id = $1 FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(format!("No borrow found with id {}", id)))?;

        if borrow.returned_at.is_some() {
            return Err(AppError::conflict("This borrow has already been returned"));
        }

        let fine = late_fine(borrow.due_date, returned_at, daily_fine);

        let returned = sqlx::query_as::<_, Borrow>(
            r#"
            UPDATE borrows SET returned_at = $2, fine_amount = $3
            WHERE id = $1
            RETURNING id, student_id, book_id, borrowed_at, due_date, returned_at, fine_amount
            "#,
        )
        .bind(id)
        .bind(returned_at)
        .bind(fine)
        .fetch_one(&mut *tx)
        .await?;

        let book_title: String = sqlx::query_scalar(
            r#"
            UPDATE books SET available_copies = LEAST(available_copies + 1, total_copies),
                             updated_at = NOW()
            WHERE id = $1
            RETURNING title
            "#,
        )
        .bind(borrow.book_id)
        .fetch_one(&mut *tx)
        .await?;

        if fine > Decimal::ZERO {
            sqlx::query("INSERT INTO notifications (student_id, title, message) VALUES ($1, $2, $3)")
                .bind(returned.student_id)
                .bind(LATE_FINE_TITLE)
                .bind(late_fine_message(&book_title, fine))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(returned)
    }

    /// Active borrows past their due date
    pub async fn overdue(&self) -> AppResult<Vec<BorrowDetails>> {
        let borrows = sqlx::query_as::<_, BorrowDetails>(&format!(
            "{} WHERE b.returned_at IS NULL AND b.due_date < NOW() ORDER BY b.due_date",
            BORROW_DETAILS_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(borrows)
    }
}

fn push_borrow_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    student_id: Option<i32>,
    query: &BorrowQuery,
) {
    if let Some(student_id) = student_id {
        builder.push(" AND b.student_id = ").push_bind(student_id);
    }
    match query.active {
        Some(true) => {
            builder.push(" AND b.returned_at IS NULL");
        }
        Some(false) => {
            builder.push(" AND b.returned_at IS NOT NULL");
        }
        None => {}
    }
    match query.overdue {
        Some(true) => {
            builder.push(" AND b.returned_at IS NULL AND b.due_date < NOW()");
        }
        Some(false) => {
            builder.push(" AND NOT (b.returned_at IS NULL AND b.due_date < NOW())");
        }
        None => {}
    }
}
