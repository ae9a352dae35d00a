//! Books repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
};

use super::Page;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No book found with id {}", id)))
    }

    /// Search books with pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let page = Page::new(query.page, query.per_page);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books WHERE TRUE");
        push_book_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM books WHERE TRUE");
        push_book_filters(&mut select, query);
        select
            .push(" ORDER BY LOWER(title), id LIMIT ")
            .push_bind(page.per_page)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let books = select.build_query_as::<Book>().fetch_all(&self.pool).await?;

        Ok((books, total))
    }

    /// Create a new book; every copy starts on the shelf
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let copies = book.total_copies.unwrap_or(1);

        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (isbn, title, author, publisher, published_year, category,
                               total_copies, available_copies)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(book.isbn.trim())
        .bind(book.title.trim())
        .bind(book.author.trim())
        .bind(&book.publisher)
        .bind(book.published_year)
        .bind(&book.category)
        .bind(copies)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update a book. Changing `total_copies` shifts `available_copies` by the
    /// same amount; the table's check constraint rejects going below the
    /// number of copies currently lent out.
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                isbn = COALESCE($2, isbn),
                title = COALESCE($3, title),
                author = COALESCE($4, author),
                publisher = COALESCE($5, publisher),
                published_year = COALESCE($6, published_year),
                category = COALESCE($7, category),
                available_copies = available_copies + (COALESCE($8, total_copies) - total_copies),
                total_copies = COALESCE($8, total_copies),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(book.isbn.as_deref().map(str::trim))
        .bind(book.title.as_deref().map(str::trim))
        .bind(book.author.as_deref().map(str::trim))
        .bind(&book.publisher)
        .bind(book.published_year)
        .bind(&book.category)
        .bind(book.total_copies)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("No book found with id {}", id)))?;

        Ok(updated)
    }

    /// Delete a book
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("No book found with id {}", id)));
        }
        Ok(())
    }
}

fn push_book_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &BookQuery) {
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search.to_lowercase());
        builder
            .push(" AND (LOWER(title) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(author) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        builder
            .push(" AND LOWER(category) = LOWER(")
            .push_bind(category.to_string())
            .push(")");
    }
    if query.available == Some(true) {
        builder.push(" AND available_copies > 0");
    }
}
