//! Students repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::student::{CreateStudent, Student, StudentQuery, StudentShort, UpdateStudent},
};

use super::Page;

const STUDENT_SELECT: &str = r#"
    SELECT u.id, u.email, u.full_name, s.student_number, s.phone, s.address,
           s.is_active, s.joined_at, s.updated_at
    FROM students s
    JOIN users u ON u.id = s.id
"#;

#[derive(Clone)]
pub struct StudentsRepository {
    pool: Pool<Postgres>,
}

impl StudentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get student by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Student> {
        sqlx::query_as::<_, Student>(&format!("{} WHERE s.id = $1", STUDENT_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No student found with id {}", id)))
    }

    /// Search students with pagination
    pub async fn search(&self, query: &StudentQuery) -> AppResult<(Vec<StudentShort>, i64)> {
        let page = Page::new(query.page, query.per_page);

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM students s JOIN users u ON u.id = s.id WHERE TRUE",
        );
        push_student_filters(&mut count, query);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(
            r#"
            SELECT s.id, u.full_name, s.student_number, s.is_active,
                   (SELECT COUNT(*) FROM borrows b
                    WHERE b.student_id = s.id AND b.returned_at IS NULL) AS active_borrows
            FROM students s
            JOIN users u ON u.id = s.id
            WHERE TRUE
            "#,
        );
        push_student_filters(&mut select, query);
        select
            .push(" ORDER BY LOWER(u.full_name), s.id LIMIT ")
            .push_bind(page.per_page)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let students = select
            .build_query_as::<StudentShort>()
            .fetch_all(&self.pool)
            .await?;

        Ok((students, total))
    }

    /// Create the account and the profile in one transaction
    pub async fn create(
        &self,
        student: &CreateStudent,
        password_hash: &str,
        student_number: &str,
    ) -> AppResult<Student> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO users (email, password_hash, full_name, role)
            VALUES ($1, $2, $3, 'STUDENT')
            RETURNING id
            "#,
        )
        .bind(student.email.trim())
        .bind(password_hash)
        .bind(student.full_name.trim())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO students (id, student_number, phone, address)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(student_number)
        .bind(&student.phone)
        .bind(&student.address)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Update account and profile fields that are present
    pub async fn update(
        &self,
        id: i32,
        student: &UpdateStudent,
        password_hash: Option<&str>,
    ) -> AppResult<Student> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE students SET
                phone = COALESCE($2, phone),
                address = COALESCE($3, address),
                is_active = COALESCE($4, is_active),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&student.phone)
        .bind(&student.address)
        .bind(student.is_active)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::not_found(format!("No student found with id {}", id)));
        }

        sqlx::query(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                full_name = COALESCE($3, full_name),
                password_hash = COALESCE($4, password_hash)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(student.email.as_deref().map(str::trim))
        .bind(student.full_name.as_deref().map(str::trim))
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Delete the account (the profile cascades)
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM users WHERE id = $1 AND EXISTS (SELECT 1 FROM students WHERE id = $1)",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("No student found with id {}", id)));
        }
        Ok(())
    }

    /// Whether a student number is already taken
    pub async fn student_number_exists(&self, student_number: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM students WHERE student_number = $1)")
                .bind(student_number)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

fn push_student_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &StudentQuery) {
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search.to_lowercase());
        builder
            .push(" AND (LOWER(u.full_name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(u.email) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(s.student_number) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(active) = query.active {
        builder.push(" AND s.is_active = ").push_bind(active);
    }
}
