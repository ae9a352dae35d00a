//! Notifications repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::notification::Notification,
};

const NOTIFICATION_COLUMNS: &str = "id, student_id, title, message, is_read, created_at";

#[derive(Clone)]
pub struct NotificationsRepository {
    pool: Pool<Postgres>,
}

impl NotificationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Create a notification; `student_id = None` broadcasts to every student
    pub async fn create(
        &self,
        student_id: Option<i32>,
        title: &str,
        message: &str,
    ) -> AppResult<Notification> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (student_id, title, message)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(student_id)
        .bind(title)
        .bind(message)
        .fetch_one(&self.pool)
        .await?;
        Ok(notification)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {} FROM notifications WHERE id = $1",
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("No notification found with id {}", id)))
    }

    /// Notifications addressed to a student, broadcasts included
    pub async fn list_for_student(&self, student_id: i32, unread_only: bool) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {} FROM notifications
            WHERE (student_id = $1 OR student_id IS NULL)
              AND ($2 = FALSE OR is_read = FALSE)
            ORDER BY created_at DESC, id DESC
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(student_id)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    /// Every notification, most recent first
    pub async fn list_all(&self, unread_only: bool) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {} FROM notifications
            WHERE ($1 = FALSE OR is_read = FALSE)
            ORDER BY created_at DESC, id DESC
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    pub async fn mark_read(&self, id: i32) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("No notification found with id {}", id)))
    }
}
