//! Notifications sent by the library to students

use crate::{
    error::{AppError, AppResult},
    models::{
        notification::{CreateNotification, Notification},
        user::Identity,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct NotificationsService {
    repository: Repository,
}

impl NotificationsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Send to one student, or to everyone when no student is given
    pub async fn send(&self, notification: CreateNotification) -> AppResult<Notification> {
        if let Some(student_id) = notification.student_id {
            self.repository.students.get_by_id(student_id).await?;
        }
        let created = self
            .repository
            .notifications
            .create(
                notification.student_id,
                notification.title.trim(),
                notification.message.trim(),
            )
            .await?;
        tracing::info!(
            notification_id = created.id,
            student_id = ?created.student_id,
            "Notification sent"
        );
        Ok(created)
    }

    pub async fn list_all(&self, unread_only: bool) -> AppResult<Vec<Notification>> {
        self.repository.notifications.list_all(unread_only).await
    }

    pub async fn list_for_student(&self, student_id: i32, unread_only: bool) -> AppResult<Vec<Notification>> {
        self.repository.students.get_by_id(student_id).await?;
        self.repository
            .notifications
            .list_for_student(student_id, unread_only)
            .await
    }

    /// Only the recipient or a library owner may mark a notification read.
    /// Broadcasts are shared, so only owners can mark them.
    pub async fn mark_read(&self, identity: &Identity, id: i32) -> AppResult<Notification> {
        let notification = self.repository.notifications.get_by_id(id).await?;
        if !may_mark_read(identity, &notification) {
            tracing::info!(
                user_id = %identity.id,
                notification_id = id,
                "Access denied: not the notification recipient"
            );
            return Err(AppError::forbidden());
        }
        self.repository.notifications.mark_read(id).await
    }
}

fn may_mark_read(identity: &Identity, notification: &Notification) -> bool {
    if identity.is_library_owner() {
        return true;
    }
    match (notification.student_id, identity.user_id()) {
        (Some(recipient), Some(user_id)) => recipient == user_id,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use chrono::Utc;

    fn identity(id: &str, role: Role) -> Identity {
        Identity {
            id: id.to_string(),
            email: "someone@example.org".to_string(),
            role,
        }
    }

    fn notification(student_id: Option<i32>) -> Notification {
        Notification {
            id: 1,
            student_id,
            title: "Due soon".to_string(),
            message: "Your book is due tomorrow".to_string(),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn recipient_and_owner_may_mark_read() {
        assert!(may_mark_read(&identity("42", Role::Student), &notification(Some(42))));
        assert!(may_mark_read(&identity("1", Role::LibraryOwner), &notification(Some(42))));
    }

    #[test]
    fn others_may_not_mark_read() {
        assert!(!may_mark_read(&identity("7", Role::Student), &notification(Some(42))));
        assert!(!may_mark_read(&identity("42", Role::Student), &notification(None)));
        assert!(!may_mark_read(&identity("dev", Role::Student), &notification(Some(42))));
    }
}
