//! Business logic services

pub mod auth;
pub mod books;
pub mod borrows;
pub mod notifications;
pub mod payments;
pub mod reports;
pub mod students;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub auth: auth::AuthService,
    pub books: books::BooksService,
    pub students: students::StudentsService,
    pub borrows: borrows::BorrowsService,
    pub payments: payments::PaymentsService,
    pub notifications: notifications::NotificationsService,
    pub reports: reports::ReportsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone()),
            books: books::BooksService::new(repository.clone()),
            students: students::StudentsService::new(repository.clone()),
            borrows: borrows::BorrowsService::new(repository.clone(), config.library.clone()),
            payments: payments::PaymentsService::new(repository.clone()),
            notifications: notifications::NotificationsService::new(repository.clone()),
            reports: reports::ReportsService::new(repository.clone()),
            repository,
        }
    }
}
