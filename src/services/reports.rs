//! Reporting service

use crate::{
    error::AppResult,
    models::{borrow::BorrowDetails, report::SummaryReport},
    repository::Repository,
};

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
}

impl ReportsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn summary(&self) -> AppResult<SummaryReport> {
        self.repository.reports.summary().await
    }

    pub async fn overdue(&self) -> AppResult<Vec<BorrowDetails>> {
        self.repository.borrows.overdue().await
    }
}
