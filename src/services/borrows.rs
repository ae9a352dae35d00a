//! Borrowing and returning books

use chrono::Utc;

use crate::{
    config::LibraryConfig,
    error::AppResult,
    models::borrow::{Borrow, BorrowDetails, BorrowQuery, CreateBorrow},
    repository::{borrows::BorrowRules, Repository},
};

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
    config: LibraryConfig,
}

impl BorrowsService {
    pub fn new(repository: Repository, config: LibraryConfig) -> Self {
        Self { repository, config }
    }

    pub async fn get_borrow(&self, id: i32) -> AppResult<BorrowDetails> {
        self.repository.borrows.get_details(id).await
    }

    pub async fn search_borrows(&self, query: &BorrowQuery) -> AppResult<(Vec<BorrowDetails>, i64)> {
        self.repository.borrows.search(None, query).await
    }

    pub async fn get_student_borrows(
        &self,
        student_id: i32,
        query: &BorrowQuery,
    ) -> AppResult<(Vec<BorrowDetails>, i64)> {
        self.repository.students.get_by_id(student_id).await?;
        self.repository.borrows.search(Some(student_id), query).await
    }

    pub async fn create_borrow(&self, borrow: CreateBorrow) -> AppResult<Borrow> {
        let rules = BorrowRules {
            loan_days: self.config.loan_days,
            max_active_borrows: self.config.max_active_borrows,
        };
        let created = self
            .repository
            .borrows
            .create(borrow.student_id, borrow.book_id, rules)
            .await?;
        tracing::info!(
            borrow_id = created.id,
            student_id = created.student_id,
            book_id = created.book_id,
            due_date = %created.due_date,
            "Book borrowed"
        );
        Ok(created)
    }

    /// Return a book; a late return charges a fine and notifies the student
    pub async fn return_borrow(&self, id: i32) -> AppResult<Borrow> {
        let returned = self
            .repository
            .borrows
            .return_borrow(id, Utc::now(), self.config.daily_fine)
            .await?;

        tracing::info!(
            borrow_id = returned.id,
            fine = %returned.fine_amount,
            "Book returned"
        );
        Ok(returned)
    }
}
