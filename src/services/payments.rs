//! Fine payments and balances

use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::payment::{CreatePayment, Payment, PaymentQuery, StudentBalance},
    repository::Repository,
};

#[derive(Clone)]
pub struct PaymentsService {
    repository: Repository,
}

impl PaymentsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn search_payments(&self, query: &PaymentQuery) -> AppResult<(Vec<Payment>, i64)> {
        self.repository.payments.search(None, query).await
    }

    pub async fn create_payment(&self, mut payment: CreatePayment) -> AppResult<Payment> {
        self.repository.students.get_by_id(payment.student_id).await?;

        if let Some(borrow_id) = payment.borrow_id {
            let borrow = self.repository.borrows.get_details(borrow_id).await?;
            if borrow.student_id != payment.student_id {
                return Err(AppError::validation(
                    "The borrow does not belong to this student",
                ));
            }
        }

        payment.method = payment.method.to_lowercase();
        let created = self.repository.payments.create(&payment).await?;
        tracing::info!(
            payment_id = created.id,
            student_id = created.student_id,
            amount = %created.amount,
            "Payment recorded"
        );
        Ok(created)
    }

    /// Fines, payments and what is still owed
    pub async fn student_balance(&self, student_id: i32) -> AppResult<StudentBalance> {
        self.repository.students.get_by_id(student_id).await?;
        let (total_fines, total_paid) = self.repository.payments.totals_for_student(student_id).await?;
        let payments = self.repository.payments.list_by_student(student_id).await?;

        Ok(StudentBalance {
            student_id,
            total_fines,
            total_paid,
            outstanding: outstanding(total_fines, total_paid),
            payments,
        })
    }
}

/// Overpayment is not carried as credit
fn outstanding(fines: Decimal, paid: Decimal) -> Decimal {
    (fines - paid).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outstanding_never_goes_negative() {
        assert_eq!(outstanding(Decimal::new(300, 2), Decimal::new(100, 2)), Decimal::new(200, 2));
        assert_eq!(outstanding(Decimal::new(100, 2), Decimal::new(300, 2)), Decimal::ZERO);
    }
}
