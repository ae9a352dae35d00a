//! Student accounts and profiles

use rand::Rng;

use crate::{
    error::{AppError, AppResult},
    models::student::{CreateStudent, Student, StudentQuery, StudentShort, UpdateStudent},
    repository::Repository,
    services::auth::hash_password,
};

const STUDENT_NUMBER_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct StudentsService {
    repository: Repository,
}

impl StudentsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_student(&self, id: i32) -> AppResult<Student> {
        self.repository.students.get_by_id(id).await
    }

    pub async fn search_students(&self, query: &StudentQuery) -> AppResult<(Vec<StudentShort>, i64)> {
        self.repository.students.search(query).await
    }

    /// Create the account and profile; a student number is generated when absent
    pub async fn create_student(&self, student: CreateStudent) -> AppResult<Student> {
        let student_number = match student.student_number.as_deref().map(str::trim) {
            Some(number) if !number.is_empty() => number.to_string(),
            _ => self.generate_student_number().await?,
        };
        let hash = hash_password(&student.password)?;

        let created = self
            .repository
            .students
            .create(&student, &hash, &student_number)
            .await?;
        tracing::info!(student_id = created.id, student_number = %created.student_number, "Student created");
        Ok(created)
    }

    pub async fn update_student(&self, id: i32, student: UpdateStudent) -> AppResult<Student> {
        let hash = student.password.as_deref().map(hash_password).transpose()?;
        self.repository
            .students
            .update(id, &student, hash.as_deref())
            .await
    }

    pub async fn delete_student(&self, id: i32) -> AppResult<()> {
        self.repository.students.delete(id).await?;
        tracing::info!(student_id = id, "Student deleted");
        Ok(())
    }

    async fn generate_student_number(&self) -> AppResult<String> {
        for _ in 0..STUDENT_NUMBER_ATTEMPTS {
            let candidate = random_student_number();
            if !self.repository.students.student_number_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(AppError::internal("Could not allocate a free student number"))
    }
}

/// `STU-` followed by six digits
fn random_student_number() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("STU-{:06}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_numbers_have_fixed_shape() {
        for _ in 0..50 {
            let number = random_student_number();
            assert_eq!(number.len(), 10);
            assert!(number.starts_with("STU-"));
            assert!(number[4..].chars().all(|c| c.is_ascii_digit()));
        }
    }
}
