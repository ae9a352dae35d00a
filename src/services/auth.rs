//! Authentication: login, password hashing and the bootstrap owner

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{LoginResponse, User, UserClaims},
    repository::Repository,
};

const INVALID_LOGIN_MESSAGE: &str = "Incorrect email or password";

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Check credentials and issue a token
    pub async fn login(&self, email: &str, password: &str) -> AppResult<LoginResponse> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::unauthenticated(INVALID_LOGIN_MESSAGE))?;

        if !verify_password(&user, password)? {
            tracing::info!(user_id = user.id, "Rejected login: wrong password");
            return Err(AppError::unauthenticated(INVALID_LOGIN_MESSAGE));
        }

        let token = self.create_token_for_user(&user)?;
        tracing::info!(user_id = user.id, role = %user.role(), "User logged in");

        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.jwt_expiration_hours * 3600,
            user,
        })
    }

    pub fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        UserClaims::for_user(user, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::internal("Failed to create token").with_source(e))
    }

    /// Get the account behind an authenticated subject
    pub async fn get_user(&self, user_id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(user_id).await
    }

    /// Create the configured first owner unless an owner already exists.
    /// Returns whether an account was created.
    pub async fn ensure_bootstrap_owner(&self) -> AppResult<bool> {
        let Some(owner) = &self.config.bootstrap_owner else {
            return Ok(false);
        };
        if self.repository.users.owner_exists().await? {
            tracing::debug!("Library owner already present; bootstrap skipped");
            return Ok(false);
        }

        let hash = hash_password(&owner.password)?;
        let user = self
            .repository
            .users
            .create_owner(owner.email.trim(), &hash, owner.full_name.trim())
            .await?;
        tracing::info!(user_id = user.id, email = %user.email, "Created bootstrap library owner");
        Ok(true)
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::internal("Invalid password hash"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user_with_password(password: &str) -> User {
        User {
            id: 1,
            email: "owner@example.org".to_string(),
            password_hash: hash_password(password).unwrap(),
            full_name: "Owner".to_string(),
            role: "LIBRARY_OWNER".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_round_trip() {
        let user = user_with_password("correct horse");
        assert!(verify_password(&user, "correct horse").unwrap());
        assert!(!verify_password(&user, "battery staple").unwrap());
    }

    #[test]
    fn corrupt_hash_is_an_internal_error() {
        let mut user = user_with_password("whatever");
        user.password_hash = "not-a-hash".to_string();
        let err = verify_password(&user, "whatever").unwrap_err();
        assert!(!err.is_operational());
    }
}
