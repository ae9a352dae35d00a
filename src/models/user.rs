//! User accounts, roles and token claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppResult;

/// Canonical role derived from a free-form role claim.
///
/// Canonicalization is case-insensitive: anything mentioning "admin" or
/// "owner" is a [`Role::LibraryOwner`], anything mentioning "student" is a
/// [`Role::Student`]. Other values are kept verbatim and hold no permissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum Role {
    LibraryOwner,
    Student,
    Unrecognized(String),
}

impl Role {
    pub fn canonicalize(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        if lowered.contains("admin") || lowered.contains("owner") {
            Role::LibraryOwner
        } else if lowered.contains("student") {
            Role::Student
        } else {
            Role::Unrecognized(raw.trim().to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::LibraryOwner => "LIBRARY_OWNER",
            Role::Student => "STUDENT",
            Role::Unrecognized(raw) => raw.as_str(),
        }
    }

    pub fn is_library_owner(&self) -> bool {
        *self == Role::LibraryOwner
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Role::canonicalize(s))
    }
}

/// Account row from the `users` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::canonicalize(&self.role)
    }
}

/// Authenticated caller attached to the request by the authentication layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Identity {
    /// Subject id, as carried in the token
    pub id: String,
    pub email: String,
    #[schema(value_type = String, example = "LIBRARY_OWNER")]
    pub role: Role,
}

impl Identity {
    /// Numeric account id, when the subject is a database user
    pub fn user_id(&self) -> Option<i32> {
        self.id.parse().ok()
    }

    pub fn is_library_owner(&self) -> bool {
        self.role.is_library_owner()
    }

    /// Owners may act on anything, everyone else only on their own id
    pub fn can_access(&self, owner_id: &str) -> bool {
        self.is_library_owner() || self.id == owner_id
    }
}

/// JWT claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    /// Free-form role as issued; canonicalized on every request
    pub role: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn for_user(user: &User, lifetime_hours: u64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user.id.to_string(),
            role: user.role().to_string(),
            email: user.email.clone(),
            exp: now + lifetime_hours as i64 * 3600,
            iat: now,
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Verify signature and expiry, then decode.
    ///
    /// Expired tokens surface as `ExpiredCredential`, anything else that
    /// fails verification as `MalformedCredential`.
    pub fn from_token(token: &str, secret: &str) -> AppResult<Self> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let mut validation = Validation::default();
        validation.leeway = 0;
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )?;
        Ok(token_data.claims)
    }

    pub fn into_identity(self) -> Identity {
        Identity {
            role: Role::canonicalize(&self.role),
            id: self.sub,
            email: self.email,
        }
    }
}

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Please provide a password"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: User,
}
