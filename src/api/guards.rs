//! Route-level authorization gates.
//!
//! Each gate is a [`tower::Layer`] applied with `route_layer` after the
//! authentication middleware has attached an [`Identity`]:
//!
//! ```ignore
//! Router::new()
//!     .route("/books", post(books::create_book).route_layer(require_permission(&perms, WRITE_BOOKS)))
//!     .route("/students/:id", get(students::get_student).route_layer(check_ownership("id")))
//!     .route_layer(from_fn_with_state(auth, authenticate));
//! ```
//!
//! Requests without an identity are rejected with 401, identities lacking the
//! role, permission or ownership with 403. Decisions are logged with the user
//! id, never the credential.

use std::{
    sync::Arc,
    task::{Context, Poll},
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::{FromRequestParts, RawPathParams, Request},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use serde_json::Value;
use tower::{Layer, Service};

use crate::{
    error::AppError,
    models::user::{Identity, Role},
    permissions::PermissionTable,
};

/// Largest body buffered while looking for an ownership field
const OWNERSHIP_BODY_LIMIT: usize = 1024 * 1024;

/// A single authorization check. Returns the request (possibly rebuilt)
/// when access is granted.
#[async_trait]
pub trait Guard: Clone + Send + Sync + 'static {
    async fn check(&self, request: Request) -> Result<Request, AppError>;
}

/// Layer wrapping routes with a [`Guard`]
#[derive(Clone)]
pub struct GuardLayer<G> {
    guard: G,
}

impl<G> GuardLayer<G> {
    pub fn new(guard: G) -> Self {
        Self { guard }
    }
}

impl<S, G: Clone> Layer<S> for GuardLayer<G> {
    type Service = GuardService<S, G>;

    fn layer(&self, inner: S) -> Self::Service {
        GuardService {
            inner,
            guard: self.guard.clone(),
        }
    }
}

/// Service wrapper for [`GuardLayer`]
#[derive(Clone)]
pub struct GuardService<S, G> {
    inner: S,
    guard: G,
}

impl<S, G> Service<Request> for GuardService<S, G>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    G: Guard,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let guard = self.guard.clone();
        // The clone is not necessarily ready; keep the one that was polled
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match guard.check(request).await {
                Ok(request) => inner.call(request).await,
                Err(err) => Ok(err.into_response()),
            }
        })
    }
}

fn identity_of(request: &Request) -> Result<&Identity, AppError> {
    request
        .extensions()
        .get::<Identity>()
        .ok_or_else(AppError::missing_credential)
}

/// Admit only identities whose canonical role is in the allowed set
#[derive(Clone)]
pub struct RoleGuard {
    allowed: Arc<[Role]>,
}

#[async_trait]
impl Guard for RoleGuard {
    async fn check(&self, request: Request) -> Result<Request, AppError> {
        let identity = identity_of(&request)?;
        if !self.allowed.contains(&identity.role) {
            tracing::info!(
                user_id = %identity.id,
                role = %identity.role,
                "Access denied: role not allowed"
            );
            return Err(AppError::forbidden());
        }
        Ok(request)
    }
}

pub fn authorize(allowed: &[Role]) -> GuardLayer<RoleGuard> {
    GuardLayer::new(RoleGuard {
        allowed: allowed.into(),
    })
}

/// Admit identities whose role grants a permission string
#[derive(Clone)]
pub struct PermissionGuard {
    permissions: Arc<PermissionTable>,
    permission: &'static str,
}

#[async_trait]
impl Guard for PermissionGuard {
    async fn check(&self, request: Request) -> Result<Request, AppError> {
        let identity = identity_of(&request)?;
        if !self.permissions.allows(&identity.role, self.permission) {
            tracing::info!(
                user_id = %identity.id,
                role = %identity.role,
                permission = self.permission,
                "Access denied: missing permission"
            );
            return Err(AppError::forbidden());
        }
        Ok(request)
    }
}

pub fn require_permission(
    permissions: &Arc<PermissionTable>,
    permission: &'static str,
) -> GuardLayer<PermissionGuard> {
    GuardLayer::new(PermissionGuard {
        permissions: Arc::clone(permissions),
        permission,
    })
}

/// Library owners pass; anyone else must be the owner of the addressed
/// resource, identified by a route parameter or, failing that, a field of
/// the JSON body.
#[derive(Clone)]
pub struct OwnershipGuard {
    field: &'static str,
}

#[async_trait]
impl Guard for OwnershipGuard {
    async fn check(&self, request: Request) -> Result<Request, AppError> {
        let identity = identity_of(&request)?.clone();
        if identity.is_library_owner() {
            return Ok(request);
        }

        let (mut parts, body) = request.into_parts();

        let from_path = RawPathParams::from_request_parts(&mut parts, &())
            .await
            .ok()
            .and_then(|params| {
                params
                    .iter()
                    .find(|(key, _)| *key == self.field)
                    .map(|(_, value)| value.to_string())
            });

        let (body, resource_id) = match from_path {
            Some(id) => (body, Some(id)),
            None => {
                let bytes = to_bytes(body, OWNERSHIP_BODY_LIMIT)
                    .await
                    .map_err(|_| AppError::validation("Request body could not be read"))?;
                let id = body_field(&bytes, self.field);
                (Body::from(bytes), id)
            }
        };

        if resource_id.as_deref() != Some(identity.id.as_str()) {
            tracing::info!(
                user_id = %identity.id,
                field = self.field,
                resource_id = ?resource_id,
                "Access denied: not the resource owner"
            );
            return Err(AppError::forbidden());
        }

        Ok(Request::from_parts(parts, body))
    }
}

pub fn check_ownership(resource_field: &'static str) -> GuardLayer<OwnershipGuard> {
    GuardLayer::new(OwnershipGuard {
        field: resource_field,
    })
}

fn body_field(bytes: &[u8], field: &str) -> Option<String> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    match value.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_field_reads_strings_and_numbers() {
        assert_eq!(body_field(br#"{"student_id": 42}"#, "student_id").as_deref(), Some("42"));
        assert_eq!(body_field(br#"{"student_id": "42"}"#, "student_id").as_deref(), Some("42"));
        assert_eq!(body_field(br#"{"student_id": null}"#, "student_id"), None);
        assert_eq!(body_field(b"not json", "student_id"), None);
    }
}
