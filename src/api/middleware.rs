//! Request-level middleware: credential verification and error normalization
//!
//! `authenticate` and `optional_authenticate` attach an [`Identity`] to the
//! request extensions. `normalize_errors` is the single terminal layer that
//! turns every failed response into the JSON error shape for the run mode.

use std::{any::Any, sync::Arc};

use axum::{
    body::to_bytes,
    extract::{OriginalUri, Request, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{
    config::{AppConfig, AuthConfig, RunMode},
    error::{AppError, AppResult, ErrorKind, ErrorReport},
    models::user::{Identity, Role, UserClaims},
    permissions::{PermissionTable, PermissionTableError},
};

/// Upper bound when reading a body produced by a non-`AppError` rejection
const FOREIGN_BODY_LIMIT: usize = 64 * 1024;

/// Development-only token that maps to a synthetic library owner
#[derive(Debug, Clone)]
pub struct DevBypass {
    token: String,
    identity: Identity,
}

impl DevBypass {
    /// Decide once, at startup, whether the bypass is active.
    /// Never active in production, whatever the configuration says.
    pub fn resolve(run_mode: RunMode, auth: &AuthConfig) -> Option<Self> {
        if !auth.dev_bypass_enabled {
            return None;
        }
        if run_mode.is_production() {
            tracing::warn!("auth.dev_bypass_enabled is set in production; development bypass disabled");
            return None;
        }
        let token = auth.dev_bypass_token.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let Some(token) = token else {
            tracing::warn!("auth.dev_bypass_enabled is set without auth.dev_bypass_token; bypass disabled");
            return None;
        };

        tracing::warn!(run_mode = run_mode.as_str(), "Development credential bypass is active");
        Some(Self {
            token: token.to_string(),
            identity: Identity {
                id: "dev".to_string(),
                email: "dev@localhost".to_string(),
                role: Role::LibraryOwner,
            },
        })
    }
}

struct AuthInner {
    jwt_secret: String,
    dev_bypass: Option<DevBypass>,
}

/// Read-only authentication context shared by every request
#[derive(Clone)]
pub struct AuthState {
    inner: Arc<AuthInner>,
    permissions: Arc<PermissionTable>,
}

impl AuthState {
    pub fn new(
        jwt_secret: impl Into<String>,
        permissions: PermissionTable,
        dev_bypass: Option<DevBypass>,
    ) -> Self {
        Self {
            inner: Arc::new(AuthInner {
                jwt_secret: jwt_secret.into(),
                dev_bypass,
            }),
            permissions: Arc::new(permissions),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, PermissionTableError> {
        Ok(Self::new(
            config.auth.jwt_secret.clone(),
            PermissionTable::standard()?,
            DevBypass::resolve(config.run_mode, &config.auth),
        ))
    }

    pub fn permissions(&self) -> &Arc<PermissionTable> {
        &self.permissions
    }

    /// Verify signature and expiry and canonicalize the role claim
    pub fn verify(&self, token: &str) -> AppResult<Identity> {
        UserClaims::from_token(token, &self.inner.jwt_secret).map(UserClaims::into_identity)
    }

    fn dev_identity(&self, token: &str) -> Option<Identity> {
        self.inner
            .dev_bypass
            .as_ref()
            .filter(|bypass| bypass.token == token)
            .map(|bypass| bypass.identity.clone())
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
        .filter(|token| !token.is_empty())
}

/// Require a valid bearer credential
pub async fn authenticate(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or_else(AppError::missing_credential)?;
    let identity = auth.verify(&token)?;

    tracing::debug!(user_id = %identity.id, role = %identity.role, "Authenticated request");
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Attach an identity when a valid credential is present; never rejects.
/// The development bypass token is honoured here only.
pub async fn optional_authenticate(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = bearer_token(request.headers()).and_then(|token| {
        auth.dev_identity(&token).or_else(|| match auth.verify(&token) {
            Ok(identity) => Some(identity),
            Err(err) => {
                tracing::debug!(kind = ?err.kind(), "Ignoring unusable credential on optional route");
                None
            }
        })
    });

    if let Some(identity) = identity {
        request.extensions_mut().insert(identity);
    }

    next.run(request).await
}

/// Terminal error layer: every failed response leaves through here
pub async fn normalize_errors(
    State(run_mode): State<RunMode>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    if let Some(ErrorReport(err)) = response.extensions().get::<ErrorReport>().cloned() {
        log_failure(&err, &method, &uri);
        return err.render(run_mode);
    }

    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    if status == StatusCode::METHOD_NOT_ALLOWED {
        let err = not_found_for(&uri);
        log_failure(&err, &method, &uri);
        return err.render(run_mode);
    }

    // Produced outside of AppError (extractor rejections)
    let body = to_bytes(response.into_body(), FOREIGN_BODY_LIMIT).await.ok();
    let message = body
        .and_then(|bytes| String::from_utf8(bytes.to_vec()).ok())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

    let err = AppError::new(ErrorKind::from_status(status), message);
    log_failure(&err, &method, &uri);
    err.render(run_mode)
}

fn log_failure(err: &AppError, method: &Method, uri: &Uri) {
    if err.is_operational() {
        tracing::info!(
            %method,
            path = uri.path(),
            kind = ?err.kind(),
            status = err.status_code().as_u16(),
            error = err.message(),
            "Request failed"
        );
    } else {
        tracing::error!(
            %method,
            path = uri.path(),
            stack = ?err.stack(),
            "Unexpected error while handling request"
        );
    }
}

/// Turn a handler panic into a normalized internal error
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    AppError::internal(format!("Handler panicked: {}", detail)).into_response()
}

/// Fallback for unmatched routes
pub async fn route_not_found(OriginalUri(uri): OriginalUri) -> AppError {
    not_found_for(&uri)
}

fn not_found_for(uri: &Uri) -> AppError {
    AppError::not_found(format!("Can't find {} on this server!", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_config(enabled: bool, token: Option<&str>) -> AuthConfig {
        AuthConfig {
            dev_bypass_enabled: enabled,
            dev_bypass_token: token.map(str::to_string),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn bypass_is_never_active_in_production() {
        let config = auth_config(true, Some("dev-token"));
        assert!(DevBypass::resolve(RunMode::Production, &config).is_none());
        assert!(DevBypass::resolve(RunMode::Development, &config).is_some());
    }

    #[test]
    fn bypass_needs_flag_and_token() {
        assert!(DevBypass::resolve(RunMode::Development, &auth_config(false, Some("dev-token"))).is_none());
        assert!(DevBypass::resolve(RunMode::Development, &auth_config(true, None)).is_none());
        assert!(DevBypass::resolve(RunMode::Development, &auth_config(true, Some("  "))).is_none());
    }

    #[test]
    fn dev_identity_matches_only_the_configured_token() {
        let bypass = DevBypass::resolve(RunMode::Development, &auth_config(true, Some("dev-token")));
        let auth = AuthState::new("secret", PermissionTable::standard().unwrap(), bypass);

        let identity = auth.dev_identity("dev-token").unwrap();
        assert_eq!(identity.role, Role::LibraryOwner);
        assert!(auth.dev_identity("other").is_none());
    }

    #[test]
    fn bearer_token_requires_bearer_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Basic dXNlcjpwYXNz".parse().unwrap());
        assert!(bearer_token(&headers).is_none());

        headers.insert("authorization", "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));
    }
}
