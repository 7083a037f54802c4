//! Player identity and admin console authentication

pub mod identity;
pub mod password;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request, Response, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use base64::Engine;
use std::sync::Arc;

pub use identity::{IdentityProvider, LocalIdentity, SignedIn};
pub use password::{validate_password, PasswordRejection};

use crate::error::ApiError;
use crate::state::AppState;
use crate::types::Principal;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("Name must be at least 3 characters long.")]
    InvalidName,

    #[error("Please enter a valid email address.")]
    InvalidEmail,

    #[error("{0}")]
    WeakPassword(#[from] PasswordRejection),

    #[error("An account with this email already exists.")]
    EmailInUse,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Missing or invalid bearer token")]
    Unauthorized,
}

/// Admin console credentials
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Username for the admin console (None = auth disabled)
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AuthConfig {
    /// ADMIN_USERNAME and ADMIN_PASSWORD must both be set to enable auth
    pub fn from_env() -> Self {
        let username = std::env::var("ADMIN_USERNAME")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let password = std::env::var("ADMIN_PASSWORD")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if username.is_some() && password.is_some() {
            tracing::info!("Admin authentication enabled");
            Self { username, password }
        } else {
            if username.is_some() || password.is_some() {
                tracing::warn!(
                    "ADMIN_USERNAME and ADMIN_PASSWORD must both be set to enable authentication"
                );
            }
            tracing::warn!("Admin authentication DISABLED - anyone can access the admin API!");
            Self::disabled()
        }
    }

    pub fn disabled() -> Self {
        Self {
            username: None,
            password: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    pub fn validate(&self, username: &str, password: &str) -> bool {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => {
                constant_time_eq(u.as_bytes(), username.as_bytes())
                    && constant_time_eq(p.as_bytes(), password.as_bytes())
            }
            _ => true,
        }
    }
}

/// Constant-time byte comparison
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Extract `user:pass` from a `Basic` Authorization header
fn basic_credentials(request: &Request<Body>) -> Option<(String, String)> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Middleware for HTTP Basic Authentication on admin routes
pub async fn admin_auth_middleware(
    State(auth_config): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    if !auth_config.is_enabled() {
        return next.run(request).await;
    }

    if let Some((username, password)) = basic_credentials(&request) {
        if auth_config.validate(&username, &password) {
            return next.run(request).await;
        }
    }

    tracing::warn!(path = %request.uri().path(), "Rejected admin request");
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"FestQuest Admin\"")],
        "Unauthorized",
    )
        .into_response()
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The signed-in player behind a request's bearer token
#[derive(Debug, Clone)]
pub struct CurrentPrincipal {
    pub principal: Principal,
    pub token: String,
}

impl FromRequestParts<Arc<AppState>> for CurrentPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::Unauthorized)?;
        let principal = state
            .identity
            .principal_for_token(token)
            .await
            .ok_or(AuthError::Unauthorized)?;

        Ok(Self {
            principal,
            token: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(value: &str) -> Request<Body> {
        Request::builder()
            .uri("/api/admin/stats")
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_auth_config_disabled_when_incomplete() {
        let config = AuthConfig::disabled();
        assert!(!config.is_enabled());
        assert!(config.validate("any", "thing"));

        let config = AuthConfig {
            username: Some("user".to_string()),
            password: None,
        };
        assert!(!config.is_enabled());
    }

    #[test]
    fn test_auth_config_enabled() {
        let config = AuthConfig {
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
        };
        assert!(config.is_enabled());
        assert!(config.validate("admin", "secret"));
        assert!(!config.validate("admin", "wrong"));
        assert!(!config.validate("wrong", "secret"));
        assert!(!config.validate("", ""));
    }

    #[test]
    fn test_basic_credentials() {
        // "admin:secret"
        let req = basic("Basic YWRtaW46c2VjcmV0");
        assert_eq!(
            basic_credentials(&req),
            Some(("admin".to_string(), "secret".to_string()))
        );

        assert_eq!(basic_credentials(&basic("Basic !!!")), None);
        assert_eq!(basic_credentials(&basic("Bearer abc")), None);
    }

    #[test]
    fn test_bearer_token() {
        let (mut parts, _) = Request::builder()
            .header(header::AUTHORIZATION, "Bearer 01HTOKEN")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(bearer_token(&parts), Some("01HTOKEN"));

        parts.headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&parts), None);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(constant_time_eq(b"", b""));
    }
}
