//! Request-scoped caller identity.
//!
//! Every handler that needs a caller takes a [`Principal`] argument. The extractor
//! reads the token from `Authorization: Bearer` (or the `session` cookie) and asks
//! the [`Sessions`] handle installed as a request extension to verify it.

mod jwt;

pub use jwt::{Claims, JwtSessionVerifier, SessionIssuer};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::error_response;

/// Identifier wrapper for marketplace users (owners, students, staff).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Executive,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Executive => "executive",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            "executive" => Some(Role::Executive),
            _ => None,
        }
    }
}

/// Verified caller attached to a single request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
    pub name: String,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role, name: impl Into<String>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            role,
            name: name.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins and field executives may record verification visits.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Executive)
    }

    pub fn owns(&self, owner: &UserId) -> bool {
        &self.user_id == owner
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("authentication required")]
    MissingCredentials,
    #[error("session token expired")]
    Expired,
    #[error("invalid session token: {0}")]
    Invalid(String),
    #[error("unable to issue session token: {0}")]
    Issue(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        error_response(StatusCode::UNAUTHORIZED, "unauthenticated", Some(self.to_string()))
    }
}

/// Pluggable session verification so tests and alternative identity providers
/// can replace the JWT implementation.
pub trait SessionVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Principal, AuthError>;
}

/// Cloneable handle installed as a request extension.
#[derive(Clone)]
pub struct Sessions(Arc<dyn SessionVerifier>);

impl Sessions {
    pub fn new<V: SessionVerifier + 'static>(verifier: V) -> Self {
        Self(Arc::new(verifier))
    }

    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        self.0.verify(token)
    }
}

/// Fixed token table, used by the demo runner and router tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSessionVerifier {
    tokens: BTreeMap<String, Principal>,
}

impl StaticSessionVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.tokens.insert(token.into(), principal);
        self
    }
}

impl SessionVerifier for StaticSessionVerifier {
    fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::Invalid("unknown token".to_string()))
    }
}

impl fmt::Debug for Sessions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sessions").finish_non_exhaustive()
    }
}

pub(crate) fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == "session" && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let sessions = parts.extensions.get::<Sessions>().cloned().ok_or_else(|| {
            tracing::error!("session verifier extension missing from router");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "session verification unavailable",
                None,
            )
        })?;

        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| AuthError::MissingCredentials.into_response())?;

        sessions.verify(&token).map_err(IntoResponse::into_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("session=xyz"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn session_cookie_is_used_without_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=xyz; lang=en"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn missing_credentials_yield_none() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(token_from_headers(&headers).is_none());
    }

    #[test]
    fn staff_covers_admin_and_executive() {
        assert!(Principal::new("a", Role::Admin, "A").is_staff());
        assert!(Principal::new("e", Role::Executive, "E").is_staff());
        assert!(!Principal::new("u", Role::User, "U").is_staff());
        assert!(!Principal::new("e", Role::Executive, "E").is_admin());
    }
}
