//! Authentication core.
//!
//! Two independent bearer schemes share the `Authorization: Bearer <value>`
//! header:
//!
//! 1. **Signed access tokens** (`jwt`): HS256 JWTs minted by
//!    `POST /api/v1/users/token` and checked without any server-side state.
//! 2. **Opaque grant tokens** (`crate::oauth`): random values minted by the
//!    OAuth2 password grant and looked up in the in-memory token store.
//!
//! Which scheme applies is decided by the route group, see `gate` and
//! `crate::routes`.

pub mod credentials;
pub mod gate;
pub mod jwt;
pub mod password;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use thiserror::Error;

pub use credentials::Authenticator;
pub use gate::{
    guard_middleware, Gate, GuardPolicy, Identity, OpaqueTokenGate, RouteGuard, SignedTokenGate,
    SkipRule,
};
pub use jwt::{AccessTokenIssuer, Claims};
pub use password::CredentialVerifier;

/// Authentication failures.
///
/// The `Display` strings are for logs. Clients only ever see the generic
/// messages produced by the `ApiError`/`OAuthError` conversions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Wrong password or unknown username, never distinguished
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("client authentication failed")]
    InvalidClient,
    /// Missing header, wrong scheme or an unparseable token
    #[error("missing or malformed bearer token")]
    MalformedToken,
    #[error("token expired")]
    ExpiredToken,
    /// Bad signature, or an opaque value the store has never seen
    #[error("unknown token")]
    UnknownToken,
    #[error("signing misconfigured: {0}")]
    MisconfiguredSigning(String),
    #[error("user repository failure: {0}")]
    RepositoryFailure(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

const BEARER: &str = "bearer ";

/// Extract the bearer value from the `Authorization` header
pub fn extract_bearer_token(headers: &HeaderMap) -> AuthResult<&str> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MalformedToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedToken)?;

    if value.len() <= BEARER.len() || !value[..BEARER.len()].eq_ignore_ascii_case(BEARER) {
        return Err(AuthError::MalformedToken);
    }

    let token = value[BEARER.len()..].trim();
    if token.is_empty() {
        return Err(AuthError::MalformedToken);
    }
    Ok(token)
}
