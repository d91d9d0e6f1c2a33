use super::{extract_bearer_token, AccessTokenIssuer, AuthResult, Claims};
use crate::{
    oauth::{GrantServer, TokenInfo},
    utils::ApiError,
};
use axum::{
    extract::{OriginalUri, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use std::sync::Arc;

/// Who a request was authenticated as, and by which scheme
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum Identity {
    Signed(Claims),
    Opaque(TokenInfo),
}

impl Identity {
    /// Id of the user the credential belongs to
    pub fn user_id(&self) -> &str {
        match self {
            Identity::Signed(claims) => &claims.sub,
            Identity::Opaque(info) => &info.user_id,
        }
    }
}

/// A bearer-token check run in front of a route group
pub trait Gate: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> AuthResult<Identity>;
}

/// Accepts tokens minted by `AccessTokenIssuer`
pub struct SignedTokenGate {
    issuer: Arc<AccessTokenIssuer>,
}

impl SignedTokenGate {
    pub fn new(issuer: Arc<AccessTokenIssuer>) -> Self {
        Self { issuer }
    }
}

impl Gate for SignedTokenGate {
    fn authenticate(&self, headers: &HeaderMap) -> AuthResult<Identity> {
        let token = extract_bearer_token(headers)?;
        self.issuer.verify(token).map(Identity::Signed)
    }
}

/// Accepts opaque tokens issued by the grant server
pub struct OpaqueTokenGate {
    server: Arc<GrantServer>,
}

impl OpaqueTokenGate {
    pub fn new(server: Arc<GrantServer>) -> Self {
        Self { server }
    }
}

impl Gate for OpaqueTokenGate {
    fn authenticate(&self, headers: &HeaderMap) -> AuthResult<Identity> {
        self.server.validate_bearer(headers).map(Identity::Opaque)
    }
}

/// Which gate, if any, a route group is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardPolicy {
    None,
    SignedTokenRequired,
    OpaqueTokenRequired,
}

/// Paths that pass through a gate unauthenticated.
///
/// Matching is on the path only (no query string), exact and ASCII
/// case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct SkipRule {
    paths: Vec<String>,
}

impl SkipRule {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.paths.iter().any(|skip| skip.eq_ignore_ascii_case(path))
    }
}

/// Gate plus skip rule for one route group
pub struct RouteGuard {
    name: &'static str,
    gate: Option<Arc<dyn Gate>>,
    skip: SkipRule,
}

impl RouteGuard {
    pub fn new(name: &'static str, gate: Option<Arc<dyn Gate>>, skip: SkipRule) -> Self {
        Self { name, gate, skip }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the gate for a request. `Ok(None)` means it was let through without
    /// authentication (open group or skipped path).
    pub fn check(&self, path: &str, headers: &HeaderMap) -> AuthResult<Option<Identity>> {
        let Some(gate) = &self.gate else {
            return Ok(None);
        };
        if self.skip.matches(path) {
            return Ok(None);
        }
        gate.authenticate(headers).map(Some)
    }
}

/// Gate middleware. On success the identity is attached to the request
/// extensions as `Identity`, plus the scheme-specific `Claims` or `TokenInfo`.
pub async fn guard_middleware(
    State(guard): State<Arc<RouteGuard>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Nested routers see a stripped URI; skip rules are written against the full path.
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    match guard.check(&path, request.headers()) {
        Ok(None) => Ok(next.run(request).await),
        Ok(Some(identity)) => {
            match &identity {
                Identity::Signed(claims) => {
                    request.extensions_mut().insert(claims.clone());
                }
                Identity::Opaque(info) => {
                    request.extensions_mut().insert(info.clone());
                }
            }
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(reason) => {
            tracing::debug!(group = guard.name(), %path, %reason, "Rejected request");
            Err(ApiError::invalid_authorization())
        }
    }
}
