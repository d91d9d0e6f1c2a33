use super::{
    clients::{Client, ClientStore},
    store::{OpaqueToken, TokenInfo, TokenStore},
};
use crate::{
    auth::{extract_bearer_token, jwt::MAX_VALIDITY_SECS, AuthError, AuthResult, Authenticator},
    utils::config::OAuthConfig,
};
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// OAuth2 authorization server for the password grant.
///
/// Owns the client registry and the opaque token store. Tokens are only ever
/// created by `password_grant` and only ever removed by expiry or `revoke`.
pub struct GrantServer {
    authenticator: Arc<Authenticator>,
    clients: ClientStore,
    tokens: Arc<TokenStore>,
    validity: Duration,
}

impl GrantServer {
    pub fn new(config: &OAuthConfig, authenticator: Arc<Authenticator>) -> AuthResult<Self> {
        if config.token_validity_secs > MAX_VALIDITY_SECS {
            return Err(AuthError::Internal(format!(
                "OAuth token validity may not exceed {MAX_VALIDITY_SECS} seconds"
            )));
        }
        let validity = i64::try_from(config.token_validity_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds)
            .ok_or_else(|| AuthError::Internal("invalid OAuth token validity".to_string()))?;

        Ok(Self {
            authenticator,
            clients: ClientStore::new(&config.clients),
            tokens: Arc::new(TokenStore::new()),
            validity,
        })
    }

    /// Exchange username and password for an opaque access token.
    ///
    /// Unknown usernames and wrong passwords both fail with
    /// `InvalidCredentials`.
    pub async fn password_grant(
        &self,
        username: &str,
        password: &str,
        client: Option<&Client>,
    ) -> AuthResult<OpaqueToken> {
        let user = match self.authenticator.authenticate(username, password).await {
            Ok(user) => user,
            Err(err) => {
                tracing::info!(client_id = client.map(|c| c.id.as_str()), %err, "Password grant rejected");
                return Err(err);
            }
        };

        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.validity)
            .ok_or_else(|| AuthError::Internal("token expiry out of range".to_string()))?;
        let token = self.tokens.insert(TokenInfo {
            user_id: user.id,
            client_id: client.map(|c| c.id.clone()),
            issued_at: now,
            expires_at,
        });

        tracing::info!(
            user_id = %token.info.user_id,
            client_id = token.info.client_id.as_deref(),
            "Issued OAuth access token"
        );
        Ok(token)
    }

    /// Validate the bearer token on an inbound request
    pub fn validate_bearer(&self, headers: &HeaderMap) -> AuthResult<TokenInfo> {
        let token = extract_bearer_token(headers)?;
        self.tokens.lookup(token)
    }

    /// Validate a raw token value
    pub fn validate_token(&self, token: &str) -> AuthResult<TokenInfo> {
        self.tokens.lookup(token)
    }

    /// Exact id and secret match against the registry
    pub fn find_client(&self, id: &str, secret: &str) -> AuthResult<&Client> {
        self.clients.find(id, secret)
    }

    /// Revoke a token. Unknown values are not an error.
    pub fn revoke(&self, token: &str) -> bool {
        let revoked = self.tokens.revoke(token);
        if revoked {
            tracing::info!("Revoked OAuth access token");
        }
        revoked
    }

    pub fn token_store(&self) -> Arc<TokenStore> {
        self.tokens.clone()
    }
}
