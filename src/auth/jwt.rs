use super::{AuthError, AuthResult};
use crate::utils::config::JwtConfig;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

/// Longest accepted validity window, ten years
pub const MAX_VALIDITY_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Signs and checks HS256 access tokens.
///
/// Built once at startup from `JwtConfig`; the keys are never replaced while
/// the process runs.
pub struct AccessTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validity: Duration,
    validation: Validation,
}

impl AccessTokenIssuer {
    pub fn new(config: &JwtConfig) -> AuthResult<Self> {
        if config.secret.trim().is_empty() {
            return Err(AuthError::MisconfiguredSigning("JWT secret is empty".to_string()));
        }
        if config.validity_secs == 0 {
            return Err(AuthError::MisconfiguredSigning(
                "JWT validity window must be positive".to_string(),
            ));
        }
        if config.validity_secs > MAX_VALIDITY_SECS {
            return Err(AuthError::MisconfiguredSigning(format!(
                "JWT validity window may not exceed {MAX_VALIDITY_SECS} seconds"
            )));
        }
        let validity = i64::try_from(config.validity_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| AuthError::MisconfiguredSigning("JWT validity window too large".to_string()))?;

        // Expiry is compared against an explicit clock in `verify_at`, with no leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validity,
            validation,
        })
    }

    /// Mint a token for `subject`, valid for the configured window from now
    pub fn issue(&self, subject: &str, username: &str) -> AuthResult<(String, DateTime<Utc>)> {
        self.issue_at(subject, username, Utc::now())
    }

    pub fn issue_at(
        &self,
        subject: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<(String, DateTime<Utc>)> {
        let expires_at = now
            .checked_add_signed(self.validity)
            .ok_or_else(|| AuthError::Internal("token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: subject.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::MisconfiguredSigning(format!("failed to sign token: {e}")))?;

        tracing::debug!(sub = %subject, exp = claims.exp, "Issued access token");
        Ok((token, claims.expires_at()))
    }

    /// Check signature and expiry against the current time
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        self.verify_at(token, Utc::now())
    }

    /// A token is valid iff its signature checks out and `now < exp`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::UnknownToken,
                _ => AuthError::MalformedToken,
            }
        })?;

        if now.timestamp() >= data.claims.exp {
            return Err(AuthError::ExpiredToken);
        }
        Ok(data.claims)
    }
}
