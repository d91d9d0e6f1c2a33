use crate::auth::Identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// User record. The password hash is read from storage but never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// New record with a fresh id; `password_hash` must already be hashed
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            password: password_hash.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields a user update may change
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub id: String,
    pub username: String,
    /// Already hashed; `None` keeps the current password
    pub password: Option<String>,
}

/// Credentials for `POST /api/v1/users/token`
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TokenRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 100))]
    pub password: String,
}

/// Signed access token handed back on login
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessTokenData {
    pub access_token: String,
    /// Unix timestamp
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct StoreRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 100))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    /// Empty or absent keeps the current password
    #[serde(default)]
    #[validate(length(max = 100))]
    pub password: String,
}

/// Pagination for user listing
#[derive(Debug, Default, Deserialize)]
pub struct FetchQuery {
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub offset: Option<String>,
}

impl FetchQuery {
    pub const DEFAULT_LIMIT: usize = 10;
    pub const MAX_LIMIT: usize = 100;

    /// Unparseable values fall back to the defaults instead of failing.
    /// Larger pages are cut to `MAX_LIMIT`.
    pub fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> usize {
        self.offset
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}

/// Caller's own record plus how they authenticated
#[derive(Debug, Serialize)]
pub struct Profile {
    pub user: User,
    pub auth: Identity,
}

/// `{ "message": ..., "data": ... }` response body
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            message: "OK".to_string(),
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}
