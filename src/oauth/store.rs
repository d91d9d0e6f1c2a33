use crate::auth::{AuthError, AuthResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
    time::Duration,
};
use tokio::task::JoinHandle;

/// Raw token length before encoding (256 bits)
const TOKEN_BYTES: usize = 32;

/// What an opaque token grants, as attached to authenticated requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TokenInfo {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// An issued token: the value handed to the client plus its record
#[derive(Debug, Clone)]
pub struct OpaqueToken {
    pub value: String,
    pub info: TokenInfo,
}

/// In-memory opaque token store, keyed by token value.
///
/// Lookups take the read lock; inserts, revocations and sweeps take the write
/// lock. The lock is never held across an `.await`.
#[derive(Default)]
pub struct TokenStore {
    tokens: RwLock<HashMap<String, TokenInfo>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `info` under a fresh random value
    pub fn insert(&self, info: TokenInfo) -> OpaqueToken {
        loop {
            let value = generate_token_value();
            let mut tokens = self.tokens.write();
            // A collision on 256 random bits means a broken RNG; never overwrite.
            if let Entry::Vacant(slot) = tokens.entry(value.clone()) {
                slot.insert(info.clone());
                return OpaqueToken { value, info };
            }
        }
    }

    pub fn lookup(&self, value: &str) -> AuthResult<TokenInfo> {
        self.lookup_at(value, Utc::now())
    }

    /// Find a live token. Expired entries are evicted on the way out.
    pub fn lookup_at(&self, value: &str, now: DateTime<Utc>) -> AuthResult<TokenInfo> {
        {
            let tokens = self.tokens.read();
            match tokens.get(value) {
                None => return Err(AuthError::UnknownToken),
                Some(info) if !info.is_expired_at(now) => return Ok(info.clone()),
                Some(_) => {}
            }
        }

        let mut tokens = self.tokens.write();
        if tokens.get(value).is_some_and(|info| info.is_expired_at(now)) {
            tokens.remove(value);
        }
        Err(AuthError::ExpiredToken)
    }

    /// Drop a token. Returns whether it was present.
    pub fn revoke(&self, value: &str) -> bool {
        self.tokens.write().remove(value).is_some()
    }

    pub fn sweep_expired(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// Remove every token expired at `now`, returning how many were dropped
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut tokens = self.tokens.write();
        let before = tokens.len();
        tokens.retain(|_, info| !info.is_expired_at(now));
        before - tokens.len()
    }

    pub fn len(&self) -> usize {
        self.tokens.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn generate_token_value() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Periodically evict expired tokens until the task is aborted
pub fn spawn_sweeper(store: Arc<TokenStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = store.sweep_expired();
            if removed > 0 {
                tracing::debug!(removed, remaining = store.len(), "Swept expired OAuth tokens");
            }
        }
    })
}
