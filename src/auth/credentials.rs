use super::{AuthError, AuthResult, CredentialVerifier};
use crate::{
    db::{RepositoryError, UserRepository},
    models::User,
};
use std::sync::Arc;

/// Username/password check shared by both token schemes.
///
/// An unknown username and a wrong password fail identically, down to the
/// hashing work done.
pub struct Authenticator {
    users: Arc<dyn UserRepository>,
    verifier: CredentialVerifier,
    // Verified against when the username is unknown.
    decoy_hash: String,
}

impl Authenticator {
    pub fn new(users: Arc<dyn UserRepository>, verifier: CredentialVerifier) -> AuthResult<Self> {
        let decoy_hash = verifier.hash(&uuid::Uuid::new_v4().to_string())?;
        Ok(Self {
            users,
            verifier,
            decoy_hash,
        })
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> AuthResult<User> {
        let user = match self.users.find_by_username(username).await {
            Ok(user) => Some(user),
            Err(RepositoryError::NotFound) => None,
            Err(err) => return Err(AuthError::RepositoryFailure(err.to_string())),
        };

        let stored_hash = user
            .as_ref()
            .map(|u| u.password.clone())
            .unwrap_or_else(|| self.decoy_hash.clone());
        let verified = self
            .verifier
            .verify_blocking(stored_hash, password.to_string())
            .await;

        match user {
            Some(user) if verified => Ok(user),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    pub fn verifier(&self) -> &CredentialVerifier {
        &self.verifier
    }
}
