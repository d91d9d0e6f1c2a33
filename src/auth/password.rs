use super::{AuthError, AuthResult};
use crate::utils::config::PasswordConfig;
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier, Version};

/// Salted, slow password hashing (Argon2id).
///
/// `verify` never errors: a wrong password and an unreadable stored hash both
/// come back as `false`, so callers cannot build an oracle on the difference.
#[derive(Clone)]
pub struct CredentialVerifier {
    argon2: Argon2<'static>,
}

impl CredentialVerifier {
    pub fn new(config: PasswordConfig) -> AuthResult<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| AuthError::Internal(format!("invalid password hash parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash password for storage, with a fresh salt on every call
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("failed to hash password: {e}")))
    }

    /// Check a plaintext password against a stored PHC hash string.
    ///
    /// The cost parameters embedded in the stored hash are used, so hashes
    /// written under an older cost setting keep verifying.
    pub fn verify(&self, stored_hash: &str, password: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        self.argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    }

    /// `hash` on the blocking pool
    pub async fn hash_blocking(&self, password: String) -> AuthResult<String> {
        let verifier = self.clone();
        tokio::task::spawn_blocking(move || verifier.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
    }

    /// `verify` on the blocking pool
    pub async fn verify_blocking(&self, stored_hash: String, password: String) -> bool {
        let verifier = self.clone();
        tokio::task::spawn_blocking(move || verifier.verify(&stored_hash, &password))
            .await
            .unwrap_or(false)
    }
}
