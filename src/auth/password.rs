use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use std::sync::Arc;

use crate::auth::{AuthError, Result};

/// One-way hash and compare for account passwords
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;

    /// `Ok(false)` on mismatch; `Err` only for unreadable stored hashes
    fn verify(&self, password: &str, password_hash: &str) -> Result<bool>;
}

/// Argon2id with a random per-password salt, stored as a PHC string
#[derive(Default, Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    fn verify(&self, password: &str, password_hash: &str) -> Result<bool> {
        let parsed_hash =
            PasswordHash::new(password_hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

/// Hash on the blocking pool so the calling worker keeps serving requests
pub async fn hash_blocking(hasher: Arc<dyn CredentialHasher>, password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| AuthError::Hashing(format!("hash task failed: {}", e)))?
}

/// Blocking-pool counterpart of [`CredentialHasher::verify`]
pub async fn verify_blocking(
    hasher: Arc<dyn CredentialHasher>,
    password: String,
    password_hash: String,
) -> Result<bool> {
    tokio::task::spawn_blocking(move || hasher.verify(&password, &password_hash))
        .await
        .map_err(|e| AuthError::Hashing(format!("verify task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash("p1").unwrap();

        assert_ne!(hash, "p1");
        assert!(hasher.verify("p1", &hash).unwrap());
        assert!(!hasher.verify("p2", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let hasher = Argon2Hasher::new();
        assert_ne!(hasher.hash("p1").unwrap(), hasher.hash("p1").unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(Argon2Hasher::new().verify("p1", "not-a-phc-string").is_err());
    }

    #[tokio::test]
    async fn blocking_pool_helpers_match_direct_calls() {
        let hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2Hasher::new());
        let hash = hash_blocking(hasher.clone(), "p1".to_string()).await.unwrap();

        assert!(hasher.verify("p1", &hash).unwrap());
        assert!(verify_blocking(hasher.clone(), "p1".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_blocking(hasher, "p2".to_string(), hash).await.unwrap());
    }
}
