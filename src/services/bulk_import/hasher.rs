use async_trait::async_trait;

use crate::core::security::{self, SecurityError};

/// Derives the initial credential for accounts created by an import.
#[async_trait]
pub(crate) trait CredentialHasher: Send + Sync {
    async fn hash(&self, plaintext: &str) -> Result<String, SecurityError>;
}

/// Argon2 hashing, moved to the blocking pool so rows do not stall the runtime.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Argon2Hasher;

#[async_trait]
impl CredentialHasher for Argon2Hasher {
    async fn hash(&self, plaintext: &str) -> Result<String, SecurityError> {
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || security::hash_password(&plaintext))
            .await
            .map_err(|_| SecurityError::Hashing)?
    }
}
