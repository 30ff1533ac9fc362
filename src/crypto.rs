//! Password hashing.

use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::config::Argon2 as ArgonConfig;
use crate::user::error::{IdentityError, Result};

/// Longest accepted password, in bytes.
pub const MAX_PASSWORD_LENGTH: usize = 255;

/// One-way, salted password hashing.
pub trait CredentialHasher: Send + Sync {
    /// Hash `plaintext` into a self-describing digest.
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// Check `plaintext` against a digest produced by [`Self::hash`].
    ///
    /// Malformed digests never match.
    fn verify(&self, plaintext: &str, digest: &str) -> bool;
}

/// Password manager that uses Argon2id and PHC string format for hashing and
/// verification.
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Create a new [`Argon2Hasher`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| IdentityError::Configuration(format!("argon2: {err}")))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        if plaintext.len() > MAX_PASSWORD_LENGTH {
            tracing::debug!(
                length = plaintext.len(),
                "password exceeds hashing limit"
            );
            return Err(IdentityError::HashingFailed);
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|err| {
                tracing::error!(error = %err, "argon2 hashing failed");
                IdentityError::HashingFailed
            })?;

        Ok(hash.to_string())
    }

    fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };

        // Output comparison is constant-time inside `password-hash`.
        self.argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}
