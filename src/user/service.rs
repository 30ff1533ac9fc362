use std::sync::Arc;
use std::time::Duration;

use crate::crypto::CredentialHasher;
use crate::token::{Claims, Clock, TokenIssuer};
use crate::user::error::{IdentityError, Result};
use crate::user::{User, UserCandidate, UserStore, validator};

/// Plaintext hashed once at start-up, verified when a login targets no user.
const DECOY_PASSWORD: &str = "decoy-password-never-matches";

/// Identity use cases.
///
/// Holds no per-request state: clones share the same dependencies and may
/// serve any number of concurrent calls.
#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<dyn TokenIssuer>,
    clock: Arc<dyn Clock>,
    decoy: Arc<str>,
}

impl IdentityService {
    /// Create a new [`IdentityService`].
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<dyn TokenIssuer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let decoy = hasher.hash(DECOY_PASSWORD)?.into();

        Ok(Self {
            store,
            hasher,
            tokens,
            clock,
            decoy,
        })
    }

    /// Lifetime of issued access tokens.
    pub fn access_expiration(&self) -> Duration {
        self.tokens.access_expiration()
    }

    /// Validate, hash and store a new enabled user with a fresh token pair.
    pub async fn create_user(&self, candidate: UserCandidate) -> Result<User> {
        let type_dni = validator::validate(&candidate).inspect_err(|err| {
            tracing::debug!(error = %err, "user creation rejected")
        })?;
        let password = self.hasher.hash(&candidate.password)?;
        let now = self.clock.now();
        let tokens = self.tokens.issue(&candidate.email)?;

        let user = self
            .store
            .create(User {
                id: String::new(),
                dni: candidate.dni,
                type_dni,
                name: candidate.name,
                email: candidate.email,
                password,
                address: candidate.address,
                phone: candidate.phone,
                enabled: true,
                token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Overwrite an enabled user with `candidate`.
    ///
    /// Tokens and creation date are kept.
    pub async fn update_user(
        &self,
        id: &str,
        candidate: UserCandidate,
    ) -> Result<User> {
        let type_dni = validator::validate(&candidate).inspect_err(|err| {
            tracing::debug!(user_id = %id, error = %err, "user update rejected")
        })?;
        let password = self.hasher.hash(&candidate.password)?;
        let now = self.clock.now();

        let user = self
            .store
            .update(User {
                id: id.to_owned(),
                dni: candidate.dni,
                type_dni,
                name: candidate.name,
                email: candidate.email,
                password,
                address: candidate.address,
                phone: candidate.phone,
                enabled: true,
                token: String::new(),
                refresh_token: String::new(),
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(user_id = %user.id, "user updated");
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> Result<User> {
        self.store.get_by_id(id).await
    }

    /// Remove a user permanently.
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        self.store.hard_delete(id).await?;
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Disable a user, keeping its record.
    pub async fn soft_delete_user(&self, id: &str) -> Result<()> {
        self.store.soft_delete(id).await?;
        tracing::info!(user_id = %id, "user disabled");
        Ok(())
    }

    /// Check `password` for the enabled user owning `email` and rotate its
    /// tokens.
    ///
    /// Unknown email, disabled user and wrong password all end with
    /// [`IdentityError::InvalidCredentials`].
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let user = match self.store.get_by_email(email).await {
            Ok(user) => user,
            Err(IdentityError::NotFound | IdentityError::DisabledUser) => {
                // Same amount of hashing work as a real verification.
                self.hasher.verify(password, &self.decoy);
                return Err(IdentityError::InvalidCredentials);
            },
            // Store failures surface unchanged, never as bad credentials.
            Err(err) => return Err(err),
        };

        if !self.hasher.verify(password, &user.password) {
            tracing::warn!(user_id = %user.id, "login with wrong password");
            return Err(IdentityError::InvalidCredentials);
        }

        let tokens = self.tokens.issue(&user.email)?;
        let refreshed = User {
            token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            updated_at: self.clock.now(),
            ..user
        };
        let stored = self.store.update_token(refreshed.clone()).await?;

        tracing::info!(user_id = %stored.id, "user logged in");
        Ok(User {
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            ..refreshed
        })
    }

    /// Check a bearer token.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        self.tokens.verify(token)
    }
}

#[cfg(test)]
impl IdentityService {
    /// Service on cheap Argon2 parameters and a frozen clock.
    pub fn testing(
        store: Arc<dyn UserStore>,
        clock: Arc<crate::token::FixedClock>,
    ) -> Self {
        use crate::config::{Argon2, Token};
        use crate::crypto::Argon2Hasher;
        use crate::token::JwtIssuer;

        let config = Token {
            secret: Some("dGVzdC1zZWNyZXQta2V5".into()),
            access_expiration_minutes: None,
        };
        let tokens = JwtIssuer::new(Some(&config))
            .unwrap()
            .with_clock(clock.clone());

        Self::new(
            store,
            Arc::new(Argon2Hasher::new(Some(Argon2::fast())).unwrap()),
            Arc::new(tokens),
            clock,
        )
        .unwrap()
    }
}
