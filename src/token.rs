//! Manage json web tokens.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};

use crate::config::Token as TokenConfig;
use crate::user::error::{IdentityError, Result};

/// Access token lifetime when none is configured.
pub const DEFAULT_ACCESS_EXPIRATION: Duration = Duration::from_secs(30 * 60);
/// Refresh token lifetime.
pub const REFRESH_EXPIRATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Purpose a token was issued for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived bearer credential.
    #[default]
    Access,
    /// Long-lived token, never accepted as a bearer credential.
    Refresh,
}

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User email.
    pub sub: String,
    /// Identifies the expiration time on or after which the JWT must not be
    /// accepted for processing.
    pub exp: u64,
    /// Identifies the time at which the JWT was issued.
    pub iat: u64,
    /// Token purpose.
    pub typ: TokenKind,
}

/// Access and refresh token issued together.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Stateless bearer token issuance and verification.
pub trait TokenIssuer: Send + Sync {
    /// Sign an access and a refresh token for `subject`.
    fn issue(&self, subject: &str) -> Result<TokenPair>;

    /// Check signature and expiry of `token`.
    ///
    /// Every failure is reported as [`IdentityError::TokenInvalid`].
    fn verify(&self, token: &str) -> Result<Claims>;

    /// Lifetime of access tokens.
    fn access_expiration(&self) -> Duration;
}

/// HS256 JWT issuer keyed by a shared secret.
#[derive(Clone)]
pub struct JwtIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_expiration: Duration,
    clock: Arc<dyn Clock>,
}

impl JwtIssuer {
    /// Create a new [`JwtIssuer`] instance.
    ///
    /// A missing or empty secret is a configuration error.
    pub fn new(config: Option<&TokenConfig>) -> Result<Self> {
        let secret = config
            .and_then(|token| token.secret.as_deref())
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| {
                IdentityError::Configuration(
                    "missing token secret".to_owned(),
                )
            })?;

        let access_expiration = config
            .and_then(|token| token.access_expiration_minutes)
            .map(|minutes| Duration::from_secs(minutes * 60))
            .unwrap_or(DEFAULT_ACCESS_EXPIRATION);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_expiration,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn sign(
        &self,
        subject: &str,
        now: u64,
        lifetime: Duration,
        typ: TokenKind,
    ) -> Result<String> {
        let claims = Claims {
            sub: subject.to_owned(),
            exp: now + lifetime.as_secs(),
            iat: now,
            typ,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| {
                tracing::error!(error = %err, "cannot sign token");
                IdentityError::TokenInvalid
            })
    }

    fn now(&self) -> u64 {
        u64::try_from(self.clock.now().timestamp()).unwrap_or_default()
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue(&self, subject: &str) -> Result<TokenPair> {
        let now = self.now();

        Ok(TokenPair {
            access_token: self.sign(
                subject,
                now,
                self.access_expiration,
                TokenKind::Access,
            )?,
            refresh_token: self.sign(
                subject,
                now,
                REFRESH_EXPIRATION,
                TokenKind::Refresh,
            )?,
        })
    }

    fn verify(&self, token: &str) -> Result<Claims> {
        // Expiry is checked against the injected clock, without leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| IdentityError::TokenInvalid)?
            .claims;

        if claims.exp <= self.now() {
            return Err(IdentityError::TokenInvalid);
        }

        Ok(claims)
    }

    fn access_expiration(&self) -> Duration {
        self.access_expiration
    }
}

/// Clock frozen at a settable instant.
#[cfg(test)]
#[derive(Debug)]
pub struct FixedClock(std::sync::Mutex<DateTime<Utc>>);

#[cfg(test)]
impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(std::sync::Mutex::new(now))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}
