//! User entity and the candidate shape accepted on create and update.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Category of a national identity document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DniType {
    /// Citizenship card.
    #[serde(rename = "CC")]
    Cc,
    /// Tax identifier.
    #[serde(rename = "NIT")]
    Nit,
}

impl DniType {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DniType::Cc => "CC",
            DniType::Nit => "NIT",
        }
    }
}

impl FromStr for DniType {
    type Err = ();

    /// Only exact, upper-case values are accepted.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "CC" => Ok(DniType::Cc),
            "NIT" => Ok(DniType::Nit),
            _ => Err(()),
        }
    }
}

impl fmt::Display for DniType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User as persisted on the store.
///
/// `password` always holds a PHC digest, never the supplied plaintext.
#[derive(Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub dni: u64,
    pub type_dni: DniType,
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
    pub phone: u64,
    pub enabled: bool,
    pub token: String,
    pub refresh_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("dni", &self.dni)
            .field("type_dni", &self.type_dni)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("address", &self.address)
            .field("phone", &self.phone)
            .field("enabled", &self.enabled)
            .field("token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[cfg(test)]
impl User {
    /// Enabled user ready to be stored.
    pub fn fixture(email: &str) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            dni: 1,
            type_dni: DniType::Cc,
            name: "Alex Doe".into(),
            email: email.into(),
            password: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdA$aGFzaA".into(),
            address: "Cra 00 #00-00".into(),
            phone: 1234567890,
            enabled: true,
            token: "access".into(),
            refresh_token: "refresh".into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields supplied by a caller to create or update a user.
///
/// Missing fields fall back to their zero value so that they are reported by
/// the structural validation rather than by the decoder.
#[derive(Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct UserCandidate {
    /// Upper bound is the largest integer the store keeps.
    #[validate(range(
        min = 1,
        max = 9_223_372_036_854_775_807_u64,
        message = "DNI is required and must fit a signed 64-bit integer."
    ))]
    pub dni: u64,
    pub type_dni: String,
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    pub password: String,
    #[validate(length(min = 1, message = "Address is required."))]
    pub address: String,
    #[validate(range(min = 1, message = "Phone is required."))]
    pub phone: u64,
}

impl fmt::Debug for UserCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCandidate")
            .field("dni", &self.dni)
            .field("type_dni", &self.type_dni)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("address", &self.address)
            .field("phone", &self.phone)
            .finish()
    }
}
