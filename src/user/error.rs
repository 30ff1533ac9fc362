//! Typed failures of the identity core.

use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, IdentityError>;

/// Why a candidate user was rejected by the validator.
#[derive(Debug, thiserror::Error)]
pub enum ValidationReason {
    #[error("{0}")]
    Structural(ValidationErrors),
    #[error("password must contain at least 8 characters")]
    PasswordTooShort,
    #[error("phone number must contain exactly 10 digits")]
    PhoneLengthInvalid,
    #[error("name must only contain letters and spaces")]
    NameHasInvalidCharacters,
    #[error("document type must be CC or NIT")]
    DniTypeInvalid,
}

/// Closed set of failures an identity operation can end with.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("validation failed: {reason}")]
    ValidationFailed { reason: ValidationReason },
    #[error("password could not be hashed")]
    HashingFailed,
    #[error("user not found")]
    NotFound,
    #[error("user is disabled")]
    DisabledUser,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("no user was deleted")]
    NothingDeleted,
    #[error("email is already used by another user")]
    EmailTaken,
    #[error("persistence failure: {0}")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("invalid token")]
    TokenInvalid,
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Fieldless discriminant of [`IdentityError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ValidationFailed,
    HashingFailed,
    NotFound,
    DisabledUser,
    InvalidCredentials,
    NothingDeleted,
    EmailTaken,
    Persistence,
    TokenInvalid,
    Configuration,
}

impl IdentityError {
    /// Wrap a store failure.
    pub fn persistence<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Persistence(Box::new(err))
    }

    /// Kind of the error, without its payload.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            Self::HashingFailed => ErrorKind::HashingFailed,
            Self::NotFound => ErrorKind::NotFound,
            Self::DisabledUser => ErrorKind::DisabledUser,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::NothingDeleted => ErrorKind::NothingDeleted,
            Self::EmailTaken => ErrorKind::EmailTaken,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::TokenInvalid => ErrorKind::TokenInvalid,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

impl From<ValidationReason> for IdentityError {
    fn from(reason: ValidationReason) -> Self {
        Self::ValidationFailed { reason }
    }
}

/// Turn any driver error into [`IdentityError::Persistence`].
pub trait ToPersistence<T> {
    fn catch(self) -> Result<T>;
}

impl<T, E> ToPersistence<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn catch(self) -> Result<T> {
        self.map_err(IdentityError::persistence)
    }
}
