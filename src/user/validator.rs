//! Rules a candidate user must satisfy before anything is hashed or stored.

use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex_lite::Regex;
use validator::Validate;

use crate::user::error::{Result, ValidationReason};
use crate::user::{DniType, UserCandidate};

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Phone numbers with exactly 10 decimal digits.
const PHONE_RANGE: RangeInclusive<u64> = 1_000_000_000..=9_999_999_999;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z\s]+$").unwrap());

/// Check `candidate` against every rule, stopping at the first failure.
///
/// Rules are evaluated in this order: required fields, password length,
/// phone length, name characters, document type. On success the parsed
/// [`DniType`] is returned.
pub fn validate(candidate: &UserCandidate) -> Result<DniType> {
    candidate.validate().map_err(ValidationReason::Structural)?;

    if candidate.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationReason::PasswordTooShort.into());
    }

    if !PHONE_RANGE.contains(&candidate.phone) {
        return Err(ValidationReason::PhoneLengthInvalid.into());
    }

    if !NAME_RE.is_match(&candidate.name) {
        return Err(ValidationReason::NameHasInvalidCharacters.into());
    }

    candidate
        .type_dni
        .parse::<DniType>()
        .map_err(|_| ValidationReason::DniTypeInvalid.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::error::IdentityError;

    fn candidate() -> UserCandidate {
        UserCandidate {
            dni: 1,
            type_dni: "CC".into(),
            name: "Alex Doe".into(),
            email: "a@x.com".into(),
            password: "pass1234".into(),
            address: "Cra 00 #00-00".into(),
            phone: 1234567890,
        }
    }

    fn reason(result: Result<DniType>) -> ValidationReason {
        match result {
            Err(IdentityError::ValidationFailed { reason }) => reason,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_candidate() {
        assert_eq!(validate(&candidate()).unwrap(), DniType::Cc);

        let nit = UserCandidate {
            type_dni: "NIT".into(),
            ..candidate()
        };
        assert_eq!(validate(&nit).unwrap(), DniType::Nit);
    }

    #[test]
    fn test_structural_failures() {
        for broken in [
            UserCandidate {
                name: String::new(),
                ..candidate()
            },
            UserCandidate {
                email: "not-an-email".into(),
                ..candidate()
            },
            UserCandidate {
                dni: 0,
                ..candidate()
            },
            UserCandidate {
                address: String::new(),
                ..candidate()
            },
            UserCandidate {
                phone: 0,
                ..candidate()
            },
        ] {
            assert!(matches!(
                reason(validate(&broken)),
                ValidationReason::Structural(_)
            ));
        }
    }

    #[test]
    fn test_dni_upper_bound() {
        let largest = UserCandidate {
            dni: i64::MAX as u64,
            ..candidate()
        };
        assert!(validate(&largest).is_ok());

        let user = UserCandidate {
            dni: 10_000_000_000_000_000_000,
            ..candidate()
        };
        match reason(validate(&user)) {
            ValidationReason::Structural(errors) => {
                assert!(errors.field_errors().contains_key("dni"))
            },
            other => panic!("expected structural failure, got {other:?}"),
        }
    }

    #[test]
    fn test_password_too_short() {
        for password in ["", "a", "pass123"] {
            let user = UserCandidate {
                password: password.into(),
                ..candidate()
            };
            assert!(matches!(
                reason(validate(&user)),
                ValidationReason::PasswordTooShort
            ));
        }

        // Characters are counted, not bytes.
        let user = UserCandidate {
            password: "ééééééé".into(),
            ..candidate()
        };
        assert!(matches!(
            reason(validate(&user)),
            ValidationReason::PasswordTooShort
        ));
    }

    #[test]
    fn test_phone_length() {
        for phone in [123456789, 12345678901, 1] {
            let user = UserCandidate {
                phone,
                ..candidate()
            };
            assert!(matches!(
                reason(validate(&user)),
                ValidationReason::PhoneLengthInvalid
            ));
        }
    }

    #[test]
    fn test_name_characters() {
        for name in ["Alex99", "Alex-Doe", "Alex.", "Ålex"] {
            let user = UserCandidate {
                name: name.into(),
                ..candidate()
            };
            assert!(matches!(
                reason(validate(&user)),
                ValidationReason::NameHasInvalidCharacters
            ));
        }
    }

    #[test]
    fn test_dni_type() {
        for type_dni in ["", "cc", "PASSPORT", "NIT "] {
            let user = UserCandidate {
                type_dni: type_dni.into(),
                ..candidate()
            };
            assert!(matches!(
                reason(validate(&user)),
                ValidationReason::DniTypeInvalid
            ));
        }
    }

    #[test]
    fn test_first_failure_wins() {
        let user = UserCandidate {
            password: "short".into(),
            phone: 12,
            name: "Alex99".into(),
            type_dni: "XX".into(),
            ..candidate()
        };
        assert!(matches!(
            reason(validate(&user)),
            ValidationReason::PasswordTooShort
        ));

        let user = UserCandidate {
            phone: 12,
            name: "Alex99".into(),
            ..candidate()
        };
        assert!(matches!(
            reason(validate(&user)),
            ValidationReason::PhoneLengthInvalid
        ));

        let user = UserCandidate {
            name: "Alex99".into(),
            type_dni: "XX".into(),
            ..candidate()
        };
        assert!(matches!(
            reason(validate(&user)),
            ValidationReason::NameHasInvalidCharacters
        ));
    }
}
