//! Login and registration input, validated before anything is sent.
//!
//! Form validation never reaches the network layer: a [`Credentials`] or
//! [`Registration`] value can only exist once its fields passed these checks.

use core::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input is empty or only whitespace.
    #[error("email cannot be empty")]
    Empty,
    /// The input is longer than the RFC 5321 limit.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input does not have exactly one @ symbol.
    #[error("email must contain exactly one @ symbol")]
    AtSymbol,
    /// The local part (before @) is empty.
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    /// The domain has no dot or starts/ends with one.
    #[error("email domain '{0}' is not valid")]
    InvalidDomain(String),
    /// The input contains whitespace.
    #[error("email cannot contain whitespace")]
    Whitespace,
}

/// A normalised email address.
///
/// Surrounding whitespace is trimmed and the domain is lowercased so that
/// `Jane@Example.COM ` and `Jane@example.com` log in as the same account.
///
/// ```
/// use vitrine_core::Email;
///
/// let email = Email::parse(" Jane@Example.COM ").unwrap();
/// assert_eq!(email.as_str(), "Jane@example.com");
/// assert!(Email::parse("jane@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse and normalise an email address.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first rule the input breaks.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EmailError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (local, domain) = match trimmed.split_once('@') {
            Some((local, domain)) if !domain.contains('@') => (local, domain),
            _ => return Err(EmailError::AtSymbol),
        };
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(EmailError::InvalidDomain(domain.to_owned()));
        }

        Ok(Self(format!("{local}@{}", domain.to_lowercase())))
    }

    /// The address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part after the @.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

/// Errors that can occur when validating a [`Password`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// Shorter than [`Password::MIN_LENGTH`].
    #[error("password must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// Longer than [`Password::MAX_LENGTH`].
    #[error("password must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// Missing a letter or a digit.
    #[error("password must contain both letters and digits")]
    MissingCharacterClass,
    /// Confirmation field does not match.
    #[error("passwords do not match")]
    Mismatch,
}

/// A password that satisfies the signup rules.
///
/// The value is wrapped in a [`SecretString`] so it never shows up in logs.
#[derive(Clone)]
pub struct Password(SecretString);

impl Password {
    /// Minimum number of characters.
    pub const MIN_LENGTH: usize = 8;
    /// Maximum number of characters.
    pub const MAX_LENGTH: usize = 128;

    /// Validate a new password.
    ///
    /// # Errors
    ///
    /// Returns a [`PasswordError`] if the password is too short, too long, or
    /// lacks either a letter or a digit.
    pub fn new(raw: &str) -> Result<Self, PasswordError> {
        let len = raw.chars().count();
        if len < Self::MIN_LENGTH {
            return Err(PasswordError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if len > Self::MAX_LENGTH {
            return Err(PasswordError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        let has_letter = raw.chars().any(char::is_alphabetic);
        let has_digit = raw.chars().any(|c| c.is_ascii_digit());
        if !(has_letter && has_digit) {
            return Err(PasswordError::MissingCharacterClass);
        }
        Ok(Self(SecretString::from(raw)))
    }

    /// Validate a password together with its confirmation field.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::Mismatch`] when the two differ, otherwise the
    /// same errors as [`Password::new`].
    pub fn confirmed(raw: &str, confirmation: &str) -> Result<Self, PasswordError> {
        if raw != confirmation {
            return Err(PasswordError::Mismatch);
        }
        Self::new(raw)
    }

    /// Expose the raw password for the request body.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// Login form input.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account email.
    pub email: Email,
    /// Account password. Existing accounts are not re-checked against the
    /// signup rules, only for emptiness.
    pub password: SecretString,
}

impl Credentials {
    /// Build login credentials from raw form fields.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] for a malformed email. An empty password is
    /// reported as [`PasswordError::TooShort`] with a minimum of one.
    pub fn new(email: &str, password: &str) -> Result<Self, CredentialsError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(PasswordError::TooShort { min: 1 }.into());
        }
        Ok(Self {
            email,
            password: SecretString::from(password),
        })
    }
}

/// Registration form input.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Display name shown on the profile.
    pub name: String,
    /// Account email.
    pub email: Email,
    /// New password.
    pub password: Password,
}

impl Registration {
    /// Build a registration from raw form fields.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure among name, email and password.
    pub fn new(
        name: &str,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<Self, CredentialsError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CredentialsError::EmptyName);
        }
        Ok(Self {
            name: name.to_owned(),
            email: Email::parse(email)?,
            password: Password::confirmed(password, confirmation)?,
        })
    }
}

/// Validation failure for login or registration input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    /// Email field is invalid.
    #[error(transparent)]
    Email(#[from] EmailError),
    /// Password field is invalid.
    #[error(transparent)]
    Password(#[from] PasswordError),
    /// Name field is empty.
    #[error("name cannot be empty")]
    EmptyName,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_email_normalises_domain() {
        let email = Email::parse("  Mixed.Case@Shop.EXAMPLE.org").unwrap();
        assert_eq!(email.as_str(), "Mixed.Case@shop.example.org");
        assert_eq!(email.domain(), "shop.example.org");
    }

    #[test]
    fn test_email_rejections() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("a@b@c.d"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("no-at.example"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("@example.com"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("a b@example.com"), Err(EmailError::Whitespace));
        assert!(matches!(
            Email::parse("user@localhost"),
            Err(EmailError::InvalidDomain(_))
        ));
        assert!(matches!(
            Email::parse("user@example."),
            Err(EmailError::InvalidDomain(_))
        ));
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(Email::parse(&long), Err(EmailError::TooLong { .. })));
    }

    #[test]
    fn test_email_deserialize_validates() {
        let ok: Email = serde_json::from_str("\"user@example.com\"").unwrap();
        assert_eq!(ok.as_str(), "user@example.com");
        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(Password::new("abc123de").is_ok());
        assert_eq!(
            Password::new("short1").unwrap_err(),
            PasswordError::TooShort { min: 8 }
        );
        assert_eq!(
            Password::new("onlyletters").unwrap_err(),
            PasswordError::MissingCharacterClass
        );
        assert_eq!(
            Password::confirmed("abc123de", "abc123df").unwrap_err(),
            PasswordError::Mismatch
        );
    }

    #[test]
    fn test_password_debug_is_redacted() {
        let password = Password::new("hunter22hunter").unwrap();
        assert!(!format!("{password:?}").contains("hunter"));
    }

    #[test]
    fn test_registration_validation_order() {
        assert_eq!(
            Registration::new(" ", "a@b.co", "abc123de", "abc123de").unwrap_err(),
            CredentialsError::EmptyName
        );
        assert!(matches!(
            Registration::new("Ann", "bad", "abc123de", "abc123de"),
            Err(CredentialsError::Email(_))
        ));
        let reg = Registration::new(" Ann ", "ann@b.co", "abc123de", "abc123de").unwrap();
        assert_eq!(reg.name, "Ann");
    }

    #[test]
    fn test_credentials_require_password() {
        assert!(Credentials::new("ann@b.co", "").is_err());
        assert!(Credentials::new("ann@b.co", "x").is_ok());
    }
}
