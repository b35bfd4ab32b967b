//! Errors returned by store actions and by storefront construction.
//!
//! Store actions return `Result<_, StoreError>`; the same failure is also
//! recorded as `last_error` in the store's observable state so a UI that only
//! renders snapshots can show it.

use thiserror::Error;
use vitrine_core::CredentialsError;

use crate::api::{ApiError, TransportError};
use crate::config::ConfigError;
use crate::models::PostInputError;

/// Failure of a store action.
#[derive(Debug, Error)]
pub enum StoreError {
    /// API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The action needs a signed-in user.
    #[error("Sign in required")]
    AuthRequired,

    /// Input rejected before any request was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A conflicting action of the same store is still running.
    #[error("Another request is still in progress")]
    Busy,
}

impl StoreError {
    /// Message suitable for a toast or inline error panel.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            Self::AuthRequired => "Please sign in to continue".to_string(),
            Self::Validation(message) => message.clone(),
            Self::Busy => "Please wait for the current request to finish".to_string(),
        }
    }

    /// Whether the session was lost while running the action.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        match self {
            Self::Api(e) => e.is_auth_failure(),
            Self::AuthRequired => true,
            Self::Validation(_) | Self::Busy => false,
        }
    }
}

impl From<CredentialsError> for StoreError {
    fn from(err: CredentialsError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<PostInputError> for StoreError {
    fn from(err: PostInputError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Failure to build a [`Storefront`](crate::Storefront).
#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::Credentials;

    #[test]
    fn test_validation_errors_convert() {
        let Err(err) = Credentials::new("not-an-email", "x") else {
            panic!("email must be rejected");
        };
        let err = StoreError::from(err);
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(!err.is_auth_failure());

        let err = StoreError::from(PostInputError::EmptyTitle);
        assert_eq!(err.user_message(), "title cannot be empty");
    }

    #[test]
    fn test_auth_failures() {
        assert!(StoreError::AuthRequired.is_auth_failure());
        assert!(StoreError::Api(ApiError::Unauthorized).is_auth_failure());
        assert!(!StoreError::Busy.is_auth_failure());
    }
}
