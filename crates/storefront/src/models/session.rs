//! Token types exchanged with the auth endpoints.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use super::user::User;

/// Access/refresh token pair.
///
/// Backends differ on naming, so both `access_token` and `access` are
/// accepted (likewise for the refresh token). A refresh response may omit
/// the refresh token when the backend does not rotate it.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
}

#[derive(Deserialize)]
struct RawTokenPair {
    #[serde(alias = "access")]
    access_token: String,
    #[serde(default, alias = "refresh")]
    refresh_token: Option<String>,
}

impl<'de> Deserialize<'de> for TokenPair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawTokenPair::deserialize(deserializer)?;
        Ok(Self {
            access_token: SecretString::from(raw.access_token),
            refresh_token: raw.refresh_token.map(SecretString::from),
        })
    }
}

impl TokenPair {
    /// Whether this pair carries the given access token.
    #[must_use]
    pub fn has_access_token(&self, token: &str) -> bool {
        self.access_token.expose_secret() == token
    }
}

/// Response of `login` and `register`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: User,
}
