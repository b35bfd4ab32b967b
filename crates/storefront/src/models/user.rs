//! Account profile types.

use serde::{Deserialize, Serialize};
use vitrine_core::{Email, MediaId, UserId};

/// The signed-in shopper as returned by `GET user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Staff accounts may create and edit blog posts.
    #[serde(default)]
    pub is_staff: bool,
}

impl User {
    /// Name to greet the user with, falling back to the email's local part.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.email.split('@').next().unwrap_or(&self.email)
        } else {
            &self.name
        }
    }
}

/// Partial profile update sent with `PATCH user`.
///
/// Only fields that are `Some` are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<MediaId>,
}

impl ProfileUpdate {
    /// Nothing would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.avatar.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_fallback() {
        let mut user: User =
            serde_json::from_str(r#"{"id":1,"email":"ann@example.com"}"#).unwrap();
        assert_eq!(user.display_name(), "ann");
        user.name = "Ann Lee".to_string();
        assert_eq!(user.display_name(), "Ann Lee");
    }

    #[test]
    fn test_profile_update_skips_unset_fields() {
        let update = ProfileUpdate {
            name: Some("Bo".to_string()),
            ..ProfileUpdate::default()
        };
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"name":"Bo"}"#);
        assert!(ProfileUpdate::default().is_empty());
    }
}
