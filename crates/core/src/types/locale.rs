//! Storefront UI locale.
//!
//! Sent to the backend as `Accept-Language` so catalog titles, menu labels and
//! blog posts come back translated.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error parsing a [`Locale`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid locale tag '{0}', expected e.g. 'en' or 'en-US'")]
pub struct LocaleError(pub String);

/// A language tag of the form `ll` or `ll-RR`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    /// Language part, e.g. `en` for `en-US`.
    #[must_use]
    pub fn language(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    /// The full tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self("en".to_owned())
    }
}

impl FromStr for Locale {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().replace('_', "-");
        let mut parts = tag.split('-');
        let language = parts.next().unwrap_or_default();
        let region = parts.next();
        let valid_language =
            (2..=3).contains(&language.len()) && language.chars().all(|c| c.is_ascii_alphabetic());
        let valid_region = region.is_none_or(|r| {
            r.len() == 2 && r.chars().all(|c| c.is_ascii_alphabetic())
        });
        if !valid_language || !valid_region || parts.next().is_some() {
            return Err(LocaleError(s.to_owned()));
        }
        Ok(Self(match region {
            Some(region) => format!("{}-{}", language.to_lowercase(), region.to_uppercase()),
            None => language.to_lowercase(),
        }))
    }
}

impl TryFrom<String> for Locale {
    type Error = LocaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalises_case_and_separator() {
        let locale: Locale = "uk_ua".parse().unwrap();
        assert_eq!(locale.as_str(), "uk-UA");
        assert_eq!(locale.language(), "uk");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("english".parse::<Locale>().is_err());
        assert!("en-USA".parse::<Locale>().is_err());
        assert!("en-US-x".parse::<Locale>().is_err());
        assert!("".parse::<Locale>().is_err());
    }

    #[test]
    fn test_default_is_english() {
        assert_eq!(Locale::default().as_str(), "en");
    }
}
