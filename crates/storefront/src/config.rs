//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `VITRINE_API_URL` - Base URL of the REST backend (e.g. `https://api.example.com/v1/`)
//!
//! ## Optional
//! - `VITRINE_LOCALE` - UI locale sent as `Accept-Language` (default: en)
//! - `VITRINE_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `VITRINE_ITEMS_PER_PAGE` - Catalog page size (default: 12)
//! - `VITRINE_AUTOCOMPLETE_DEBOUNCE_MS` - Autocomplete debounce window (default: 300)
//! - `VITRINE_MENU_TTL_SECS` - In-memory menu cache lifetime (default: 300)
//! - `VITRINE_STATE_DIR` - Directory for persisted client state (default: in-memory only)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;
use vitrine_core::Locale;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ITEMS_PER_PAGE: u32 = 12;
const MAX_ITEMS_PER_PAGE: u32 = 100;
const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_MENU_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every endpoint path is joined onto. Always ends with `/`.
    pub api_url: Url,
    /// Locale requested from the backend.
    pub locale: Locale,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Default catalog page size.
    pub items_per_page: u32,
    /// Quiet period before an autocomplete request is sent.
    pub autocomplete_debounce: Duration,
    /// How long the navigation menu is served from memory.
    pub menu_ttl: Duration,
    /// Where persisted stores are written; `None` keeps them in memory.
    pub state_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the API URL.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url: normalize_base_url(api_url),
            locale: Locale::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            autocomplete_debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            menu_ttl: Duration::from_secs(DEFAULT_MENU_TTL_SECS),
            state_dir: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = get_required_env("VITRINE_API_URL")?;
        let api_url = Url::parse(&api_url).map_err(|e| {
            ConfigError::InvalidEnvVar("VITRINE_API_URL".to_string(), e.to_string())
        })?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "VITRINE_API_URL".to_string(),
                format!("unsupported scheme '{}'", api_url.scheme()),
            ));
        }

        let mut config = Self::new(api_url);
        config.locale = get_parsed_or("VITRINE_LOCALE", Locale::default())?;
        config.timeout = Duration::from_secs(get_parsed_or(
            "VITRINE_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?);
        config.items_per_page = validate_page_size(get_parsed_or(
            "VITRINE_ITEMS_PER_PAGE",
            DEFAULT_ITEMS_PER_PAGE,
        )?)?;
        config.autocomplete_debounce = Duration::from_millis(get_parsed_or(
            "VITRINE_AUTOCOMPLETE_DEBOUNCE_MS",
            DEFAULT_DEBOUNCE_MS,
        )?);
        config.menu_ttl = Duration::from_secs(get_parsed_or(
            "VITRINE_MENU_TTL_SECS",
            DEFAULT_MENU_TTL_SECS,
        )?);
        config.state_dir = get_optional_env("VITRINE_STATE_DIR").map(PathBuf::from);

        Ok(config)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Relative endpoint paths only join correctly onto a base ending in `/`.
fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    url
}

fn validate_page_size(size: u32) -> Result<u32, ConfigError> {
    if size == 0 || size > MAX_ITEMS_PER_PAGE {
        return Err(ConfigError::InvalidEnvVar(
            "VITRINE_ITEMS_PER_PAGE".to_string(),
            format!("must be between 1 and {MAX_ITEMS_PER_PAGE}"),
        ));
    }
    Ok(size)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an optional environment variable, falling back to `default`.
fn get_parsed_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
