//! Subcommand implementations.

pub mod account;
pub mod blog;
pub mod shop;

use thiserror::Error;
use vitrine_storefront::{ApiError, ConfigError, StoreError, StorefrontError};

/// Errors that end a CLI invocation.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Storefront(#[from] StorefrontError),

    #[error("{}", .0.user_message())]
    Store(#[from] StoreError),

    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),

    /// A `--filter` argument that is not `field=id`.
    #[error("Invalid filter '{0}', expected field=value_id")]
    InvalidFilter(String),

    #[error("Not signed in. Run `vitrine login` first")]
    NotSignedIn,
}
