//! Vitrine storefront client.
//!
//! An authenticated REST client that transparently refreshes expired access
//! tokens, plus observable client-side stores for the session, cart, catalog,
//! navigation menu, blog and UI preferences. Start from [`Storefront`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod persist;
pub mod state;
pub mod stores;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use api::{ApiClient, ApiError};
pub use config::{ClientConfig, ConfigError};
pub use error::{StoreError, StorefrontError};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use state::Storefront;
