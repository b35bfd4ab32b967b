//! Core types for Vitrine.
//!
//! Type-safe wrappers for the domain concepts shared by the storefront client
//! and its front ends.

pub mod credentials;
pub mod id;
pub mod locale;
pub mod price;
pub mod status;

pub use credentials::{Credentials, CredentialsError, Email, EmailError, Password, PasswordError, Registration};
pub use id::*;
pub use locale::{Locale, LocaleError};
pub use price::{CurrencyCode, Price};
pub use status::PostStatus;
