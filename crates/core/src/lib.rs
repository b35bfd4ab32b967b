//! Vitrine Core - Shared types library.
//!
//! This crate provides the value types used across the Vitrine components:
//! - `storefront` - API client and client-side state stores
//! - `cli` - Terminal front end for the storefront client
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients. Everything here can be constructed and checked without a network.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, credentials, prices, locales and publication status

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
