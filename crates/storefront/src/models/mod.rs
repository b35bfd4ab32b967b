//! Request and response models for the storefront REST API.
//!
//! These mirror the backend's JSON; conversion into view state happens in the
//! stores.

pub mod blog;
pub mod cart;
pub mod catalog;
pub mod menu;
pub mod session;
pub mod user;

pub use blog::{Media, Post, PostInput, PostInputError, PostPage};
pub use cart::{CartCount, CartItem, CartResponse, CartUpdate};
pub use catalog::{CatalogPage, CatalogQuery, FilterGroup, FilterValue, Product};
pub use menu::{Category, Menu, MenuItem};
pub use session::{AuthResponse, TokenPair};
pub use user::{ProfileUpdate, User};
