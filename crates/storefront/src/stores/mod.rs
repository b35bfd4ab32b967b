//! Client-side stores.
//!
//! Each store owns one slice of view state behind a `tokio::sync::watch`
//! channel: actions are `async`, mutate the state, and consumers read
//! snapshots or subscribe to changes. Stores are plain values owned by a
//! [`Storefront`](crate::Storefront) context; nothing here is global.

pub mod auth;
pub mod autocomplete;
pub mod blog;
pub mod cart;
pub mod catalog;
pub mod menu;
pub mod optimistic;
pub mod preferences;
pub mod session;

use std::sync::atomic::{AtomicBool, Ordering};

pub use auth::{AuthState, AuthStatus, AuthStore};
pub use autocomplete::Autocomplete;
pub use blog::{BlogState, BlogStore};
pub use cart::{CartState, CartStore};
pub use catalog::{CatalogState, CatalogStore};
pub use menu::MenuStore;
pub use optimistic::{Speculation, speculate};
pub use preferences::{Preferences, PreferencesStore};
pub use session::{Session, SessionHandle};

/// Holds an in-flight flag for its lifetime.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    /// Set the flag, or `None` if it was already set.
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_is_exclusive_until_dropped() {
        let flag = AtomicBool::new(false);
        let first = InFlight::acquire(&flag);
        assert!(first.is_some());
        assert!(InFlight::acquire(&flag).is_none());
        drop(first);
        assert!(InFlight::acquire(&flag).is_some());
    }
}
