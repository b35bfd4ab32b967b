//! Cart store.
//!
//! Keeps the authoritative cart lines next to a set of product ids for O(1)
//! membership checks. Adding and removing update the id set optimistically;
//! when the request fails, membership of that product is reconciled back to
//! what the authoritative lines say.
//!
//! Only the latest local change to a product may settle it. A response for
//! an older change (the product was toggled again meanwhile, or the cart was
//! cleared on sign-out) is dropped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, instrument, warn};
use vitrine_core::ProductId;

use super::InFlight;
use super::optimistic::speculate;
use crate::api::{ApiClient, ApiError};
use crate::error::StoreError;
use crate::models::{CartItem, CartUpdate};
use crate::notify::Notifier;

/// A fetch that overlapped a local change is repeated this many times in total.
const FETCH_ATTEMPTS: usize = 2;

/// Observable cart state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// Lines as last confirmed by the server.
    pub items: Vec<CartItem>,
    /// Product ids in the cart, including optimistic changes.
    pub ids: HashSet<ProductId>,
    /// Badge count: distinct products.
    pub count: usize,
    pub loading: bool,
    pub last_error: Option<String>,
    /// Latest unsettled local change per product.
    pending: HashMap<ProductId, u64>,
}

/// One optimistic change to a product's membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Change {
    id: ProductId,
    ticket: u64,
}

impl CartState {
    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.ids.contains(&id)
    }

    /// Whether `ids` is exactly the projection of `items`.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.ids.len() == self.items.len()
            && self.items.iter().all(|item| self.ids.contains(&item.product_id()))
    }

    fn replace_items(&mut self, items: Vec<CartItem>, count: usize) {
        self.ids = items.iter().map(CartItem::product_id).collect();
        self.items = items;
        self.count = count;
    }

    /// Whether a local change to `id` is waiting for the server.
    #[must_use]
    pub fn is_pending(&self, id: ProductId) -> bool {
        self.pending.contains_key(&id)
    }

    fn mark_added(&mut self, id: ProductId) {
        if self.ids.insert(id) {
            self.count += 1;
        }
    }

    fn mark_removed(&mut self, id: ProductId) {
        if self.ids.remove(&id) {
            self.count = self.count.saturating_sub(1);
        }
    }

    fn begin_add(&mut self, change: Change) -> Change {
        self.pending.insert(change.id, change.ticket);
        self.mark_added(change.id);
        change
    }

    fn begin_remove(&mut self, change: Change) -> Change {
        self.pending.insert(change.id, change.ticket);
        self.mark_removed(change.id);
        change
    }

    /// Retire `change` if it is still the latest one for its product.
    fn settle(&mut self, change: Change) -> bool {
        if self.pending.get(&change.id) != Some(&change.ticket) {
            return false;
        }
        self.pending.remove(&change.id);
        true
    }

    /// Make membership of `id` match the confirmed lines again.
    fn reconcile(&mut self, id: ProductId) {
        let confirmed = self.items.iter().any(|item| item.product_id() == id);
        if confirmed {
            self.mark_added(id);
        } else {
            self.mark_removed(id);
        }
    }

    fn roll_back(&mut self, change: Change) {
        if self.settle(change) {
            self.reconcile(change.id);
        }
    }

    fn confirm_added(&mut self, change: Change, update: CartUpdate) -> bool {
        if !self.settle(change) {
            return false;
        }
        match self.items.iter_mut().find(|item| item.product_id() == change.id) {
            Some(existing) => *existing = update.item,
            None => self.items.push(update.item),
        }
        self.ids.insert(change.id);
        self.count = update.count;
        self.last_error = None;
        true
    }

    fn confirm_removed(&mut self, change: Change, count: usize) -> bool {
        if !self.settle(change) {
            return false;
        }
        self.items.retain(|item| item.product_id() != change.id);
        self.ids.remove(&change.id);
        self.count = count;
        self.last_error = None;
        true
    }
}

/// The signed-in user's cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    api: ApiClient,
    notifier: Notifier,
    state: watch::Sender<CartState>,
    fetching: AtomicBool,
    /// Bumped around every local change so fetches can tell they raced one.
    /// Also the source of change tickets.
    revision: AtomicU64,
}

impl CartStore {
    #[must_use]
    pub fn new(api: ApiClient, notifier: Notifier) -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self {
            inner: Arc::new(CartInner {
                api,
                notifier,
                state,
                fetching: AtomicBool::new(false),
                revision: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    /// Membership test against local state; never does I/O.
    #[must_use]
    pub fn is_in_cart(&self, id: ProductId) -> bool {
        self.inner.state.borrow().contains(id)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.state.borrow().count
    }

    /// Replace local state with the server's cart.
    ///
    /// A no-op while another fetch is running. A failure is recorded in
    /// `last_error` and local state is kept.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AuthRequired`] when signed out, or the API error.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) -> Result<(), StoreError> {
        if !self.inner.api.session().is_authenticated() {
            return Err(StoreError::AuthRequired);
        }
        let Some(_flight) = InFlight::acquire(&self.inner.fetching) else {
            debug!("Cart fetch already in flight");
            return Ok(());
        };

        self.inner.state.send_modify(|s| s.loading = true);
        for _ in 0..FETCH_ATTEMPTS {
            let revision = self.revision();
            let cart = match self.inner.api.get_cart().await {
                Ok(cart) => cart,
                Err(e) => {
                    warn!(error = %e, "Failed to fetch cart");
                    let message = e.user_message();
                    self.inner.state.send_modify(|s| {
                        s.loading = false;
                        s.last_error = Some(message);
                    });
                    return Err(e.into());
                }
            };

            if self.revision() == revision {
                let count = cart.count();
                self.inner.state.send_modify(|s| {
                    s.replace_items(cart.items, count);
                    s.loading = false;
                    s.last_error = None;
                });
                debug!(count, "Cart loaded");
                return Ok(());
            }
            debug!("Cart changed during fetch, fetching again");
        }

        warn!("Cart kept changing during fetch, keeping local state");
        self.inner.state.send_modify(|s| s.loading = false);
        Ok(())
    }

    /// Add a product. Already in the cart is an immediate success.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AuthRequired`] when signed out, or the API error
    /// after the optimistic change was rolled back.
    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, id: ProductId) -> Result<(), StoreError> {
        self.require_session()?;
        if self.is_in_cart(id) {
            debug!("Already in cart");
            return Ok(());
        }

        let change = self.change(id);
        let result = speculate(
            &self.inner.state,
            |s| s.begin_add(change),
            CartState::roll_back,
            self.inner.api.add_to_cart(id),
        )
        .await;
        self.bump();

        match result {
            Ok(update) => {
                if !self.confirm(|s| s.confirm_added(change, update)) {
                    debug!("Add confirmed after a newer change, ignoring");
                }
                Ok(())
            }
            Err(e) => Err(self.fail("Could not add to cart", e)),
        }
    }

    /// Remove a product. Not in the cart is an immediate success.
    ///
    /// The line is dropped from `items` only once the server confirms.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AuthRequired`] when signed out, or the API error
    /// after the optimistic change was rolled back.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, id: ProductId) -> Result<(), StoreError> {
        self.require_session()?;
        if !self.is_in_cart(id) {
            debug!("Not in cart");
            return Ok(());
        }

        let change = self.change(id);
        let result = speculate(
            &self.inner.state,
            |s| s.begin_remove(change),
            CartState::roll_back,
            self.inner.api.remove_from_cart(id),
        )
        .await;
        self.bump();

        match result {
            Ok(response) => {
                if !self.confirm(|s| s.confirm_removed(change, response.count)) {
                    debug!("Removal confirmed after a newer change, ignoring");
                }
                Ok(())
            }
            Err(e) => Err(self.fail("Could not remove from cart", e)),
        }
    }

    /// Add or remove depending on current membership.
    ///
    /// Returns whether the product is in the cart afterwards.
    ///
    /// # Errors
    ///
    /// Same as [`add_to_cart`](Self::add_to_cart) and
    /// [`remove_from_cart`](Self::remove_from_cart).
    pub async fn toggle_cart_item(&self, id: ProductId) -> Result<bool, StoreError> {
        self.require_session()?;
        if self.is_in_cart(id) {
            self.remove_from_cart(id).await.map(|()| false)
        } else {
            self.add_to_cart(id).await.map(|()| true)
        }
    }

    /// Drop all local cart state, including changes still in flight. Used
    /// when the session ends.
    pub fn clear_cart(&self) {
        self.bump();
        self.inner.state.send_replace(CartState::default());
        debug!("Cart cleared");
    }

    fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::Acquire)
    }

    fn bump(&self) -> u64 {
        self.inner.revision.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn change(&self, id: ProductId) -> Change {
        Change {
            id,
            ticket: self.bump(),
        }
    }

    /// Apply a confirmation; returns whether it was still current.
    fn confirm(&self, apply: impl FnOnce(&mut CartState) -> bool) -> bool {
        let mut applied = false;
        self.inner.state.send_if_modified(|s| {
            applied = apply(s);
            applied
        });
        applied
    }

    fn require_session(&self) -> Result<(), StoreError> {
        if self.inner.api.session().is_authenticated() {
            return Ok(());
        }
        self.inner.notifier.warning("Sign in to use the cart");
        Err(StoreError::AuthRequired)
    }

    fn fail(&self, action: &str, err: ApiError) -> StoreError {
        warn!(error = %err, "{action}, change rolled back");
        let message = err.user_message();
        self.inner
            .state
            .send_modify(|s| s.last_error = Some(message.clone()));
        self.inner.notifier.error(format!("{action}: {message}"));
        err.into()
    }
}
