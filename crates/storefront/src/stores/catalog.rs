//! Catalog store: search, filters and infinite-scroll pagination.
//!
//! Changing the search term, a filter or the page size resets to page 1 and
//! replaces `items`; [`CatalogStore::load_more`] requests the next page and
//! appends. Every request takes a generation number and a response is only
//! applied if no newer request has started since.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};
use vitrine_core::{FilterValueId, ProductId};

use crate::api::ApiClient;
use crate::error::StoreError;
use crate::models::{CatalogQuery, FilterGroup, Product};
use crate::notify::Notifier;
use crate::persist::{Persisted, StateStorage, keys};

const MAX_ITEMS_PER_PAGE: u32 = 100;

/// Observable catalog state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogState {
    /// Query of the latest request.
    pub query: CatalogQuery,
    /// Products of pages `1..=query.page`.
    pub items: Vec<Product>,
    pub total: u64,
    pub has_more: bool,
    /// Filter metadata from the latest response (or the persisted copy).
    pub filter_groups: Vec<FilterGroup>,
    /// Product opened with [`CatalogStore::load_item`].
    pub current: Option<Product>,
    pub loading: bool,
    pub last_error: Option<String>,
}

impl CatalogState {
    fn new(items_per_page: u32) -> Self {
        Self {
            query: CatalogQuery::new(items_per_page),
            items: Vec::new(),
            total: 0,
            has_more: false,
            filter_groups: Vec::new(),
            current: None,
            loading: false,
            last_error: None,
        }
    }

    /// Selected values of one filter field.
    #[must_use]
    pub fn selected(&self, field: &str) -> BTreeSet<FilterValueId> {
        self.query.filters.get(field).cloned().unwrap_or_default()
    }
}

/// What the catalog keeps under `data-store`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogSnapshot {
    #[serde(default)]
    filter_groups: Vec<FilterGroup>,
}

/// Product listing state.
#[derive(Clone)]
pub struct CatalogStore {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    api: ApiClient,
    notifier: Notifier,
    state: watch::Sender<CatalogState>,
    generation: AtomicU64,
    in_flight: Mutex<Option<CatalogQuery>>,
    persisted: Persisted<CatalogSnapshot>,
}

/// Marks a query as in flight until dropped.
struct QueryFlight<'a> {
    slot: &'a Mutex<Option<CatalogQuery>>,
    query: CatalogQuery,
}

impl<'a> QueryFlight<'a> {
    fn start(slot: &'a Mutex<Option<CatalogQuery>>, query: &CatalogQuery) -> Option<Self> {
        let mut current = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref() == Some(query) {
            return None;
        }
        *current = Some(query.clone());
        Some(Self {
            slot,
            query: query.clone(),
        })
    }
}

impl Drop for QueryFlight<'_> {
    fn drop(&mut self) {
        let mut current = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref() == Some(&self.query) {
            *current = None;
        }
    }
}

impl CatalogStore {
    #[must_use]
    pub fn new(
        api: ApiClient,
        notifier: Notifier,
        storage: Arc<dyn StateStorage>,
        items_per_page: u32,
    ) -> Self {
        let (state, _) = watch::channel(CatalogState::new(items_per_page));
        Self {
            inner: Arc::new(CatalogInner {
                api,
                notifier,
                state,
                generation: AtomicU64::new(0),
                in_flight: Mutex::new(None),
                persisted: Persisted::new(storage, keys::DATA_STORE),
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> CatalogState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.inner.state.subscribe()
    }

    /// Show the persisted filter metadata until the first response arrives.
    pub async fn hydrate(&self) {
        let Some(snapshot) = self.inner.persisted.load().await else {
            return;
        };
        self.inner.state.send_if_modified(|s| {
            if s.filter_groups.is_empty() && !snapshot.filter_groups.is_empty() {
                s.filter_groups = snapshot.filter_groups;
                true
            } else {
                false
            }
        });
    }

    /// Fetch page 1 of the current query.
    ///
    /// # Errors
    ///
    /// Returns the API error; it is also recorded in `last_error`.
    pub async fn refresh(&self) -> Result<(), StoreError> {
        self.reset_with(|_| ()).await
    }

    /// # Errors
    ///
    /// Returns the API error; it is also recorded in `last_error`.
    pub async fn set_search(&self, term: &str) -> Result<(), StoreError> {
        let term = term.trim().to_string();
        self.reset_with(move |q| q.search = term).await
    }

    /// Replace the selection of one filter field. An empty set removes it.
    ///
    /// # Errors
    ///
    /// Returns the API error; it is also recorded in `last_error`.
    pub async fn set_filter(
        &self,
        field: &str,
        values: BTreeSet<FilterValueId>,
    ) -> Result<(), StoreError> {
        let field = field.to_string();
        self.reset_with(move |q| {
            if values.is_empty() {
                q.filters.remove(&field);
            } else {
                q.filters.insert(field, values);
            }
        })
        .await
    }

    /// Select or deselect one filter value.
    ///
    /// # Errors
    ///
    /// Returns the API error; it is also recorded in `last_error`.
    pub async fn toggle_filter(&self, field: &str, value: FilterValueId) -> Result<(), StoreError> {
        let mut values = self.inner.state.borrow().selected(field);
        if !values.remove(&value) {
            values.insert(value);
        }
        self.set_filter(field, values).await
    }

    /// # Errors
    ///
    /// Returns the API error; it is also recorded in `last_error`.
    pub async fn clear_filters(&self) -> Result<(), StoreError> {
        self.reset_with(|q| q.filters.clear()).await
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for a size outside `1..=100`, or
    /// the API error.
    pub async fn set_items_per_page(&self, items_per_page: u32) -> Result<(), StoreError> {
        if items_per_page == 0 || items_per_page > MAX_ITEMS_PER_PAGE {
            return Err(StoreError::Validation(format!(
                "page size must be between 1 and {MAX_ITEMS_PER_PAGE}"
            )));
        }
        self.reset_with(move |q| q.items_per_page = items_per_page)
            .await
    }

    /// Use `items_per_page` for the next request without fetching now.
    /// Out-of-range sizes are ignored.
    pub fn preset_items_per_page(&self, items_per_page: u32) {
        if (1..=MAX_ITEMS_PER_PAGE).contains(&items_per_page) {
            self.inner
                .state
                .send_modify(|s| s.query.items_per_page = items_per_page);
        }
    }

    /// Append the next page.
    ///
    /// Returns `false` without a request when there is nothing more to load
    /// or a request is already running.
    ///
    /// # Errors
    ///
    /// Returns the API error; the page number is reverted.
    pub async fn load_more(&self) -> Result<bool, StoreError> {
        let query = {
            let state = self.inner.state.borrow();
            if !state.has_more || state.loading {
                return Ok(false);
            }
            let mut query = state.query.clone();
            query.page += 1;
            query
        };
        self.run(query).await.map(|()| true)
    }

    /// Load a single product into `current`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] with [`ApiError::NotFound`](crate::api::ApiError::NotFound)
    /// for an unknown id.
    #[instrument(skip(self))]
    pub async fn load_item(&self, id: ProductId) -> Result<Product, StoreError> {
        match self.inner.api.get_catalog_item(id).await {
            Ok(product) => {
                let current = product.clone();
                self.inner.state.send_modify(|s| {
                    s.current = Some(current);
                    s.last_error = None;
                });
                Ok(product)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load product");
                let message = e.user_message();
                self.inner.state.send_modify(|s| {
                    s.current = None;
                    s.last_error = Some(message.clone());
                });
                self.inner.notifier.error(message);
                Err(e.into())
            }
        }
    }

    async fn reset_with(&self, change: impl FnOnce(&mut CatalogQuery)) -> Result<(), StoreError> {
        let mut query = self.inner.state.borrow().query.clone();
        change(&mut query);
        query.page = 1;
        self.run(query).await
    }

    #[instrument(skip(self, query), fields(page = query.page, search = %query.search))]
    async fn run(&self, query: CatalogQuery) -> Result<(), StoreError> {
        let Some(_flight) = QueryFlight::start(&self.inner.in_flight, &query) else {
            debug!("Identical catalog query already in flight");
            return Ok(());
        };

        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let requested = query.clone();
        self.inner.state.send_modify(|s| {
            s.query = requested;
            s.loading = true;
        });

        let result = self.inner.api.list_catalog(&query).await;

        if self.inner.generation.load(Ordering::Acquire) != generation {
            debug!("Discarding superseded catalog response");
            return Ok(());
        }

        match result {
            Ok(page) => {
                let has_more = query.has_more(page.total);
                let filters = (!page.filters.is_empty()).then(|| page.filters.clone());
                let appended = page.items.len();
                self.inner.state.send_modify(|s| {
                    if query.page <= 1 {
                        s.items = page.items;
                    } else {
                        s.items.extend(page.items);
                    }
                    s.total = page.total;
                    s.has_more = has_more;
                    if let Some(groups) = &filters {
                        s.filter_groups.clone_from(groups);
                    }
                    s.loading = false;
                    s.last_error = None;
                });
                debug!(appended, total = page.total, has_more, "Catalog page applied");

                if let Some(filter_groups) = filters {
                    self.inner
                        .persisted
                        .save(&CatalogSnapshot { filter_groups })
                        .await;
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to load catalog page");
                let message = e.user_message();
                self.inner.state.send_modify(|s| {
                    if query.page > 1 {
                        s.query.page = query.page - 1;
                    }
                    s.loading = false;
                    s.last_error = Some(message.clone());
                });
                self.inner.notifier.error(message);
                Err(e.into())
            }
        }
    }
}
