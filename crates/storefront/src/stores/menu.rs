//! Navigation menu and category tree.
//!
//! Served from an in-memory cache keyed by locale. The last menu fetched is
//! also persisted under `menu-store` and used when the backend is unreachable.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::api::ApiClient;
use crate::error::StoreError;
use crate::models::Menu;
use crate::persist::{Persisted, StateStorage, keys};

const CACHE_CAPACITY: u64 = 16;

#[derive(Debug, Serialize, Deserialize)]
struct StoredMenu {
    locale: String,
    menu: Menu,
}

/// Cached access to the navigation menu.
#[derive(Clone)]
pub struct MenuStore {
    inner: Arc<MenuInner>,
}

struct MenuInner {
    api: ApiClient,
    cache: Cache<String, Arc<Menu>>,
    persisted: Persisted<StoredMenu>,
}

impl MenuStore {
    #[must_use]
    pub fn new(api: ApiClient, storage: Arc<dyn StateStorage>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();

        Self {
            inner: Arc::new(MenuInner {
                api,
                cache,
                persisted: Persisted::new(storage, keys::MENU_STORE),
            }),
        }
    }

    /// Menu for the client's current locale.
    ///
    /// # Errors
    ///
    /// Returns the API error when the request fails and no persisted menu
    /// for this locale exists.
    #[instrument(skip(self))]
    pub async fn menu(&self) -> Result<Menu, StoreError> {
        let locale = self.inner.api.locale().to_string();

        if let Some(menu) = self.inner.cache.get(&locale).await {
            debug!(%locale, "Cache hit for menu");
            return Ok(menu.as_ref().clone());
        }

        match self.inner.api.get_menu().await {
            Ok(menu) => {
                self.inner
                    .cache
                    .insert(locale.clone(), Arc::new(menu.clone()))
                    .await;
                self.inner
                    .persisted
                    .save(&StoredMenu {
                        locale,
                        menu: menu.clone(),
                    })
                    .await;
                Ok(menu)
            }
            Err(e) => {
                if let Some(stored) = self.inner.persisted.load().await
                    && stored.locale == locale
                {
                    warn!(error = %e, "Menu request failed, serving persisted copy");
                    return Ok(stored.menu);
                }
                Err(e.into())
            }
        }
    }

    /// Forget cached menus, e.g. after a locale change.
    pub fn invalidate(&self) {
        self.inner.cache.invalidate_all();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;
    use vitrine_core::Locale;

    use super::*;
    use crate::api::{ApiResponse, Method};
    use crate::persist::MemoryStorage;
    use crate::testing::{self, ScriptedTransport};

    fn menu_json() -> serde_json::Value {
        json!({
            "items": [{"title": "Shop", "url": "/shop", "children": [{"title": "New", "url": "/shop/new"}]}],
            "categories": [{"id": 1, "title": "Shoes"}]
        })
    }

    #[tokio::test]
    async fn test_second_call_is_cached() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply(Method::Get, "menu", StatusCode::OK, menu_json());
        let store = MenuStore::new(
            testing::anonymous_client(&transport),
            Arc::new(MemoryStorage::new()),
            Duration::from_secs(300),
        );

        let first = store.menu().await.unwrap();
        let second = store.menu().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.items[0].children.len(), 1);
        assert_eq!(transport.calls_to(Method::Get, "menu"), 1);

        store.invalidate();
        store.menu().await.unwrap();
        assert_eq!(transport.calls_to(Method::Get, "menu"), 2);
    }

    #[tokio::test]
    async fn test_falls_back_to_persisted_copy() {
        let storage: Arc<dyn StateStorage> = Arc::new(MemoryStorage::new());
        let online = Arc::new(ScriptedTransport::new());
        online.reply(Method::Get, "menu", StatusCode::OK, menu_json());
        MenuStore::new(testing::anonymous_client(&online), Arc::clone(&storage), Duration::from_secs(300))
            .menu()
            .await
            .unwrap();

        let offline = Arc::new(ScriptedTransport::new());
        offline.route(Method::Get, "menu", |_, _| Ok(ApiResponse::empty(StatusCode::BAD_GATEWAY)));
        let client = testing::anonymous_client(&offline);
        let store = MenuStore::new(client.clone(), storage, Duration::from_secs(300));
        assert_eq!(store.menu().await.unwrap().categories.len(), 1);

        client.set_locale("uk".parse::<Locale>().unwrap());
        store.invalidate();
        assert!(store.menu().await.is_err());
    }
}
