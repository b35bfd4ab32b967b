//! UI preferences persisted under `main-store`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, instrument};
use vitrine_core::Locale;

use super::catalog::CatalogStore;
use super::menu::MenuStore;
use crate::api::ApiClient;
use crate::error::StoreError;
use crate::persist::{Persisted, StateStorage, keys};

/// User-chosen settings that survive restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub locale: Locale,
    pub items_per_page: u32,
}

/// Owner of [`Preferences`]; applies changes to the client and stores that
/// depend on them.
#[derive(Clone)]
pub struct PreferencesStore {
    inner: Arc<PreferencesInner>,
}

struct PreferencesInner {
    api: ApiClient,
    menu: MenuStore,
    catalog: CatalogStore,
    state: watch::Sender<Preferences>,
    persisted: Persisted<Preferences>,
}

impl PreferencesStore {
    #[must_use]
    pub fn new(
        api: ApiClient,
        menu: MenuStore,
        catalog: CatalogStore,
        storage: Arc<dyn StateStorage>,
        defaults: Preferences,
    ) -> Self {
        let (state, _) = watch::channel(defaults);
        Self {
            inner: Arc::new(PreferencesInner {
                api,
                menu,
                catalog,
                state,
                persisted: Persisted::new(storage, keys::MAIN_STORE),
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Preferences {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Preferences> {
        self.inner.state.subscribe()
    }

    /// Apply persisted preferences, if any, without fetching anything.
    pub async fn hydrate(&self) {
        let Some(stored) = self.inner.persisted.load().await else {
            return;
        };
        debug!(locale = %stored.locale, items_per_page = stored.items_per_page, "Preferences restored");
        self.inner.api.set_locale(stored.locale.clone());
        self.inner.catalog.preset_items_per_page(stored.items_per_page);
        self.inner.state.send_replace(stored);
    }

    /// Switch the locale for all further requests.
    #[instrument(skip(self))]
    pub async fn set_locale(&self, locale: Locale) {
        self.inner.api.set_locale(locale.clone());
        self.inner.menu.invalidate();
        self.inner.state.send_modify(|p| p.locale = locale);
        self.persist().await;
    }

    /// Change the catalog page size and reload the first page.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for an out-of-range size, or the
    /// API error of the reload. The preference is kept either way once valid.
    #[instrument(skip(self))]
    pub async fn set_items_per_page(&self, items_per_page: u32) -> Result<(), StoreError> {
        let reload = self.inner.catalog.set_items_per_page(items_per_page).await;
        if matches!(reload, Err(StoreError::Validation(_))) {
            return reload;
        }
        self.inner
            .state
            .send_modify(|p| p.items_per_page = items_per_page);
        self.persist().await;
        reload
    }

    async fn persist(&self) {
        let snapshot = self.snapshot();
        self.inner.persisted.save(&snapshot).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use reqwest::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::api::Method;
    use crate::notify::Notifier;
    use crate::persist::MemoryStorage;
    use crate::testing::{self, ScriptedTransport};

    fn store(transport: &Arc<ScriptedTransport>, storage: &Arc<dyn StateStorage>) -> PreferencesStore {
        let api = testing::anonymous_client(transport);
        let menu = MenuStore::new(api.clone(), Arc::clone(storage), Duration::from_secs(300));
        let catalog = CatalogStore::new(api.clone(), Notifier::new(), Arc::clone(storage), 12);
        PreferencesStore::new(
            api,
            menu,
            catalog,
            Arc::clone(storage),
            Preferences {
                locale: Locale::default(),
                items_per_page: 12,
            },
        )
    }

    #[tokio::test]
    async fn test_preferences_survive_restart() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply(Method::Get, "catalog", StatusCode::OK, json!({"items": [], "total": 0}));
        let storage: Arc<dyn StateStorage> = Arc::new(MemoryStorage::new());

        let first = store(&transport, &storage);
        first.set_locale("uk-UA".parse().unwrap()).await;
        first.set_items_per_page(24).await.unwrap();

        let second = store(&transport, &storage);
        second.hydrate().await;
        let prefs = second.snapshot();
        assert_eq!(prefs.locale.as_str(), "uk-UA");
        assert_eq!(prefs.items_per_page, 24);
        assert_eq!(second.inner.api.locale().as_str(), "uk-UA");
        assert_eq!(second.inner.catalog.snapshot().query.items_per_page, 24);
    }

    #[tokio::test]
    async fn test_invalid_page_size_is_not_saved() {
        let transport = Arc::new(ScriptedTransport::new());
        let storage: Arc<dyn StateStorage> = Arc::new(MemoryStorage::new());
        let prefs = store(&transport, &storage);

        assert!(prefs.set_items_per_page(500).await.is_err());
        assert_eq!(prefs.snapshot().items_per_page, 12);
        assert!(transport.calls().is_empty());
    }
}
