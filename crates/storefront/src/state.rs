//! The storefront context: one API client and the stores built on it.

use std::sync::Arc;

use tracing::info;

use crate::api::{ApiClient, HttpTransport, Transport};
use crate::config::ClientConfig;
use crate::error::StorefrontError;
use crate::notify::Notifier;
use crate::persist::{FileStorage, MemoryStorage, StateStorage};
use crate::stores::{
    AuthStatus, AuthStore, Autocomplete, BlogStore, CartStore, CatalogStore, MenuStore,
    Preferences, PreferencesStore, SessionHandle,
};

/// Everything a storefront UI talks to.
///
/// Cheaply cloneable via `Arc`; every clone shares the same session, stores
/// and notification channel.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: ClientConfig,
    api: ApiClient,
    notifier: Notifier,
    auth: AuthStore,
    cart: CartStore,
    catalog: CatalogStore,
    menu: MenuStore,
    blog: BlogStore,
    preferences: PreferencesStore,
}

impl Storefront {
    /// Build the context over HTTP.
    ///
    /// State is persisted under `config.state_dir` when set, otherwise kept
    /// in memory for the lifetime of the process.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, StorefrontError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        let storage: Arc<dyn StateStorage> = match &config.state_dir {
            Some(dir) => Arc::new(FileStorage::new(dir)),
            None => Arc::new(MemoryStorage::new()),
        };
        Ok(Self::with_parts(config, transport, storage))
    }

    /// Build the context over an arbitrary transport and storage.
    #[must_use]
    pub fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn StateStorage>,
    ) -> Self {
        let session = SessionHandle::new(Arc::clone(&storage));
        let api = ApiClient::new(transport, session, config.locale.clone());
        let notifier = Notifier::new();

        let cart = CartStore::new(api.clone(), notifier.clone());
        let auth = AuthStore::new(api.clone(), cart.clone(), notifier.clone());
        let catalog = CatalogStore::new(
            api.clone(),
            notifier.clone(),
            Arc::clone(&storage),
            config.items_per_page,
        );
        let menu = MenuStore::new(api.clone(), Arc::clone(&storage), config.menu_ttl);
        let blog = BlogStore::new(api.clone(), notifier.clone(), config.items_per_page);
        let preferences = PreferencesStore::new(
            api.clone(),
            menu.clone(),
            catalog.clone(),
            storage,
            Preferences {
                locale: config.locale.clone(),
                items_per_page: config.items_per_page,
            },
        );

        Self {
            inner: Arc::new(StorefrontInner {
                config,
                api,
                notifier,
                auth,
                cart,
                catalog,
                menu,
                blog,
                preferences,
            }),
        }
    }

    /// Restore persisted state and validate the persisted session.
    ///
    /// Preferences are applied first so the session check already uses the
    /// stored locale.
    pub async fn start(&self) -> AuthStatus {
        self.inner.preferences.hydrate().await;
        self.inner.catalog.hydrate().await;
        let status = self.inner.auth.initialize().await;
        info!(?status, locale = %self.inner.api.locale(), "Storefront started");
        status
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Channel of user-facing notices raised by every store.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    #[must_use]
    pub fn auth(&self) -> &AuthStore {
        &self.inner.auth
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogStore {
        &self.inner.catalog
    }

    #[must_use]
    pub fn menu(&self) -> &MenuStore {
        &self.inner.menu
    }

    #[must_use]
    pub fn blog(&self) -> &BlogStore {
        &self.inner.blog
    }

    #[must_use]
    pub fn preferences(&self) -> &PreferencesStore {
        &self.inner.preferences
    }

    /// A fresh suggestion source for one filter field.
    #[must_use]
    pub fn autocomplete(&self, field: &str) -> Autocomplete {
        Autocomplete::new(
            self.inner.api.clone(),
            field,
            self.inner.config.autocomplete_debounce,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::api::Method;
    use crate::testing::{self, ScriptedTransport};

    fn storefront(transport: &Arc<ScriptedTransport>, storage: &Arc<dyn StateStorage>) -> Storefront {
        let config = ClientConfig::new(Url::parse("https://api.example.com/v1").unwrap());
        Storefront::with_parts(
            config,
            Arc::clone(transport) as Arc<dyn Transport>,
            Arc::clone(storage),
        )
    }

    #[tokio::test]
    async fn test_start_without_session_is_anonymous() {
        let transport = Arc::new(ScriptedTransport::new());
        let storage: Arc<dyn StateStorage> = Arc::new(MemoryStorage::new());
        let app = storefront(&transport, &storage);

        assert_eq!(app.start().await, AuthStatus::Anonymous);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_session_survives_restart() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply(
            Method::Post,
            "auth/login",
            StatusCode::OK,
            json!({"access_token": "T1", "refresh_token": "R1", "user": testing::user_json()}),
        );
        transport.reply(Method::Get, "user", StatusCode::OK, testing::user_json());
        transport.reply(Method::Get, "cart", StatusCode::OK, json!({"items": [], "count": 0}));
        let storage: Arc<dyn StateStorage> = Arc::new(MemoryStorage::new());

        let first = storefront(&transport, &storage);
        first.auth().login("ann@example.com", "hunter22").await.unwrap();

        let second = storefront(&transport, &storage);
        assert_eq!(second.start().await, AuthStatus::Authenticated);
        assert_eq!(second.auth().user().unwrap().name, "Ann");
        assert_eq!(
            transport.bearers_for(Method::Get, "user"),
            vec![Some("T1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_stores_share_one_session() {
        let transport = Arc::new(ScriptedTransport::new());
        let storage: Arc<dyn StateStorage> = Arc::new(MemoryStorage::new());
        let app = storefront(&transport, &storage);

        assert!(!app.cart().is_in_cart(vitrine_core::ProductId::new(1)));
        app.api().session().clear().await;
        assert_eq!(app.auth().status(), AuthStatus::Anonymous);
        assert_eq!(app.autocomplete("brand").field(), "brand");
    }
}
