//! Integration tests for the Vitrine storefront client.
//!
//! Each test drives a full [`Storefront`] over a
//! [`ScriptedTransport`], so no backend is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vitrine-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `refresh` - concurrent `401`s and token refresh de-duplication
//! - `cart` - optimistic toggles, rollback and cart invariants
//! - `catalog` - pagination and filter resets
//! - `session` - startup, restarts and sign-out

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use vitrine_storefront::api::Transport;
use vitrine_storefront::models::TokenPair;
use vitrine_storefront::persist::{MemoryStorage, StateStorage};
use vitrine_storefront::testing::{self, ScriptedTransport};
use vitrine_storefront::{ClientConfig, Storefront};

pub use vitrine_storefront::testing::{product_json, user_json};

const BASE_URL: &str = "https://shop.example.com/api/";

/// A storefront over a scripted backend and in-memory persistence.
pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub storage: Arc<dyn StateStorage>,
    pub app: Storefront,
}

impl Harness {
    /// A fresh, signed-out storefront.
    #[must_use]
    pub fn new() -> Self {
        let transport = Arc::new(ScriptedTransport::new());
        let storage: Arc<dyn StateStorage> = Arc::new(MemoryStorage::new());
        let app = build(&transport, &storage);
        Self {
            transport,
            storage,
            app,
        }
    }

    /// A storefront whose session holds access token `T1` and refresh token
    /// `R1` for [`testing::sample_user`], as if signed in earlier.
    pub async fn with_session() -> Self {
        let harness = Self::new();
        harness
            .app
            .api()
            .session()
            .establish(
                TokenPair {
                    access_token: SecretString::from("T1"),
                    refresh_token: Some(SecretString::from("R1")),
                },
                testing::sample_user(),
            )
            .await;
        harness
    }

    /// A second storefront sharing this one's backend and storage, as after
    /// an application restart.
    #[must_use]
    pub fn restart(&self) -> Storefront {
        build(&self.transport, &self.storage)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

fn build(transport: &Arc<ScriptedTransport>, storage: &Arc<dyn StateStorage>) -> Storefront {
    let config = ClientConfig::new(Url::parse(BASE_URL).expect("static URL parses"));
    Storefront::with_parts(
        config,
        Arc::clone(transport) as Arc<dyn Transport>,
        Arc::clone(storage),
    )
}

/// Cart body with one line per product id.
#[must_use]
pub fn cart_json(ids: &[i64]) -> Value {
    let items: Vec<Value> = ids.iter().map(|&id| json!({"product": product_json(id)})).collect();
    json!({"items": items, "count": ids.len()})
}

/// Catalog page body with products `ids` out of `total`.
#[must_use]
pub fn catalog_json(ids: &[i64], total: u64) -> Value {
    let items: Vec<Value> = ids.iter().map(|&id| product_json(id)).collect();
    json!({"items": items, "total": total, "filters": []})
}
