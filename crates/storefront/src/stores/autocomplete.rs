//! Debounced autocomplete for one filterable field.
//!
//! Each call to [`Autocomplete::suggest`] waits out the debounce window. If a
//! newer call arrived in the meantime it resolves to `None` without sending
//! anything, so typing a word costs one request. Results are cached per term.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use crate::api::ApiClient;
use crate::error::StoreError;

/// Shorter terms get no suggestions and no request.
const MIN_TERM_CHARS: usize = 2;
const CACHE_CAPACITY: u64 = 500;
const CACHE_TTL: Duration = Duration::from_secs(60);

/// Suggestion source for one field (e.g. `brand`).
#[derive(Clone)]
pub struct Autocomplete {
    inner: Arc<AutocompleteInner>,
}

struct AutocompleteInner {
    api: ApiClient,
    field: String,
    debounce: Duration,
    generation: AtomicU64,
    cache: Cache<String, Arc<Vec<String>>>,
}

impl Autocomplete {
    #[must_use]
    pub fn new(api: ApiClient, field: impl Into<String>, debounce: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(AutocompleteInner {
                api,
                field: field.into(),
                debounce,
                generation: AtomicU64::new(0),
                cache,
            }),
        }
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.inner.field
    }

    /// Suggestions for `term`, or `None` if a newer call superseded this one.
    ///
    /// # Errors
    ///
    /// Returns the API error of the request, if one was sent.
    #[instrument(skip(self), fields(field = %self.inner.field))]
    pub async fn suggest(&self, term: &str) -> Result<Option<Vec<String>>, StoreError> {
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let term = term.trim().to_lowercase();
        if term.chars().count() < MIN_TERM_CHARS {
            return Ok(Some(Vec::new()));
        }

        if let Some(cached) = self.inner.cache.get(&term).await {
            debug!("Cache hit for suggestions");
            return Ok(Some(cached.as_ref().clone()));
        }

        tokio::time::sleep(self.inner.debounce).await;
        if !self.is_latest(generation) {
            debug!("Superseded during debounce");
            return Ok(None);
        }

        let suggestions = self.inner.api.autocomplete(&self.inner.field, &term).await?;
        self.inner
            .cache
            .insert(term, Arc::new(suggestions.clone()))
            .await;

        if self.is_latest(generation) {
            Ok(Some(suggestions))
        } else {
            Ok(None)
        }
    }

    fn is_latest(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::Acquire) == generation
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::api::{ApiResponse, Method};
    use crate::testing::{self, ScriptedTransport};

    fn suggestions_route(transport: &ScriptedTransport) {
        transport.route(Method::Get, "autocomplete/brand", |request, _| {
            let q = ScriptedTransport::query_param(request, "q").unwrap();
            Ok(ApiResponse::json(
                StatusCode::OK,
                &json!([format!("{q} one"), format!("{q} two")]),
            ))
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_calls_send_nothing() {
        let transport = Arc::new(ScriptedTransport::new());
        suggestions_route(&transport);
        let autocomplete = Autocomplete::new(
            testing::anonymous_client(&transport),
            "brand",
            Duration::from_millis(300),
        );

        let (first, second, third) = tokio::join!(
            autocomplete.suggest("ac"),
            autocomplete.suggest("acm"),
            autocomplete.suggest("acme"),
        );
        assert_eq!(first.unwrap(), None);
        assert_eq!(second.unwrap(), None);
        assert_eq!(third.unwrap().unwrap(), vec!["acme one", "acme two"]);
        assert_eq!(transport.calls_to(Method::Get, "autocomplete/brand"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_term_is_served_from_cache() {
        let transport = Arc::new(ScriptedTransport::new());
        suggestions_route(&transport);
        let autocomplete = Autocomplete::new(
            testing::anonymous_client(&transport),
            "brand",
            Duration::from_millis(300),
        );

        autocomplete.suggest("Acme").await.unwrap();
        let again = autocomplete.suggest("acme ").await.unwrap().unwrap();
        assert_eq!(again.len(), 2);
        assert_eq!(transport.calls_to(Method::Get, "autocomplete/brand"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_terms_skip_the_request() {
        let transport = Arc::new(ScriptedTransport::new());
        let autocomplete = Autocomplete::new(
            testing::anonymous_client(&transport),
            "brand",
            Duration::from_millis(300),
        );
        assert_eq!(autocomplete.suggest("a").await.unwrap(), Some(Vec::new()));
        assert!(transport.calls().is_empty());
    }
}
