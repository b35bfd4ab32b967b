//! Authenticated client for the storefront REST API.
//!
//! Every request carries the session's access token as a bearer credential.
//! A `401` on a bearer request triggers one de-duplicated token refresh (see
//! [`refresh`]) after which the request is replayed once with the new token.
//! A replay is never intercepted again, so a second `401` is final.
//!
//! Endpoint functions are grouped by resource in submodules, all as
//! `impl ApiClient` blocks.

mod account;
mod blog;
mod cart;
mod catalog;
pub mod error;
pub mod refresh;
pub mod transport;

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument, warn};
use vitrine_core::Locale;

pub use error::{ApiError, TransportError};
pub use refresh::{RefreshGate, RefreshOutcome};
pub use transport::{
    ApiRequest, ApiResponse, AuthMode, Body, HttpTransport, Method, Outgoing, Transport, Upload,
};

use self::error::error_message;
use self::refresh::Ticket;
use crate::stores::session::SessionHandle;

/// Endpoint paths, relative to the configured base URL.
pub mod paths {
    use vitrine_core::{PostId, ProductId};

    pub const LOGIN: &str = "auth/login";
    pub const REGISTER: &str = "auth/register";
    pub const REFRESH: &str = "auth/refresh";
    pub const LOGOUT: &str = "auth/logout";
    pub const LOGOUT_ALL: &str = "auth/logout-all";
    pub const USER: &str = "user";
    pub const CART: &str = "cart";
    pub const CATALOG: &str = "catalog";
    pub const MENU: &str = "menu";
    pub const BLOG: &str = "blog";
    pub const MEDIA: &str = "media";

    #[must_use]
    pub fn cart_item(id: ProductId) -> String {
        format!("{CART}/{id}")
    }

    #[must_use]
    pub fn catalog_item(id: ProductId) -> String {
        format!("{CATALOG}/{id}")
    }

    #[must_use]
    pub fn autocomplete(field: &str) -> String {
        format!("autocomplete/{}", urlencoding::encode(field))
    }

    #[must_use]
    pub fn post_by_slug(slug: &str) -> String {
        format!("{BLOG}/{}", urlencoding::encode(slug))
    }

    #[must_use]
    pub fn post(id: PostId) -> String {
        format!("{BLOG}/{id}")
    }
}

/// Storefront API client.
///
/// Cheap to clone; all clones share the transport, the session and the
/// refresh state.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    transport: Arc<dyn Transport>,
    session: SessionHandle,
    locale: RwLock<Locale>,
    refresh: RefreshGate,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("locale", &self.locale())
            .field("authenticated", &self.inner.session.is_authenticated())
            .field("refreshing", &self.inner.refresh.is_refreshing())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client sending through `transport` on behalf of `session`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, session: SessionHandle, locale: Locale) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                transport,
                session,
                locale: RwLock::new(locale),
                refresh: RefreshGate::new(),
            }),
        }
    }

    /// The session whose tokens this client sends.
    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.inner.session
    }

    /// Locale sent as `Accept-Language`.
    #[must_use]
    pub fn locale(&self) -> Locale {
        self.inner
            .locale
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_locale(&self, locale: Locale) {
        *self
            .inner
            .locale
            .write()
            .unwrap_or_else(PoisonError::into_inner) = locale;
    }

    /// Whether a token refresh is in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.inner.refresh.is_refreshing()
    }

    /// Send `request` and decode a JSON response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the status is not a success
    /// (after at most one refresh-and-replay on `401`), or the body does not
    /// decode as `T`.
    #[instrument(skip(self, request), fields(method = ?request.method, path = %request.path))]
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.dispatch(&request).await?;
        decode(&request, response)
    }

    /// Send `request` once with no bearer token and no `401` recovery.
    ///
    /// The token exchange goes through here so that it can never trigger
    /// another refresh.
    async fn execute_direct<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.send(&request, None).await?;
        decode(&request, response)
    }

    /// Send `request`, ignoring any response body.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute), minus decoding.
    #[instrument(skip(self, request), fields(method = ?request.method, path = %request.path))]
    pub async fn execute_empty(&self, request: ApiRequest) -> Result<(), ApiError> {
        let response = self.dispatch(&request).await?;
        check_status(&request, response)?;
        Ok(())
    }

    // =========================================================================
    // Refresh coordination
    // =========================================================================

    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let token = self.bearer_for(request);
        let response = self.send(request, token.as_ref()).await?;

        if response.status != StatusCode::UNAUTHORIZED || request.auth == AuthMode::Anonymous {
            return Ok(response);
        }

        self.recover(token.as_ref()).await?;

        debug!(path = %request.path, "Replaying request after token refresh");
        let token = self.bearer_for(request);
        Ok(self.send(request, token.as_ref()).await?)
    }

    fn bearer_for(&self, request: &ApiRequest) -> Option<SecretString> {
        match request.auth {
            AuthMode::Bearer => self.inner.session.access_token(),
            AuthMode::Anonymous => None,
        }
    }

    async fn send(
        &self,
        request: &ApiRequest,
        token: Option<&SecretString>,
    ) -> Result<ApiResponse, TransportError> {
        let locale = self.locale();
        self.inner
            .transport
            .send(Outgoing {
                request,
                bearer: token.map(|t| t.expose_secret()),
                locale: &locale,
            })
            .await
    }

    /// Make the session usable again after a `401` for `used`.
    ///
    /// Returns `Ok` when the request should be replayed.
    async fn recover(&self, used: Option<&SecretString>) -> Result<(), ApiError> {
        let used = used.map(|t| t.expose_secret());
        if let Some(decision) = self.already_recovered(used) {
            return decision;
        }

        match self.inner.refresh.enter() {
            Ticket::Follower(outcome) => {
                debug!("Waiting for in-flight token refresh");
                match outcome.await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(message)) => Err(ApiError::RefreshFailed(message)),
                    Err(_) => Err(ApiError::RefreshFailed("refresh abandoned".to_string())),
                }
            }
            Ticket::Leader(guard) => {
                // A cycle may have finished between the check above and enter()
                if let Some(decision) = self.already_recovered(used) {
                    guard.finish(&Ok(()));
                    return decision;
                }
                let result = self.run_refresh().await;
                let outcome = match &result {
                    Ok(()) => Ok(()),
                    Err(e) => Err(e.to_string()),
                };
                guard.finish(&outcome);
                result
            }
        }
    }

    /// Outcome of a refresh that already replaced the token `used`, if any.
    fn already_recovered(&self, used: Option<&str>) -> Option<Result<(), ApiError>> {
        if self.inner.session.is_current_token(used) {
            return None;
        }
        if self.inner.session.access_token().is_some() {
            debug!("Access token already rotated, replaying");
            Some(Ok(()))
        } else {
            Some(Err(ApiError::Unauthorized))
        }
    }

    /// Exchange the refresh token. On success the session holds the new pair
    /// before any waiter is released; on failure the session is cleared first.
    async fn run_refresh(&self) -> Result<(), ApiError> {
        let session = &self.inner.session;
        let Some(refresh_token) = session.refresh_token() else {
            warn!("Access token rejected and no refresh token available");
            session.clear().await;
            return Err(ApiError::Unauthorized);
        };

        match self.refresh(&refresh_token).await {
            Ok(tokens) => {
                session.rotate(tokens).await;
                debug!("Access token refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, clearing session");
                session.clear().await;
                Err(ApiError::RefreshFailed(e.to_string()))
            }
        }
    }
}

fn decode<T: DeserializeOwned>(request: &ApiRequest, response: ApiResponse) -> Result<T, ApiError> {
    let response = check_status(request, response)?;

    serde_json::from_slice(&response.body).map_err(|e| {
        error!(
            error = %e,
            body = %String::from_utf8_lossy(&response.body).chars().take(500).collect::<String>(),
            "Failed to parse API response"
        );
        ApiError::Parse(e)
    })
}

/// Map non-success statuses onto [`ApiError`].
fn check_status(request: &ApiRequest, response: ApiResponse) -> Result<ApiResponse, ApiError> {
    let status = response.status;
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound(request.path.clone())),
        StatusCode::TOO_MANY_REQUESTS => Err(ApiError::RateLimited(response.retry_after.unwrap_or(1))),
        _ => {
            error!(
                status = %status,
                body = %String::from_utf8_lossy(&response.body).chars().take(500).collect::<String>(),
                "API returned non-success status"
            );
            Err(ApiError::Status {
                status,
                message: error_message(&response.body),
            })
        }
    }
}
