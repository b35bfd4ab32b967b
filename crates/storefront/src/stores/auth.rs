//! Auth store: session lifecycle and the signed-in user's profile.
//!
//! `Uninitialized -> Initializing -> {Authenticated, Anonymous}`.
//! `Authenticated` is left only by logout, a failed token refresh or account
//! deletion; all of them clear the shared session, and the clear listener
//! registered here moves the state to `Anonymous` and empties the cart.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use vitrine_core::{Credentials, Registration};

use super::InFlight;
use super::cart::CartStore;
use super::session::SessionHandle;
use crate::api::{ApiClient, ApiError};
use crate::error::StoreError;
use crate::models::{AuthResponse, ProfileUpdate, User};
use crate::notify::Notifier;

/// Where the auth lifecycle stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthStatus {
    /// [`AuthStore::initialize`] has not run.
    #[default]
    Uninitialized,
    /// Checking a persisted session against the backend.
    Initializing,
    Authenticated,
    Anonymous,
}

/// Observable auth state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub status: AuthStatus,
    pub user: Option<User>,
    /// A login, registration or profile request is running.
    pub busy: bool,
    pub last_error: Option<String>,
}

impl AuthState {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.status, AuthStatus::Authenticated)
    }
}

#[derive(Clone)]
pub struct AuthStore {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    api: ApiClient,
    cart: CartStore,
    notifier: Notifier,
    state: watch::Sender<AuthState>,
    busy: AtomicBool,
    initializing: AtomicBool,
}

impl AuthInner {
    fn session(&self) -> &SessionHandle {
        self.api.session()
    }

    fn session_cleared(&self) {
        self.state.send_modify(|s| {
            s.status = AuthStatus::Anonymous;
            s.user = None;
        });
        self.cart.clear_cart();
    }
}

/// Marks the store busy until dropped.
struct Busy<'a> {
    _flight: InFlight<'a>,
    state: &'a watch::Sender<AuthState>,
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.busy = false);
    }
}

impl AuthStore {
    /// Create the store and hook it to session clears.
    #[must_use]
    pub fn new(api: ApiClient, cart: CartStore, notifier: Notifier) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        let inner = Arc::new(AuthInner {
            api,
            cart,
            notifier,
            state,
            busy: AtomicBool::new(false),
            initializing: AtomicBool::new(false),
        });

        let weak: Weak<AuthInner> = Arc::downgrade(&inner);
        inner.session().on_clear(move || {
            if let Some(inner) = weak.upgrade() {
                inner.session_cleared();
            }
        });

        Self { inner }
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn status(&self) -> AuthStatus {
        self.inner.state.borrow().status
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    /// Validate a persisted session by loading the user.
    ///
    /// An expired access token is refreshed once by the API client. Any
    /// failure leaves the store `Anonymous` with the stale session cleared.
    /// A call made while another is running waits for that one's outcome.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> AuthStatus {
        let Some(_flight) = InFlight::acquire(&self.inner.initializing) else {
            debug!("Initialization already in flight, waiting for it");
            return self.settled_status().await;
        };

        self.inner
            .state
            .send_modify(|s| s.status = AuthStatus::Initializing);

        if !self.inner.session().restore().await {
            debug!("No persisted session");
            self.inner
                .state
                .send_modify(|s| s.status = AuthStatus::Anonymous);
            return AuthStatus::Anonymous;
        }

        match self.inner.api.get_user().await {
            Ok(user) => {
                self.inner.session().set_user(user.clone()).await;
                self.authenticated(user);
                self.sync_cart().await;
                // The cart sync may have ended the session
                self.status()
            }
            Err(e) => {
                warn!(error = %e, "Persisted session rejected, continuing anonymously");
                self.inner.session().clear().await;
                self.inner
                    .state
                    .send_modify(|s| s.status = AuthStatus::Anonymous);
                AuthStatus::Anonymous
            }
        }
    }

    /// Sign in with email and password, then load the cart.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for malformed input (no request is
    /// sent), [`StoreError::Busy`] while another auth request runs, or the API
    /// error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, StoreError> {
        let credentials = Credentials::new(email, password).map_err(|e| self.reject(e.into()))?;
        let _busy = self.begin()?;

        match self.inner.api.login(&credentials).await {
            Ok(response) => Ok(self.signed_in(response).await),
            Err(ApiError::Unauthorized) => {
                let message = "Invalid email or password".to_string();
                self.record_error(&message);
                self.inner.notifier.error(message);
                Err(ApiError::Unauthorized.into())
            }
            Err(e) => Err(self.fail("Sign in failed", e)),
        }
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Same as [`login`](Self::login).
    #[instrument(skip(self, password, confirmation))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<User, StoreError> {
        let registration = Registration::new(name, email, password, confirmation)
            .map_err(|e| self.reject(e.into()))?;
        let _busy = self.begin()?;

        match self.inner.api.register(&registration).await {
            Ok(response) => {
                let user = self.signed_in(response).await;
                self.inner.notifier.success("Welcome aboard");
                Ok(user)
            }
            Err(e) => Err(self.fail("Registration failed", e)),
        }
    }

    /// Revoke the refresh token (best effort) and clear the session.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.inner.session().refresh_token()
            && let Err(e) = self.inner.api.logout(&refresh_token).await
        {
            warn!(error = %e, "Server-side logout failed");
        }
        self.inner.session().clear().await;
        info!("Signed out");
    }

    /// Revoke every session of this user, then clear the local one.
    ///
    /// # Errors
    ///
    /// Returns the API error; the local session is kept in that case.
    #[instrument(skip(self))]
    pub async fn logout_all(&self) -> Result<(), StoreError> {
        self.require_session()?;
        match self.inner.api.logout_all().await {
            Ok(()) => {
                self.inner.session().clear().await;
                info!("Signed out everywhere");
                Ok(())
            }
            Err(e) => Err(self.fail("Could not sign out other devices", e)),
        }
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for an empty update, or the API error.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, StoreError> {
        self.require_session()?;
        if update.is_empty() {
            return Err(self.reject(StoreError::Validation("Nothing to update".to_string())));
        }
        let _busy = self.begin()?;

        match self.inner.api.update_user(update).await {
            Ok(user) => {
                self.inner.session().set_user(user.clone()).await;
                self.authenticated(user.clone());
                self.inner.notifier.success("Profile updated");
                Ok(user)
            }
            Err(e) => Err(self.fail("Could not update the profile", e)),
        }
    }

    /// Delete the account and end the session.
    ///
    /// # Errors
    ///
    /// Returns the API error; nothing is cleared in that case.
    #[instrument(skip(self))]
    pub async fn delete_account(&self) -> Result<(), StoreError> {
        self.require_session()?;
        let _busy = self.begin()?;

        match self.inner.api.delete_user().await {
            Ok(()) => {
                self.inner.session().clear().await;
                self.inner.notifier.success("Your account has been deleted");
                info!("Account deleted");
                Ok(())
            }
            Err(e) => Err(self.fail("Could not delete the account", e)),
        }
    }

    async fn settled_status(&self) -> AuthStatus {
        let mut rx = self.subscribe();
        rx.wait_for(|s| matches!(s.status, AuthStatus::Authenticated | AuthStatus::Anonymous))
            .await
            .map_or(AuthStatus::Anonymous, |state| state.status)
    }

    async fn signed_in(&self, response: AuthResponse) -> User {
        let user = response.user;
        self.inner
            .session()
            .establish(response.tokens, user.clone())
            .await;
        info!(user_id = %user.id, "Signed in");
        self.authenticated(user.clone());
        self.sync_cart().await;
        user
    }

    fn authenticated(&self, user: User) {
        self.inner.state.send_modify(|s| {
            s.status = AuthStatus::Authenticated;
            s.user = Some(user);
            s.last_error = None;
        });
    }

    /// Load the cart so the badge is right. Failures only log.
    async fn sync_cart(&self) {
        if let Err(e) = self.inner.cart.fetch_cart().await {
            warn!(error = %e, "Cart sync after sign-in failed");
        }
    }

    fn begin(&self) -> Result<Busy<'_>, StoreError> {
        let flight = InFlight::acquire(&self.inner.busy).ok_or(StoreError::Busy)?;
        self.inner.state.send_modify(|s| s.busy = true);
        Ok(Busy {
            _flight: flight,
            state: &self.inner.state,
        })
    }

    fn require_session(&self) -> Result<(), StoreError> {
        if self.inner.session().is_authenticated() {
            Ok(())
        } else {
            Err(StoreError::AuthRequired)
        }
    }

    fn record_error(&self, message: &str) {
        self.inner
            .state
            .send_modify(|s| s.last_error = Some(message.to_string()));
    }

    /// Record a validation failure; no notification, the form shows it.
    fn reject(&self, err: StoreError) -> StoreError {
        self.record_error(&err.user_message());
        err
    }

    fn fail(&self, action: &str, err: ApiError) -> StoreError {
        warn!(error = %err, "{action}");
        let message = err.user_message();
        self.record_error(&message);
        self.inner.notifier.error(format!("{action}: {message}"));
        err.into()
    }
}
