//! The shared session: tokens plus the signed-in user.
//!
//! The auth store drives the session lifecycle, but the API client must read
//! the access token for every request and rotate or drop the tokens during a
//! refresh, so both hold a [`SessionHandle`]. Anything derived from the
//! session (the cart) registers a clear listener instead of polling.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::models::{TokenPair, User};
use crate::persist::{Persisted, StateStorage, keys};

/// Current credentials and identity.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub user: Option<User>,
}

impl Session {
    /// A token is present and the user has been loaded with it.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user.is_some()
    }

    /// Either token is present, so a user fetch is worth attempting.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.access_token.is_some() || self.refresh_token.is_some()
    }
}

/// On-disk form of [`Session`]; tokens are exposed only here.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<User>,
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session
                .access_token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
            refresh_token: session
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
            user: session.user.clone(),
        }
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self {
            access_token: stored.access_token.map(SecretString::from),
            refresh_token: stored.refresh_token.map(SecretString::from),
            user: stored.user,
        }
    }
}

type ClearListener = Box<dyn Fn() + Send + Sync>;

/// Cloneable handle to the one session of a storefront.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    state: watch::Sender<Session>,
    listeners: RwLock<Vec<ClearListener>>,
    persisted: Persisted<StoredSession>,
}

impl SessionHandle {
    /// An empty session persisted under `users-store`.
    #[must_use]
    pub fn new(storage: Arc<dyn StateStorage>) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            inner: Arc::new(SessionInner {
                state,
                listeners: RwLock::new(Vec::new()),
                persisted: Persisted::new(storage, keys::USERS_STORE),
            }),
        }
    }

    /// Current session.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Watch for session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.inner.state.borrow().access_token.clone()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.inner.state.borrow().refresh_token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    /// Whether `token` is still the access token in use.
    #[must_use]
    pub fn is_current_token(&self, token: Option<&str>) -> bool {
        let state = self.inner.state.borrow();
        state.access_token.as_ref().map(|t| t.expose_secret()) == token
    }

    /// Run `listener` every time the session is cleared.
    pub fn on_clear(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Load a persisted session, if there is one and nothing is set yet.
    pub async fn restore(&self) -> bool {
        if self.inner.state.borrow().has_credentials() {
            return true;
        }
        let Some(stored) = self.inner.persisted.load().await else {
            return false;
        };
        let session = Session::from(stored);
        let restored = session.has_credentials();
        self.inner.state.send_replace(session);
        debug!(restored, "Session restored from storage");
        restored
    }

    /// Install tokens and user after login or registration.
    pub async fn establish(&self, tokens: TokenPair, user: User) {
        self.inner.state.send_replace(Session {
            access_token: Some(tokens.access_token),
            refresh_token: tokens.refresh_token,
            user: Some(user),
        });
        self.persist().await;
    }

    /// Swap in refreshed tokens. Keeps the old refresh token when the
    /// backend does not rotate it.
    pub async fn rotate(&self, tokens: TokenPair) {
        self.inner.state.send_modify(|session| {
            session.access_token = Some(tokens.access_token);
            if let Some(refresh) = tokens.refresh_token {
                session.refresh_token = Some(refresh);
            }
        });
        self.persist().await;
    }

    /// Record the loaded or updated user.
    pub async fn set_user(&self, user: User) {
        self.inner.state.send_modify(|session| session.user = Some(user));
        self.persist().await;
    }

    /// Drop all credentials and notify clear listeners.
    pub async fn clear(&self) {
        self.inner.state.send_replace(Session::default());
        self.inner.persisted.clear().await;
        let listeners = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener();
        }
        debug!("Session cleared");
    }

    async fn persist(&self) {
        let stored = StoredSession::from(&*self.inner.state.borrow());
        self.inner.persisted.save(&stored).await;
    }
}
