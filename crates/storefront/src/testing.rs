//! Test support: a scripted [`Transport`] and client fixtures.
//!
//! Compiled for this crate's unit tests and, behind the `testing` feature,
//! for the integration tests.
//!
//! Routes are keyed by method and path. Every call is recorded before it is
//! answered, and a route can be held so its responses wait until released,
//! which makes interleavings like concurrent `401`s deterministic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::sync::Semaphore;
use vitrine_core::{Locale, UserId};

use crate::api::{
    ApiClient, ApiRequest, ApiResponse, Body, Method, Outgoing, Transport, TransportError,
};
use crate::models::{TokenPair, User};
use crate::persist::MemoryStorage;
use crate::stores::session::SessionHandle;

type Handler =
    Arc<dyn Fn(&ApiRequest, Option<&str>) -> Result<ApiResponse, TransportError> + Send + Sync>;

type RouteKey = (Method, String);

/// One request as the transport saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: ApiRequest,
    pub bearer: Option<String>,
    pub locale: Locale,
}

/// Holds responses of a route until permits are released.
#[derive(Debug, Clone)]
pub struct Gate {
    permits: Arc<Semaphore>,
}

impl Gate {
    /// Let one held (or future) response through.
    pub fn release(&self) {
        self.permits.add_permits(1);
    }

    /// Let `n` responses through.
    pub fn release_many(&self, n: usize) {
        self.permits.add_permits(n);
    }
}

/// In-memory [`Transport`] answering from per-route scripts.
///
/// Unscripted routes answer `404`.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<RouteKey, Handler>>,
    gates: Mutex<HashMap<RouteKey, Gate>>,
    calls: Mutex<Vec<RecordedCall>>,
}

fn key(method: Method, path: &str) -> RouteKey {
    (method, path.trim_start_matches('/').to_string())
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method path` with `handler`, given the request and its bearer.
    pub fn route<F>(&self, method: Method, path: &str, handler: F)
    where
        F: Fn(&ApiRequest, Option<&str>) -> Result<ApiResponse, TransportError>
            + Send
            + Sync
            + 'static,
    {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key(method, path), Arc::new(handler));
    }

    /// Always answer `method path` with `status` and a JSON body.
    pub fn reply(&self, method: Method, path: &str, status: StatusCode, body: Value) {
        let response = ApiResponse::json(status, &body);
        self.route(method, path, move |_, _| Ok(response.clone()));
    }

    /// Make `method path` fail as if the network were down.
    pub fn fail(&self, method: Method, path: &str) {
        self.route(method, path, |_, _| {
            Err(TransportError::Unavailable("connection refused".to_string()))
        });
    }

    /// Hold responses of `method path` until the returned gate releases them.
    pub fn hold(&self, method: Method, path: &str) -> Gate {
        let gate = Gate {
            permits: Arc::new(Semaphore::new(0)),
        };
        self.gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key(method, path), gate.clone());
        gate
    }

    /// Every call so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn calls_matching(&self, method: Method, path: &str) -> Vec<RecordedCall> {
        let (method, path) = key(method, path);
        self.calls()
            .into_iter()
            .filter(|call| key(call.request.method, &call.request.path) == (method, path.clone()))
            .collect()
    }

    #[must_use]
    pub fn calls_to(&self, method: Method, path: &str) -> usize {
        self.calls_matching(method, path).len()
    }

    /// Bearer tokens sent to `method path`, in order.
    #[must_use]
    pub fn bearers_for(&self, method: Method, path: &str) -> Vec<Option<String>> {
        self.calls_matching(method, path)
            .into_iter()
            .map(|call| call.bearer)
            .collect()
    }

    #[must_use]
    pub fn last_call(&self, method: Method, path: &str) -> Option<ApiRequest> {
        self.calls_matching(method, path)
            .pop()
            .map(|call| call.request)
    }

    /// JSON body of a request, or `Null`.
    #[must_use]
    pub fn json_body(request: &ApiRequest) -> Value {
        match &request.body {
            Body::Json(value) => value.clone(),
            Body::Empty | Body::Multipart(_) => Value::Null,
        }
    }

    /// Last value of query parameter `name`.
    #[must_use]
    pub fn query_param(request: &ApiRequest, name: &str) -> Option<String> {
        request
            .query
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, outgoing: Outgoing<'_>) -> Result<ApiResponse, TransportError> {
        let request = outgoing.request;
        let route = key(request.method, &request.path);

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                request: request.clone(),
                bearer: outgoing.bearer.map(str::to_string),
                locale: outgoing.locale.clone(),
            });

        let gate = self
            .gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&route)
            .cloned();
        if let Some(gate) = gate {
            gate.permits
                .acquire()
                .await
                .map_err(|_| TransportError::Unavailable("gate closed".to_string()))?
                .forget();
        }

        let handler = self
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&route)
            .cloned();
        match handler {
            Some(handler) => handler(request, outgoing.bearer),
            None => Ok(ApiResponse::json(
                StatusCode::NOT_FOUND,
                &json!({"detail": format!("no route for {:?} {}", route.0, route.1)}),
            )),
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// The user every fixture session belongs to.
#[must_use]
pub fn sample_user() -> User {
    User {
        id: UserId::new(1),
        email: "ann@example.com".to_string(),
        name: "Ann".to_string(),
        avatar_url: None,
        is_staff: false,
    }
}

/// [`sample_user`] as the backend sends it.
#[must_use]
pub fn user_json() -> Value {
    json!({"id": 1, "email": "ann@example.com", "name": "Ann"})
}

/// A minimal product as the backend sends it.
#[must_use]
pub fn product_json(id: i64) -> Value {
    json!({
        "id": id,
        "title": format!("Product {id}"),
        "slug": format!("product-{id}"),
        "price": {"amount": "10.00", "currency": "USD"}
    })
}

/// A client with an empty session.
#[must_use]
pub fn anonymous_client(transport: &Arc<ScriptedTransport>) -> ApiClient {
    let session = SessionHandle::new(Arc::new(MemoryStorage::new()));
    ApiClient::new(
        Arc::clone(transport) as Arc<dyn Transport>,
        session,
        Locale::default(),
    )
}

/// A client signed in as [`sample_user`] with access token `T1` and refresh
/// token `R1`.
pub async fn signed_in_client(transport: &Arc<ScriptedTransport>) -> ApiClient {
    let client = anonymous_client(transport);
    client
        .session()
        .establish(
            TokenPair {
                access_token: SecretString::from("T1"),
                refresh_token: Some(SecretString::from("R1")),
            },
            sample_user(),
        )
        .await;
    client
}
