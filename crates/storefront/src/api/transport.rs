//! Wire-level request/response types and the HTTP transport.
//!
//! The [`Transport`] trait is the seam between the API client and the
//! network. [`HttpTransport`] talks to the real backend with `reqwest`; tests
//! substitute a scripted implementation.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, RETRY_AFTER};
use serde::Serialize;
use tracing::debug;
use url::Url;
use uuid::Uuid;
use vitrine_core::Locale;

use super::error::TransportError;
use crate::config::ClientConfig;

/// HTTP method of an [`ApiRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
        }
    }
}

/// Whether a request participates in bearer authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Send the session's access token; a 401 triggers refresh and replay.
    Bearer,
    /// Never send a token and never intercept a 401 (login, register, refresh).
    Anonymous,
}

/// A file sent to the media upload endpoint.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Original file name.
    pub file_name: String,
    /// MIME type, e.g. `image/png`.
    pub content_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Request body.
#[derive(Debug, Clone)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    Multipart(Upload),
}

/// A request against an endpoint path relative to the API base URL.
///
/// Requests are plain data so the client can replay them after a token
/// refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
    pub auth: AuthMode,
}

impl ApiRequest {
    /// Build a bearer-authenticated request with no body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
            auth: AuthMode::Bearer,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be represented as JSON.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Body::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Attach a multipart file body.
    #[must_use]
    pub fn multipart(mut self, upload: Upload) -> Self {
        self.body = Body::Multipart(upload);
        self
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Mark the request as one that must not carry or refresh credentials.
    #[must_use]
    pub const fn anonymous(mut self) -> Self {
        self.auth = AuthMode::Anonymous;
        self
    }
}

/// What a transport receives for a single attempt.
#[derive(Debug, Clone, Copy)]
pub struct Outgoing<'a> {
    pub request: &'a ApiRequest,
    pub bearer: Option<&'a str>,
    pub locale: &'a Locale,
}

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// Seconds from a `Retry-After` header, if present.
    pub retry_after: Option<u64>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// A response with a JSON body.
    #[must_use]
    pub fn json(status: StatusCode, body: &serde_json::Value) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.to_string().into_bytes(),
        }
    }

    /// A response with no body.
    #[must_use]
    pub const fn empty(status: StatusCode) -> Self {
        Self {
            status,
            retry_after: None,
            body: Vec::new(),
        }
    }
}

/// Sends a single request attempt. Implementations do no retrying.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `outgoing` and read the whole response.
    async fn send(&self, outgoing: Outgoing<'_>) -> Result<ApiResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend
    /// initialisation failure).
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("vitrine/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
        })
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let mut url = self.base_url.join(request.path.trim_start_matches('/'))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, outgoing: Outgoing<'_>) -> Result<ApiResponse, TransportError> {
        let request = outgoing.request;
        let url = self.url_for(request)?;
        let request_id = Uuid::new_v4();

        let mut builder = self
            .client
            .request(request.method.into(), url)
            .header(ACCEPT, "application/json")
            .header(ACCEPT_LANGUAGE, outgoing.locale.as_str())
            .header("X-Request-Id", request_id.to_string());

        if let Some(token) = outgoing.bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Multipart(upload) => {
                let part = reqwest::multipart::Part::bytes(upload.bytes.clone())
                    .file_name(upload.file_name.clone())
                    .mime_str(&upload.content_type)?;
                builder.multipart(reqwest::multipart::Form::new().part("file", part))
            }
        };

        let response = builder.send().await?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        let body = response.bytes().await?.to_vec();

        debug!(
            method = ?request.method,
            path = %request.path,
            %status,
            %request_id,
            "API response"
        );

        Ok(ApiResponse {
            status,
            retry_after,
            body,
        })
    }
}
