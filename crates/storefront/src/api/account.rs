//! Auth and user endpoints.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::instrument;
use vitrine_core::{Credentials, Registration};

use super::{ApiClient, ApiError, ApiRequest, paths};
use crate::models::{AuthResponse, ProfileUpdate, TokenPair, User};

impl ApiClient {
    /// Exchange email and password for a token pair and the user.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for wrong credentials.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let request = ApiRequest::post(paths::LOGIN)
            .json(&json!({
                "email": credentials.email.as_str(),
                "password": credentials.password.expose_secret(),
            }))?
            .anonymous();
        self.execute(request).await
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] with the backend's message when the
    /// registration is rejected (e.g. email already taken).
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        let request = ApiRequest::post(paths::REGISTER)
            .json(&json!({
                "name": registration.name,
                "email": registration.email.as_str(),
                "password": registration.password.expose(),
            }))?
            .anonymous();
        self.execute(request).await
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// Sent anonymously and never intercepted: a `401` here is a failed
    /// refresh, not a trigger for another one.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token is rejected.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenPair, ApiError> {
        let request = ApiRequest::post(paths::REFRESH)
            .json(&json!({ "refresh_token": refresh_token.expose_secret() }))?
            .anonymous();
        self.execute_direct(request).await
    }

    /// Revoke one refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn logout(&self, refresh_token: &SecretString) -> Result<(), ApiError> {
        let request = ApiRequest::post(paths::LOGOUT)
            .json(&json!({ "refresh_token": refresh_token.expose_secret() }))?;
        self.execute_empty(request).await
    }

    /// Revoke every session of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn logout_all(&self) -> Result<(), ApiError> {
        self.execute_empty(ApiRequest::post(paths::LOGOUT_ALL)).await
    }

    /// Fetch the user the current token belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] or [`ApiError::RefreshFailed`] when
    /// there is no usable session.
    #[instrument(skip(self))]
    pub async fn get_user(&self) -> Result<User, ApiError> {
        self.execute(ApiRequest::get(paths::USER)).await
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns an error if the update is rejected.
    #[instrument(skip(self, update))]
    pub async fn update_user(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.execute(ApiRequest::patch(paths::USER).json(update)?)
            .await
    }

    /// Delete the signed-in account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn delete_user(&self) -> Result<(), ApiError> {
        self.execute_empty(ApiRequest::delete(paths::USER)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use reqwest::StatusCode;
    use serde_json::json;
    use vitrine_core::Locale;

    use super::*;
    use crate::api::{Method, Transport};
    use crate::persist::MemoryStorage;
    use crate::stores::session::SessionHandle;
    use crate::testing::ScriptedTransport;

    fn client(transport: &Arc<ScriptedTransport>) -> ApiClient {
        let session = SessionHandle::new(Arc::new(MemoryStorage::new()));
        ApiClient::new(Arc::clone(transport) as Arc<dyn Transport>, session, Locale::default())
    }

    #[tokio::test]
    async fn test_login_sends_credentials_anonymously() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.route(Method::Post, "auth/login", |request, bearer| {
            assert!(bearer.is_none());
            let body = ScriptedTransport::json_body(request);
            assert_eq!(body["email"], "ann@example.com");
            assert_eq!(body["password"], "hunter22");
            Ok(crate::api::ApiResponse::json(
                StatusCode::OK,
                &json!({
                    "access_token": "T1",
                    "refresh_token": "R1",
                    "user": {"id": 1, "email": "ann@example.com", "name": "Ann"}
                }),
            ))
        });

        let credentials = Credentials::new("ann@example.com", "hunter22").unwrap();
        let response = client(&transport).login(&credentials).await.unwrap();
        assert!(response.tokens.has_access_token("T1"));
        assert_eq!(response.user.name, "Ann");
    }

    #[tokio::test]
    async fn test_register_posts_name_and_password() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.route(Method::Post, "auth/register", |request, _| {
            let body = ScriptedTransport::json_body(request);
            assert_eq!(body["name"], "Bo");
            assert_eq!(body["password"], "abcd1234");
            Ok(crate::api::ApiResponse::json(
                StatusCode::CREATED,
                &json!({
                    "access": "T1",
                    "user": {"id": 2, "email": "bo@example.com", "name": "Bo"}
                }),
            ))
        });

        let registration =
            Registration::new("Bo", "bo@example.com", "abcd1234", "abcd1234").unwrap();
        let response = client(&transport).register(&registration).await.unwrap();
        assert!(response.tokens.refresh_token.is_none());
        assert_eq!(response.user.id.get(), 2);
    }

    #[tokio::test]
    async fn test_refresh_posts_refresh_token() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.route(Method::Post, "auth/refresh", |request, _| {
            let body = ScriptedTransport::json_body(request);
            assert_eq!(body["refresh_token"], "R1");
            Ok(crate::api::ApiResponse::json(
                StatusCode::OK,
                &json!({"access_token": "T2", "refresh_token": "R2"}),
            ))
        });

        let tokens = client(&transport)
            .refresh(&SecretString::from("R1"))
            .await
            .unwrap();
        assert!(tokens.has_access_token("T2"));
    }

    #[tokio::test]
    async fn test_rejected_refresh_is_final() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply(
            Method::Post,
            "auth/refresh",
            StatusCode::UNAUTHORIZED,
            json!({"detail": "Token is blacklisted"}),
        );
        let api = crate::testing::signed_in_client(&transport).await;

        let result = api.refresh(&SecretString::from("R1")).await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert_eq!(transport.calls_to(Method::Post, "auth/refresh"), 1);
        assert_eq!(transport.bearers_for(Method::Post, "auth/refresh"), vec![None]);
        // The exchange on its own leaves the session alone
        assert!(api.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_update_user_patches() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.route(Method::Patch, "user", |request, _| {
            assert_eq!(ScriptedTransport::json_body(request), json!({"name": "New"}));
            Ok(crate::api::ApiResponse::json(
                StatusCode::OK,
                &json!({"id": 1, "email": "ann@example.com", "name": "New"}),
            ))
        });

        let update = ProfileUpdate {
            name: Some("New".to_string()),
            ..ProfileUpdate::default()
        };
        let user = client(&transport).update_user(&update).await.unwrap();
        assert_eq!(user.name, "New");
    }
}
