//! Cart endpoints.

use serde_json::json;
use tracing::instrument;
use vitrine_core::ProductId;

use super::{ApiClient, ApiError, ApiRequest, paths};
use crate::models::{CartCount, CartResponse, CartUpdate};

impl ApiClient {
    /// Fetch the authoritative cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the caller is not signed in.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<CartResponse, ApiError> {
        self.execute(ApiRequest::get(paths::CART)).await
    }

    /// Add one product; returns the stored line and the new cart size.
    ///
    /// # Errors
    ///
    /// Returns an error if the product cannot be added.
    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, product_id: ProductId) -> Result<CartUpdate, ApiError> {
        let request = ApiRequest::post(paths::CART).json(&json!({ "product_id": product_id }))?;
        self.execute(request).await
    }

    /// Remove a product; returns the new cart size.
    ///
    /// # Errors
    ///
    /// Returns an error if the product cannot be removed.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, product_id: ProductId) -> Result<CartCount, ApiError> {
        self.execute(ApiRequest::delete(paths::cart_item(product_id)))
            .await
    }
}
