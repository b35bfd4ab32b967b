//! Catalog, autocomplete and menu endpoints.

use tracing::instrument;
use vitrine_core::ProductId;

use super::{ApiClient, ApiError, ApiRequest, paths};
use crate::models::{CatalogPage, CatalogQuery, Menu, Product};

impl ApiClient {
    /// One page of the filtered catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, query), fields(page = query.page, search = %query.search))]
    pub async fn list_catalog(&self, query: &CatalogQuery) -> Result<CatalogPage, ApiError> {
        let mut request = ApiRequest::get(paths::CATALOG);
        request.query = query.to_params();
        self.execute(request).await
    }

    /// A single product with its full description and images.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id.
    #[instrument(skip(self))]
    pub async fn get_catalog_item(&self, id: ProductId) -> Result<Product, ApiError> {
        self.execute(ApiRequest::get(paths::catalog_item(id))).await
    }

    /// Suggestions for `term` within one filterable field.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn autocomplete(&self, field: &str, term: &str) -> Result<Vec<String>, ApiError> {
        self.execute(ApiRequest::get(paths::autocomplete(field)).query("q", term))
            .await
    }

    /// Navigation menu and category tree for the current locale.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_menu(&self) -> Result<Menu, ApiError> {
        self.execute(ApiRequest::get(paths::MENU)).await
    }
}
