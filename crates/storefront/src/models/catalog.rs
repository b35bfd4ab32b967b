//! Catalog listing, product and filter types.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use vitrine_core::{CategoryId, FilterValueId, Price, ProductId};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    pub price: Price,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "in_stock_default")]
    pub in_stock: bool,
    #[serde(default)]
    pub categories: Vec<CategoryId>,
    /// Only present on the single-item endpoint.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

const fn in_stock_default() -> bool {
    true
}

/// One selectable value in a filter group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterValue {
    pub id: FilterValueId,
    pub label: String,
    /// Matching products, when the backend computes facets.
    #[serde(default)]
    pub count: Option<u64>,
}

/// A filterable field (brand, size, colour...) and its values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub field: String,
    pub title: String,
    #[serde(default)]
    pub values: Vec<FilterValue>,
}

/// One page of `GET catalog`.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPage {
    #[serde(default)]
    pub items: Vec<Product>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub filters: Vec<FilterGroup>,
}

/// Search, filter and pagination parameters of a catalog fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub search: String,
    /// Selected value ids per filter field. Empty sets are never stored.
    pub filters: BTreeMap<String, BTreeSet<FilterValueId>>,
    pub page: u32,
    pub items_per_page: u32,
}

impl CatalogQuery {
    /// First page with no search or filters.
    #[must_use]
    pub const fn new(items_per_page: u32) -> Self {
        Self {
            search: String::new(),
            filters: BTreeMap::new(),
            page: 1,
            items_per_page,
        }
    }

    /// Query string pairs, e.g. `search=..&brand=1,4&page=2&per_page=12`.
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        let search = self.search.trim();
        if !search.is_empty() {
            params.push(("search".to_string(), search.to_string()));
        }
        for (field, ids) in &self.filters {
            if ids.is_empty() {
                continue;
            }
            let joined = ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            params.push((field.clone(), joined));
        }
        params.push(("page".to_string(), self.page.to_string()));
        params.push(("per_page".to_string(), self.items_per_page.to_string()));
        params
    }

    /// Whether more pages exist after this one.
    #[must_use]
    pub fn has_more(&self, total: u64) -> bool {
        u64::from(self.page) * u64::from(self.items_per_page) < total
    }

    /// Same search and filters, ignoring pagination.
    #[must_use]
    pub fn same_selection(&self, other: &Self) -> bool {
        self.search.trim() == other.search.trim()
            && self.filters == other.filters
            && self.items_per_page == other.items_per_page
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_params_skip_empty_search_and_sets() {
        let mut query = CatalogQuery::new(12);
        query.search = "  ".to_string();
        query.filters.insert("brand".to_string(), BTreeSet::new());
        let params = query.to_params();
        assert_eq!(
            params,
            vec![
                ("page".to_string(), "1".to_string()),
                ("per_page".to_string(), "12".to_string()),
            ]
        );
    }

    #[test]
    fn test_params_join_filter_ids_in_order() {
        let mut query = CatalogQuery::new(24);
        query.search = "boots".to_string();
        query.page = 3;
        query.filters.insert(
            "size".to_string(),
            [FilterValueId::new(9), FilterValueId::new(2)].into_iter().collect(),
        );
        let params = query.to_params();
        assert!(params.contains(&("search".to_string(), "boots".to_string())));
        assert!(params.contains(&("size".to_string(), "2,9".to_string())));
        assert!(params.contains(&("page".to_string(), "3".to_string())));
    }

    #[test]
    fn test_has_more() {
        let mut query = CatalogQuery::new(10);
        assert!(query.has_more(11));
        assert!(!query.has_more(10));
        query.page = 2;
        assert!(!query.has_more(20));
    }

    #[test]
    fn test_product_defaults() {
        let product: Product =
            serde_json::from_str(r#"{"id":3,"title":"Mug","price":{"amount":"9.00"}}"#).unwrap();
        assert!(product.in_stock);
        assert!(product.images.is_empty());
        assert_eq!(product.price.amount, rust_decimal::Decimal::new(900, 2));
    }
}
