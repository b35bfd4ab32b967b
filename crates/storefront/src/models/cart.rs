//! Cart payloads.

use serde::{Deserialize, Serialize};
use vitrine_core::ProductId;

use super::catalog::Product;

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

impl CartItem {
    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product.id
    }
}

/// Response of `GET cart`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartResponse {
    #[serde(default)]
    pub items: Vec<CartItem>,
    /// Number of distinct products; derived from `items` when absent.
    #[serde(default)]
    pub count: Option<usize>,
}

impl CartResponse {
    /// Server count, or the number of items if the server did not send one.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.unwrap_or(self.items.len())
    }
}

/// Response of `POST cart`: the stored line and the new cart size.
#[derive(Debug, Clone, Deserialize)]
pub struct CartUpdate {
    pub item: CartItem,
    pub count: usize,
}

/// Response of `DELETE cart/{id}`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CartCount {
    pub count: usize,
}
