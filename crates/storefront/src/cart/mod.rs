//! Client-side shopping cart.
//!
//! # Model
//!
//! A cart is an ordered list of [`CartLineItem`]s, at most one per product.
//! Each line carries a snapshot of the product's display fields and unit
//! price taken when it was first added; later catalog price changes do not
//! reach lines already in the cart.
//!
//! Totals are never stored. [`CartStore::cart_total`] and
//! [`CartStore::cart_count`] are recomputed from the lines on every read,
//! and every published [`CartSnapshot`] is computed from the lines it holds.
//!
//! # Persistence
//!
//! Every effective mutation writes the whole cart through
//! [`CartPersistence`] and then publishes a new snapshot to subscribers.
//! Persistence failures are logged and swallowed; the in-memory cart stays
//! authoritative for the rest of the session.

mod availability;
mod persistence;
mod store;

use std::sync::Arc;

use reklama_core::{Price, ProductId};
use serde::{Deserialize, Serialize};

use crate::api::Product;

pub use availability::{AvailabilityError, check_availability};
pub use persistence::CartPersistence;
pub use store::CartStore;

/// One product-plus-quantity entry in the cart.
///
/// Field names on the wire match what the web storefront keeps in browser
/// storage, so a snapshot written by either client reads back in the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Product this line refers to; unique within a cart.
    #[serde(rename = "id")]
    pub product_id: ProductId,
    /// Product name at add-time.
    pub name: String,
    /// Product category at add-time.
    #[serde(default)]
    pub category: String,
    /// Product image at add-time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Unit price at add-time.
    #[serde(rename = "price")]
    pub unit_price: Price,
    /// Always at least 1 while the line is in a cart.
    pub quantity: u32,
}

impl CartLineItem {
    /// Snapshot `product` into a new line of `quantity` units.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            image_url: product.image().map(str::to_owned),
            unit_price: product.price,
            quantity,
        }
    }

    /// `unit_price * quantity`, exact.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }

    /// Like [`Self::line_total`], but `None` when the amount is not representable.
    #[must_use]
    pub fn checked_line_total(&self) -> Option<Price> {
        self.unit_price.checked_times(self.quantity)
    }
}

/// Sum of `unit_price * quantity` over `lines`.
#[must_use]
pub fn total_of(lines: &[CartLineItem]) -> Price {
    lines.iter().map(CartLineItem::line_total).sum()
}

/// Exact cart total, or `None` if any line or the sum is not representable.
#[must_use]
pub fn checked_total_of(lines: &[CartLineItem]) -> Option<Price> {
    lines.iter().try_fold(Price::ZERO, |total, line| {
        total.checked_add(line.checked_line_total()?)
    })
}

/// Sum of quantities over `lines`.
#[must_use]
pub fn count_of(lines: &[CartLineItem]) -> u64 {
    lines.iter().map(|line| u64::from(line.quantity)).sum()
}

/// Immutable view of the cart published to subscribers after each mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartSnapshot {
    items: Arc<[CartLineItem]>,
    total: Price,
    count: u64,
}

impl CartSnapshot {
    /// Build a snapshot, deriving totals from `lines`.
    #[must_use]
    pub fn from_lines(lines: &[CartLineItem]) -> Self {
        Self {
            items: Arc::from(lines),
            total: total_of(lines),
            count: count_of(lines),
        }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Exact sum of line totals.
    #[must_use]
    pub const fn total(&self) -> Price {
        self.total
    }

    /// Sum of line quantities.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Returns `true` if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use std::str::FromStr;

    use reklama_core::{Price, ProductId};
    use rust_decimal::Decimal;

    use crate::api::Product;

    pub fn product(id: &str, price: &str, stock: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price: Price::new(Decimal::from_str(price).unwrap()),
            category: "banners".to_string(),
            stock,
            sku: String::new(),
            image_url: format!("/uploads/{id}.png"),
            sort_order: 0,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn price(s: &str) -> Price {
        Price::new(Decimal::from_str(s).unwrap())
    }
}
