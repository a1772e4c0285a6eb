//! Cache types for catalog responses.

use reklama_core::ProductId;

use super::types::Product;

/// Cache key for catalog reads.
///
/// Search queries are never cached, so only the category filter takes part
/// in the product-list key.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Products { category: Option<String> },
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
    Categories(Vec<String>),
}
