//! Request and response bodies of the storefront REST API.
//!
//! These mirror the JSON the backend speaks. Optional fields default so
//! that records written by older backend versions still decode.

use chrono::{DateTime, Utc};
use reklama_core::{Email, OrderId, PaymentSessionId, PaymentStatus, Price, ProductId, SessionStatus};
use serde::{Deserialize, Serialize};
use url::Url;

// =============================================================================
// Catalog
// =============================================================================

/// A product record from `GET /api/products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub category: String,
    /// Units in stock.
    #[serde(rename = "quantity", default)]
    pub stock: i64,
    #[serde(default)]
    pub sku: String,
    /// Image path or URL; empty when the product has no image.
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Image reference, if the product has one.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        let url = self.image_url.trim();
        (!url.is_empty()).then_some(url)
    }

    /// Returns `true` if at least one unit is in stock.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Filters for `GET /api/products`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    /// Exact category match.
    pub category: Option<String>,
    /// Case-insensitive match against name and description.
    pub search: Option<String>,
}

impl ProductQuery {
    /// Query parameters to send, skipping unset or blank filters.
    pub(crate) fn params(&self) -> Vec<(&'static str, &str)> {
        [("category", &self.category), ("search", &self.search)]
            .into_iter()
            .filter_map(|(name, value)| {
                value
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| (name, v))
            })
            .collect()
    }
}

// =============================================================================
// Orders
// =============================================================================

/// One line of an order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: u32,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub items: Vec<OrderItem>,
    pub customer_name: String,
    pub customer_email: Email,
    pub customer_phone: String,
    pub customer_address: String,
}

/// Response of `POST /api/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub id: OrderId,
    /// Server-computed total, when reported.
    #[serde(default)]
    pub total_amount: Option<Price>,
}

// =============================================================================
// Payments
// =============================================================================

/// Response of `POST /api/payments/checkout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Hosted payment page to send the customer to.
    pub checkout_url: Url,
    /// Session to poll once the customer returns.
    pub session_id: PaymentSessionId,
}

/// Response of `GET /api/payments/status/{session_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Amount charged in cents.
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_decodes_backend_record() {
        let json = r#"{
            "id": "6a1e",
            "name": "Roll-up stand",
            "description": "85x200",
            "price": 39.9,
            "category": "stands",
            "quantity": 12,
            "sku": "RU-85",
            "image_url": "",
            "sort_order": 3,
            "created_at": "2025-03-01T10:00:00.123456+00:00",
            "updated_at": "2025-03-02T10:00:00+00:00"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();

        assert_eq!(product.stock, 12);
        assert_eq!(product.image(), None);
        assert!(product.in_stock());
        assert!(product.created_at.is_some());
    }

    #[test]
    fn test_product_decodes_minimal_record() {
        let product: Product =
            serde_json::from_str(r#"{"id":"x","name":"Flyer","price":0.5}"#).unwrap();
        assert_eq!(product.stock, 0);
        assert!(!product.in_stock());
        assert_eq!(product.category, "");
    }

    #[test]
    fn test_query_params_skip_blank_filters() {
        let query = ProductQuery {
            category: Some("banners".to_string()),
            search: Some("   ".to_string()),
        };
        assert_eq!(query.params(), [("category", "banners")]);
        assert!(ProductQuery::default().params().is_empty());
    }

    #[test]
    fn test_order_request_wire_format() {
        let order = OrderRequest {
            items: vec![OrderItem {
                product_id: ProductId::new("p1"),
                name: "Sticker".to_string(),
                price: serde_json::from_str("2.5").unwrap(),
                quantity: 4,
            }],
            customer_name: "Aziz".to_string(),
            customer_email: Email::parse("aziz@example.uz").unwrap(),
            customer_phone: "+998 90 123 45 67".to_string(),
            customer_address: "Tashkent".to_string(),
        };
        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(json["items"][0]["product_id"], "p1");
        assert_eq!(json["items"][0]["price"], 2.5);
        assert_eq!(json["customer_email"], "aziz@example.uz");
    }

    #[test]
    fn test_payment_status_tolerates_missing_fields() {
        let status: PaymentStatusResponse =
            serde_json::from_str(r#"{"payment_status":"paid"}"#).unwrap();
        assert!(status.payment_status.is_paid());
        assert_eq!(status.status, SessionStatus::Open);
        assert_eq!(status.amount_total, None);
    }
}
