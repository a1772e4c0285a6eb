//! REST client for the storefront backend.
//!
//! # Architecture
//!
//! - `reqwest` for HTTP, JSON bodies both ways
//! - The backend is source of truth - nothing here outlives the process
//!   except what the cart persists
//! - Catalog reads are cached in-memory via `moka` (5 minute TTL by
//!   default); orders and payment calls always go to the network
//!
//! # Example
//!
//! ```rust,ignore
//! use reklama_storefront::api::{ApiClient, CommerceApi, ProductQuery};
//!
//! let client = ApiClient::new(&config.api, None)?;
//!
//! let banners = client
//!     .list_products(&ProductQuery { category: Some("banners".into()), search: None })
//!     .await?;
//! let status = client.payment_status(&session_id).await?;
//! ```

mod cache;
pub mod types;

use std::future::Future;
use std::sync::Arc;

use moka::future::Cache;
use reklama_core::{OrderId, PaymentSessionId, ProductId};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ApiConfig;

use cache::{CacheKey, CacheValue};
pub use types::{
    CheckoutSession, OrderCreated, OrderItem, OrderRequest, PaymentStatusResponse, Product,
    ProductQuery,
};

/// Errors that can occur when talking to the storefront API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configured base URL cannot carry API paths.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Whether repeating the same request later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::NotFound(_) | Self::Parse(_) | Self::InvalidUrl(_) => false,
        }
    }
}

/// Order and payment operations of the API.
///
/// Checkout and the payment poller are written against this trait so they
/// can run against fakes; [`ApiClient`] is the production implementation.
pub trait CommerceApi: Send + Sync {
    /// Submit an order built from the cart.
    fn create_order(
        &self,
        order: &OrderRequest,
    ) -> impl Future<Output = Result<OrderCreated, ApiError>> + Send;

    /// Open a hosted payment session for `order_id`.
    ///
    /// `origin_url` is where the payment page sends the customer back to.
    fn create_checkout_session(
        &self,
        order_id: &OrderId,
        origin_url: &Url,
    ) -> impl Future<Output = Result<CheckoutSession, ApiError>> + Send;

    /// Current state of a payment session.
    fn payment_status(
        &self,
        session_id: &PaymentSessionId,
    ) -> impl Future<Output = Result<PaymentStatusResponse, ApiError>> + Send;
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront REST API.
///
/// Cheap to clone; clones share the connection pool and catalog cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    admin_token: Option<SecretString>,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// When `admin_token` is set, every request carries it as a bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry paths or the HTTP
    /// client fails to build.
    pub fn new(config: &ApiConfig, admin_token: Option<SecretString>) -> Result<Self, ApiError> {
        if config.base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                admin_token,
                cache,
            }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Drop every cached catalog response.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    /// Build `{base}/api/{segments...}`, escaping each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    /// Send a request and decode its JSON body.
    ///
    /// `resource` names what was requested, for `NotFound` errors and logs.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        resource: &str,
    ) -> Result<T, ApiError> {
        let request = match &self.inner.admin_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Read the body first for better error diagnostics
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(resource.to_owned()));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                resource,
                body = %body.chars().take(500).collect::<String>(),
                "Storefront API returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_detail(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                resource,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse storefront API response"
            );
            ApiError::Parse(e)
        })
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// List products, optionally filtered.
    ///
    /// Results without a search term are cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, ApiError> {
        let params = query.params();
        let cacheable = !params.iter().any(|(name, _)| *name == "search");
        let cache_key = CacheKey::Products {
            category: params
                .iter()
                .find(|(name, _)| *name == "category")
                .map(|(_, value)| (*value).to_owned()),
        };

        if cacheable
            && let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let mut url = self.endpoint(&["products"])?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter().copied());
        }

        let products: Vec<Product> = self
            .execute(self.inner.client.get(url), "products")
            .await?;

        if cacheable {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(products.clone()))
                .await;
        }

        Ok(products)
    }

    /// Get a single product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids, or an error if the
    /// request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.endpoint(&["products", id.as_str()])?;
        let product: Product = self
            .execute(self.inner.client.get(url), &format!("product {id}"))
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get a product bypassing the cache, for stock checks.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids, or an error if the
    /// request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product_fresh(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.inner
            .cache
            .invalidate(&CacheKey::Product(id.clone()))
            .await;
        self.get_product(id).await
    }

    /// List the distinct product categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<String>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let url = self.endpoint(&["categories"])?;
        let categories: Vec<String> = self
            .execute(self.inner.client.get(url), "categories")
            .await?;

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }
}

impl CommerceApi for ApiClient {
    #[instrument(skip(self, order), fields(items = order.items.len()))]
    async fn create_order(&self, order: &OrderRequest) -> Result<OrderCreated, ApiError> {
        let url = self.endpoint(&["orders"])?;
        self.execute(self.inner.client.post(url).json(order), "orders")
            .await
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn create_checkout_session(
        &self,
        order_id: &OrderId,
        origin_url: &Url,
    ) -> Result<CheckoutSession, ApiError> {
        let mut url = self.endpoint(&["payments", "checkout"])?;
        url.query_pairs_mut()
            .append_pair("order_id", order_id.as_str())
            .append_pair("origin_url", origin_url.as_str().trim_end_matches('/'));

        self.execute(self.inner.client.post(url), &format!("order {order_id}"))
            .await
    }

    #[instrument(skip(self), fields(session_id = %session_id))]
    async fn payment_status(
        &self,
        session_id: &PaymentSessionId,
    ) -> Result<PaymentStatusResponse, ApiError> {
        let url = self.endpoint(&["payments", "status", session_id.as_str()])?;
        self.execute(
            self.inner.client.get(url),
            &format!("payment session {session_id}"),
        )
        .await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field(
                "admin_token",
                &self.inner.admin_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

/// Pull a human-readable message out of an error body.
///
/// The backend reports errors as `{"detail": "..."}`; anything else is
/// returned as a truncated raw body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_owned))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
