//! Integration tests for Reklama.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p reklama-integration-tests
//! ```
//!
//! The tests drive the real [`reklama_storefront::api::ApiClient`] against
//! [`FakeBackend`], an in-process axum server speaking the storefront REST
//! API. No external services are needed.
//!
//! # Test Categories
//!
//! - `catalog` - Product and category reads, caching, error mapping
//! - `checkout_flow` - Cart to order to payment confirmation

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reklama_storefront::config::{ApiConfig, PaymentPollConfig, StorefrontConfig};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// Recorded traffic and scripted answers of the fake backend.
#[derive(Default)]
struct Backend {
    products: Mutex<Vec<Value>>,
    orders: Mutex<Vec<Value>>,
    sessions: Mutex<HashMap<String, String>>,
    payment_script: Mutex<VecDeque<Value>>,
    hits: Mutex<HashMap<&'static str, usize>>,
    authorizations: Mutex<Vec<Option<String>>>,
    base_url: Mutex<String>,
}

fn locked<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Backend {
    fn hit(&self, route: &'static str, headers: &HeaderMap) {
        *locked(&self.hits).entry(route).or_default() += 1;
        locked(&self.authorizations).push(
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
        );
    }
}

/// In-process stand-in for the storefront REST API.
///
/// The server stops when the value is dropped.
pub struct FakeBackend {
    url: Url,
    state: Arc<Backend>,
    server: JoinHandle<()>,
}

impl FakeBackend {
    /// Start a backend serving `products` on a random local port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start(products: Vec<Value>) -> Self {
        let state = Arc::new(Backend {
            products: Mutex::new(products),
            ..Backend::default()
        });

        let app = Router::new()
            .route("/api/products", get(list_products))
            .route("/api/products/{id}", get(get_product))
            .route("/api/categories", get(list_categories))
            .route("/api/orders", post(create_order))
            .route("/api/payments/checkout", post(create_checkout))
            .route("/api/payments/status/{session_id}", get(payment_status))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Listener has no address");
        let url = Url::parse(&format!("http://{addr}")).expect("Invalid backend URL");
        *locked(&state.base_url) = url.to_string();

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { url, state, server }
    }

    /// Base URL to point the client at.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Client configuration for this backend, persisting under `data_dir`.
    ///
    /// Payment polls use a short interval to keep tests fast.
    ///
    /// # Panics
    ///
    /// Panics if the origin URL literal fails to parse.
    #[must_use]
    pub fn config(&self, data_dir: &Path) -> StorefrontConfig {
        StorefrontConfig {
            api: ApiConfig {
                base_url: self.url.clone(),
                request_timeout: Duration::from_secs(5),
                catalog_cache_ttl: Duration::from_secs(300),
            },
            origin_url: Url::parse("http://localhost:3000").expect("Invalid origin URL"),
            data_dir: data_dir.to_path_buf(),
            payment_poll: PaymentPollConfig {
                max_attempts: 3,
                interval: Duration::from_millis(20),
            },
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Replace a product record, e.g. to change its price or stock.
    pub fn upsert_product(&self, product: Value) {
        let mut products = locked(&self.state.products);
        products.retain(|p| p["id"] != product["id"]);
        products.push(product);
    }

    /// Queue answers for `GET /api/payments/status/{id}`.
    ///
    /// Once the queue is empty the session reports as open and unpaid.
    pub fn script_payment_statuses(&self, statuses: impl IntoIterator<Item = Value>) {
        locked(&self.state.payment_script).extend(statuses);
    }

    /// How many times a route was requested.
    #[must_use]
    pub fn hits(&self, route: &str) -> usize {
        locked(&self.state.hits).get(route).copied().unwrap_or(0)
    }

    /// Orders received so far.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        locked(&self.state.orders).clone()
    }

    /// `Authorization` header of every request received, in order.
    #[must_use]
    pub fn authorizations(&self) -> Vec<Option<String>> {
        locked(&self.state.authorizations).clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A product record as the backend returns it.
#[must_use]
pub fn product_json(id: &str, name: &str, category: &str, price: f64, quantity: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("{name} description"),
        "price": price,
        "category": category,
        "quantity": quantity,
        "sku": format!("SKU-{id}"),
        "image_url": format!("/uploads/{id}.jpg"),
        "sort_order": 0,
        "created_at": "2025-01-15T09:30:00+00:00",
        "updated_at": "2025-01-15T09:30:00+00:00"
    })
}

// =============================================================================
// Handlers
// =============================================================================

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": format!("{what} not found") })),
    )
        .into_response()
}

#[derive(Deserialize)]
struct ProductFilter {
    category: Option<String>,
    search: Option<String>,
}

async fn list_products(
    State(state): State<Arc<Backend>>,
    headers: HeaderMap,
    Query(filter): Query<ProductFilter>,
) -> Json<Vec<Value>> {
    state.hit("products", &headers);

    let products = locked(&state.products)
        .iter()
        .filter(|p| {
            filter
                .category
                .as_ref()
                .is_none_or(|c| p["category"].as_str() == Some(c.as_str()))
        })
        .filter(|p| {
            filter.search.as_ref().is_none_or(|s| {
                let s = s.to_lowercase();
                ["name", "description"].iter().any(|field| {
                    p[*field]
                        .as_str()
                        .is_some_and(|v| v.to_lowercase().contains(&s))
                })
            })
        })
        .cloned()
        .collect();

    Json(products)
}

async fn get_product(
    State(state): State<Arc<Backend>>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
) -> Response {
    state.hit("product", &headers);

    locked(&state.products)
        .iter()
        .find(|p| p["id"] == id.as_str())
        .cloned()
        .map_or_else(|| not_found("Product"), |p| Json(p).into_response())
}

async fn list_categories(
    State(state): State<Arc<Backend>>,
    headers: HeaderMap,
) -> Json<Vec<String>> {
    state.hit("categories", &headers);

    let mut categories: Vec<String> = locked(&state.products)
        .iter()
        .filter_map(|p| p["category"].as_str().map(str::to_owned))
        .collect();
    categories.sort();
    categories.dedup();
    Json(categories)
}

async fn create_order(
    State(state): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(order): Json<Value>,
) -> Response {
    state.hit("orders", &headers);

    let Some(items) = order["items"].as_array() else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": "items required" })),
        )
            .into_response();
    };
    let total: f64 = items
        .iter()
        .map(|i| i["price"].as_f64().unwrap_or(0.0) * i["quantity"].as_f64().unwrap_or(0.0))
        .sum();

    let mut orders = locked(&state.orders);
    let id = format!("ord-{}", orders.len() + 1);
    let mut stored = order.clone();
    stored["id"] = json!(id);
    orders.push(stored);

    Json(json!({ "id": id, "total_amount": total, "status": "pending" })).into_response()
}

#[derive(Deserialize)]
struct CheckoutParams {
    order_id: String,
    origin_url: String,
}

async fn create_checkout(
    State(state): State<Arc<Backend>>,
    headers: HeaderMap,
    Query(params): Query<CheckoutParams>,
) -> Response {
    state.hit("checkout", &headers);

    if !locked(&state.orders)
        .iter()
        .any(|o| o["id"] == params.order_id.as_str())
    {
        return not_found("Order");
    }

    let mut sessions = locked(&state.sessions);
    let session_id = format!("cs_test_{}", sessions.len() + 1);
    sessions.insert(session_id.clone(), params.origin_url);

    let base = locked(&state.base_url).clone();
    Json(json!({
        "checkout_url": format!("{base}pay/{session_id}"),
        "session_id": session_id,
    }))
    .into_response()
}

async fn payment_status(
    State(state): State<Arc<Backend>>,
    headers: HeaderMap,
    UrlPath(session_id): UrlPath<String>,
) -> Response {
    state.hit("payment_status", &headers);

    if !locked(&state.sessions).contains_key(&session_id) {
        return not_found("Session");
    }

    let status = locked(&state.payment_script)
        .pop_front()
        .unwrap_or_else(|| json!({ "status": "open", "payment_status": "unpaid" }));
    Json(status).into_response()
}
