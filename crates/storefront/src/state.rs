//! Application state shared by every front end.

use std::sync::Arc;

use crate::api::{ApiClient, ApiError};
use crate::cart::{CartPersistence, CartStore};
use crate::config::StorefrontConfig;
use crate::payment::PaymentPoller;
use crate::preferences::Preferences;
use crate::storage::{FileStore, SharedStore};

/// Application state for one storefront session.
///
/// This struct is cheaply cloneable via `Arc` and owns the single cart store
/// of the session, together with the API client and preferences built on
/// the same storage medium.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    cart: CartStore,
    preferences: Preferences,
    poller: PaymentPoller,
}

impl AppState {
    /// Create application state persisting to `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built from `config`.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let store: SharedStore = Arc::new(FileStore::new(config.data_dir.clone()));
        Self::with_store(config, store)
    }

    /// Create application state over an explicit storage medium.
    ///
    /// The cart is hydrated from `store` and the API client picks up the
    /// stored admin token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built from `config`.
    pub fn with_store(config: StorefrontConfig, store: SharedStore) -> Result<Self, ApiError> {
        let preferences = Preferences::new(Arc::clone(&store));
        let api = ApiClient::new(&config.api, preferences.admin_token())?;
        let cart = CartStore::new(CartPersistence::new(store));
        let poller = PaymentPoller::from_config(&config.payment_poll);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                cart,
                preferences,
                poller,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the storefront API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the session's cart.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Get a reference to the stored preferences.
    #[must_use]
    pub fn preferences(&self) -> &Preferences {
        &self.inner.preferences
    }

    /// Get the payment poller configured for this session.
    #[must_use]
    pub fn poller(&self) -> PaymentPoller {
        self.inner.poller
    }
}
