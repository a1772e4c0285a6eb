//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for the edge of the application (the
//! CLI, or any other front end). Unexpected failures are captured to Sentry
//! before they are reported; expected ones (bad input, empty cart) are not.

use thiserror::Error;

use reklama_core::{EmailError, UnknownLanguage};

use crate::api::ApiError;
use crate::cart::AvailabilityError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Local storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Storefront API operation failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Checkout could not be completed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Requested quantity is not in stock.
    #[error("{0}")]
    Availability(#[from] AvailabilityError),

    /// Email address was rejected.
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    /// Unsupported language code.
    #[error("{0}")]
    Language(#[from] UnknownLanguage),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether this error indicates a fault rather than a user mistake.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        match self {
            Self::Storage(_) | Self::Config(_) => true,
            Self::Api(err) | Self::Checkout(CheckoutError::Api(err)) => is_unexpected_api(err),
            Self::Checkout(_)
            | Self::Availability(_)
            | Self::Email(_)
            | Self::Language(_)
            | Self::NotFound(_)
            | Self::BadRequest(_) => false,
        }
    }

    /// Capture unexpected errors to Sentry and log them.
    ///
    /// Returns the Sentry event id when the error was captured.
    pub fn capture(&self) -> Option<sentry::types::Uuid> {
        if !self.is_unexpected() {
            return None;
        }

        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Storefront error"
        );
        Some(event_id)
    }

    /// Message safe to show to the customer.
    ///
    /// Internal details (paths, status bodies) are never included.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(_) => "Could not access local storage".to_string(),
            Self::Config(err) => err.to_string(),
            Self::Api(err) | Self::Checkout(CheckoutError::Api(err)) => api_message(err),
            Self::Checkout(CheckoutError::EmptyCart) => "Your cart is empty".to_string(),
            Self::Checkout(err) => err.to_string(),
            Self::Availability(err) => err.to_string(),
            Self::Email(_) => "Invalid email address".to_string(),
            Self::Language(err) => err.to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::BadRequest(msg) => msg.clone(),
        }
    }
}

const fn is_unexpected_api(err: &ApiError) -> bool {
    match err {
        ApiError::Http(_) | ApiError::Parse(_) | ApiError::InvalidUrl(_) => true,
        ApiError::Status { status, .. } => *status >= 500,
        ApiError::NotFound(_) | ApiError::RateLimited(_) => false,
    }
}

fn api_message(err: &ApiError) -> String {
    match err {
        ApiError::NotFound(what) => format!("{what} not found"),
        ApiError::RateLimited(secs) => {
            format!("Too many requests, please try again in {secs} seconds")
        }
        ApiError::Status { status, message } if *status < 500 => message.clone(),
        ApiError::Http(_) => "Could not reach the store, please try again".to_string(),
        _ => "External service error".to_string(),
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
