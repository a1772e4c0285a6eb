//! Durable local key-value storage.
//!
//! The storefront keeps a handful of values between runs: the cart snapshot,
//! the chosen display language and the admin token. Each lives under a fixed
//! key and is always written wholesale (last writer wins).
//!
//! # Backends
//!
//! - [`FileStore`] - one file per key inside a data directory
//! - [`MemoryStore`] - process-local map, for tests and throwaway sessions

mod file;
mod memory;

use std::sync::Arc;

use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Well-known storage keys.
pub mod keys {
    /// Serialized array of cart line items.
    pub const CART: &str = "reklama_cart";
    /// Selected display-language code.
    pub const LANGUAGE: &str = "reklama_language";
    /// Admin bearer token.
    pub const ADMIN_TOKEN: &str = "admin_token";
}

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error on key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Key contains characters that cannot be stored.
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Backend refused the write (quota, read-only medium).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// A durable string-to-string store.
///
/// Implementations must be thread-safe; the cart store shares one backend
/// between its clones.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, or `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be modified.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Shared handle to a storage backend.
pub type SharedStore = Arc<dyn KeyValueStore>;

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}
