//! User preferences kept next to the cart.

use reklama_core::Language;
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use crate::storage::{SharedStore, StorageError, keys};

/// Display language and admin token, persisted across runs.
#[derive(Clone)]
pub struct Preferences {
    store: SharedStore,
}

impl Preferences {
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Selected display language.
    ///
    /// Falls back to English when nothing is stored, the stored code is not
    /// supported, or the medium cannot be read.
    #[must_use]
    pub fn language(&self) -> Language {
        match self.store.get(keys::LANGUAGE) {
            Ok(Some(code)) => code.parse().unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring stored language");
                Language::default()
            }),
            Ok(None) => Language::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read language preference");
                Language::default()
            }
        }
    }

    /// Persist the display language.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium rejects the write.
    pub fn set_language(&self, language: Language) -> Result<(), StorageError> {
        self.store.set(keys::LANGUAGE, language.code())
    }

    /// Stored admin token, if any.
    #[must_use]
    pub fn admin_token(&self) -> Option<SecretString> {
        match self.store.get(keys::ADMIN_TOKEN) {
            Ok(token) => token
                .filter(|t| !t.trim().is_empty())
                .map(SecretString::from),
            Err(e) => {
                warn!(error = %e, "Failed to read admin token");
                None
            }
        }
    }

    /// Persist the admin token.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium rejects the write.
    pub fn set_admin_token(&self, token: &SecretString) -> Result<(), StorageError> {
        self.store.set(keys::ADMIN_TOKEN, token.expose_secret().trim())
    }

    /// Forget the admin token.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be modified.
    pub fn clear_admin_token(&self) -> Result<(), StorageError> {
        self.store.remove(keys::ADMIN_TOKEN)
    }
}

impl std::fmt::Debug for Preferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preferences")
            .field("language", &self.language())
            .field(
                "admin_token",
                &self.admin_token().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}
