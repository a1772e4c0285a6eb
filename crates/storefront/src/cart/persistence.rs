//! Cart snapshot persistence.

use reklama_core::Price;
use tracing::{debug, warn};

use super::CartLineItem;
use crate::storage::{SharedStore, keys};

/// Reads and writes the whole cart under a single storage key.
///
/// Neither direction surfaces errors: a snapshot that cannot be read loads
/// as an empty cart, and a snapshot that cannot be written is dropped with a
/// warning.
#[derive(Clone)]
pub struct CartPersistence {
    store: SharedStore,
    key: &'static str,
}

impl CartPersistence {
    /// Persist the cart under the standard [`keys::CART`] key.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self::with_key(store, keys::CART)
    }

    /// Persist the cart under a custom key.
    #[must_use]
    pub fn with_key(store: SharedStore, key: &'static str) -> Self {
        Self { store, key }
    }

    /// Load the stored snapshot.
    ///
    /// Returns an empty cart if nothing was stored, the medium could not be
    /// read, or the data does not parse. Lines breaking cart invariants are
    /// repaired (see [`normalize`]).
    #[must_use]
    pub fn load(&self) -> Vec<CartLineItem> {
        let raw = match self.store.get(self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = self.key, error = %e, "Failed to read cart snapshot, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<CartLineItem>>(&raw) {
            Ok(lines) => normalize(lines),
            Err(e) => {
                warn!(
                    key = self.key,
                    error = %e,
                    snippet = %raw.chars().take(120).collect::<String>(),
                    "Discarding unreadable cart snapshot"
                );
                Vec::new()
            }
        }
    }

    /// Overwrite the stored snapshot with `items`.
    pub fn save(&self, items: &[CartLineItem]) {
        let json = match serde_json::to_string(items) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = self.key, error = %e, "Failed to serialize cart snapshot");
                return;
            }
        };

        match self.store.set(self.key, &json) {
            Ok(()) => debug!(key = self.key, lines = items.len(), "Saved cart snapshot"),
            Err(e) => warn!(key = self.key, error = %e, "Failed to save cart snapshot"),
        }
    }
}

/// Restore cart invariants on loaded lines.
///
/// Zero-quantity lines are dropped. Repeated product ids are merged into the
/// first occurrence, keeping its snapshot and summing quantities. Lines whose
/// amount would push the cart total out of range are dropped.
fn normalize(lines: Vec<CartLineItem>) -> Vec<CartLineItem> {
    let mut merged: Vec<CartLineItem> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            continue;
        }
        if let Some(existing) = merged.iter_mut().find(|l| l.product_id == line.product_id) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            merged.push(line);
        }
    }

    let mut total = Price::ZERO;
    merged.retain(|line| {
        match line
            .checked_line_total()
            .and_then(|amount| total.checked_add(amount))
        {
            Some(next) => {
                total = next;
                true
            }
            None => {
                warn!(product_id = %line.product_id, "Dropping cart line with out-of-range total");
                false
            }
        }
    });
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cart::test_support::{price, product};
    use crate::storage::{FileStore, KeyValueStore, MemoryStore};

    fn persistence_with(raw: &str) -> CartPersistence {
        CartPersistence::new(Arc::new(MemoryStore::with_entries([(keys::CART, raw)])))
    }

    #[test]
    fn test_missing_snapshot_loads_empty() {
        let persistence = CartPersistence::new(Arc::new(MemoryStore::new()));
        assert!(persistence.load().is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_loads_empty() {
        for raw in ["", "not json", "{\"id\":1}", "[{\"id\":\"a\"}]", "[{\"id\":\"a\",\"name\":\"A\",\"price\":1,\"quantity\":-2}]"] {
            assert!(persistence_with(raw).load().is_empty(), "raw = {raw:?}");
        }
    }

    #[test]
    fn test_loads_snapshot_written_by_web_storefront() {
        // Shape kept by the browser client: full product record plus quantity.
        let raw = r#"[{"id":"p1","name":"Vinyl banner","description":"3x1m","price":45.5,
            "category":"banners","quantity":2,"sku":"VB-1","image_url":"","sort_order":0}]"#;
        let lines = persistence_with(raw).load();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name, "Vinyl banner");
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].line_total(), price("91.00"));
    }

    #[test]
    fn test_normalize_repairs_invariants() {
        let a = CartLineItem::from_product(&product("a", "1", 9), 2);
        let b = CartLineItem::from_product(&product("b", "1", 9), 1);
        let zero = CartLineItem {
            quantity: 0,
            ..CartLineItem::from_product(&product("z", "1", 9), 1)
        };
        let mut a_again = a.clone();
        a_again.quantity = 5;

        let lines = normalize(vec![a, zero, b, a_again]);
        let summary: Vec<_> = lines
            .iter()
            .map(|l| (l.product_id.to_string(), l.quantity))
            .collect();
        assert_eq!(summary, [("a".to_string(), 7), ("b".to_string(), 1)]);
    }

    #[test]
    fn test_out_of_range_line_is_dropped_on_load() {
        let raw = r#"[{"id":"a","name":"A","price":1e20,"quantity":1000000000},
            {"id":"b","name":"B","price":2.5,"quantity":2}]"#;
        let lines = persistence_with(raw).load();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id.as_str(), "b");
        assert_eq!(crate::cart::checked_total_of(&lines), Some(price("5.00")));
    }

    #[test]
    fn test_save_then_load_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = CartPersistence::new(Arc::new(FileStore::new(dir.path())));
        let lines = vec![
            CartLineItem::from_product(&product("b", "2.10", 9), 1),
            CartLineItem::from_product(&product("a", "0.99", 9), 4),
        ];

        persistence.save(&lines);
        assert_eq!(persistence.load(), lines);
    }

    #[test]
    fn test_custom_key() {
        let medium = Arc::new(MemoryStore::new());
        let persistence = CartPersistence::with_key(medium.clone(), "wishlist");
        persistence.save(&[CartLineItem::from_product(&product("a", "1", 1), 1)]);

        assert!(medium.get("wishlist").unwrap().is_some());
        assert!(medium.get(keys::CART).unwrap().is_none());
    }
}
