//! The authoritative cart state and its mutation operations.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reklama_core::{Price, ProductId};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{CartLineItem, CartPersistence, CartSnapshot, count_of, total_of};
use crate::api::Product;
use crate::storage::MemoryStore;

/// Shared handle to the cart.
///
/// Cheap to clone; all clones operate on the same cart. Construct one per
/// session and pass it to whatever needs it (see [`crate::state::AppState`]).
///
/// None of the operations fail. Invalid input (a non-positive quantity, an
/// unknown product id) leaves the cart untouched and is reported only
/// through the `bool` return value.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    lines: Mutex<Vec<CartLineItem>>,
    persistence: CartPersistence,
    updates: watch::Sender<CartSnapshot>,
}

impl CartStore {
    /// Create a store hydrated from `persistence`.
    ///
    /// A missing or unreadable snapshot yields an empty cart.
    #[must_use]
    pub fn new(persistence: CartPersistence) -> Self {
        let lines = persistence.load();
        debug!(lines = lines.len(), "Hydrated cart");
        let (updates, _) = watch::channel(CartSnapshot::from_lines(&lines));

        Self {
            inner: Arc::new(CartStoreInner {
                lines: Mutex::new(lines),
                persistence,
                updates,
            }),
        }
    }

    /// Create an empty store backed by a fresh [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(CartPersistence::new(Arc::new(MemoryStore::new())))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of `product`.
    ///
    /// Increments the existing line for the product, or appends a new line
    /// snapshotting its display fields and current price. Stock is not
    /// checked here; see [`super::check_availability`].
    ///
    /// Returns `false` (and does nothing) if `quantity < 1`, if the line is
    /// already at the maximum quantity, or if the cart total would no longer
    /// be representable.
    pub fn add_item(&self, product: &Product, quantity: i64) -> bool {
        if quantity < 1 {
            return false;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        self.mutate(|lines| {
            let existing = lines.iter().find(|l| l.product_id == product.id);
            let (unit_price, merged) = match existing {
                Some(line) => {
                    let merged = line.quantity.saturating_add(quantity);
                    if merged == line.quantity {
                        return false;
                    }
                    (line.unit_price, merged)
                }
                None => (product.price, quantity),
            };
            if !total_fits(lines, &product.id, unit_price, merged) {
                warn!(product_id = %product.id, quantity = merged, "Refusing add, cart total out of range");
                return false;
            }

            if let Some(line) = lines.iter_mut().find(|l| l.product_id == product.id) {
                line.quantity = merged;
            } else {
                lines.push(CartLineItem::from_product(product, quantity));
            }
            true
        })
    }

    /// Set the quantity of the line for `product_id`.
    ///
    /// A quantity of zero or less removes the line. Returns `false` if the
    /// product is not in the cart, already has that quantity, or the cart
    /// total would no longer be representable.
    pub fn update_quantity(&self, product_id: &ProductId, quantity: i64) -> bool {
        self.mutate(|lines| {
            let Some(index) = lines.iter().position(|l| &l.product_id == product_id) else {
                return false;
            };
            if quantity <= 0 {
                lines.remove(index);
                return true;
            }

            let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
            let Some(unit_price) = lines
                .get(index)
                .filter(|line| line.quantity != quantity)
                .map(|line| line.unit_price)
            else {
                return false;
            };
            if !total_fits(lines, product_id, unit_price, quantity) {
                warn!(%product_id, quantity, "Refusing update, cart total out of range");
                return false;
            }

            if let Some(line) = lines.get_mut(index) {
                line.quantity = quantity;
            }
            true
        })
    }

    /// Remove the line for `product_id`. Returns `false` if it was absent.
    pub fn remove_item(&self, product_id: &ProductId) -> bool {
        self.mutate(|lines| {
            let before = lines.len();
            lines.retain(|l| &l.product_id != product_id);
            lines.len() != before
        })
    }

    /// Empty the cart.
    ///
    /// Always writes through, even when the cart is already empty in memory,
    /// so a stale persisted snapshot cannot survive an explicit clear.
    pub fn clear(&self) {
        self.mutate(|lines| {
            lines.clear();
            true
        });
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Exact sum of `unit_price * quantity` over all lines.
    #[must_use]
    pub fn cart_total(&self) -> Price {
        total_of(&self.lock())
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn cart_count(&self) -> u64 {
        count_of(&self.lock())
    }

    /// Copy of the lines in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartLineItem> {
        self.lock().clone()
    }

    /// Copy of the line for `product_id`, if present.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<CartLineItem> {
        self.lock()
            .iter()
            .find(|l| &l.product_id == product_id)
            .cloned()
    }

    /// Returns `true` if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Current lines with derived totals.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot::from_lines(&self.lock())
    }

    /// Observe every snapshot published after a mutation.
    ///
    /// The receiver starts at the current snapshot. Dropping it unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.inner.updates.subscribe()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock(&self) -> MutexGuard<'_, Vec<CartLineItem>> {
        self.inner
            .lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` and, if it reports a modification, write through and
    /// publish. Both happen under the lock so persisted and published
    /// snapshots follow mutation order.
    fn mutate(&self, change: impl FnOnce(&mut Vec<CartLineItem>) -> bool) -> bool {
        let mut lines = self.lock();
        if !change(&mut *lines) {
            return false;
        }

        self.inner.persistence.save(&lines);
        self.inner
            .updates
            .send_replace(CartSnapshot::from_lines(&lines));
        true
    }
}

/// Whether the cart total stays representable once the line for
/// `product_id` holds `quantity` units at `unit_price`.
fn total_fits(
    lines: &[CartLineItem],
    product_id: &ProductId,
    unit_price: Price,
    quantity: u32,
) -> bool {
    unit_price
        .checked_times(quantity)
        .and_then(|line_total| {
            lines
                .iter()
                .filter(|l| &l.product_id != product_id)
                .try_fold(line_total, |total, l| {
                    total.checked_add(l.checked_line_total()?)
                })
        })
        .is_some()
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines = self.lock();
        f.debug_struct("CartStore")
            .field("lines", &lines.len())
            .field("count", &count_of(&lines))
            .field("total", &total_of(&lines))
            .finish_non_exhaustive()
    }
}
