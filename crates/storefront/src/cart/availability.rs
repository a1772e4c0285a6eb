//! Stock checks performed by consumers before adding to the cart.
//!
//! The cart holds only product snapshots, so it cannot know live inventory.
//! Views check the freshly fetched product instead, the same way the product
//! page does before enabling "Add to cart".

use thiserror::Error;

use crate::api::Product;

/// Why a product cannot be added in the requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AvailabilityError {
    /// No units left.
    #[error("{name} is out of stock")]
    OutOfStock { name: String },

    /// Fewer units left than requested.
    #[error("Only {available} of {name} available")]
    InsufficientStock { name: String, available: i64 },
}

/// Check that `requested` units of `product` can be added.
///
/// Compares against the product's stock only; units already in the cart are
/// not subtracted.
///
/// # Errors
///
/// Returns [`AvailabilityError`] when the product is out of stock or has
/// fewer than `requested` units.
pub fn check_availability(product: &Product, requested: i64) -> Result<(), AvailabilityError> {
    if product.stock <= 0 {
        return Err(AvailabilityError::OutOfStock {
            name: product.name.clone(),
        });
    }
    if requested > product.stock {
        return Err(AvailabilityError::InsufficientStock {
            name: product.name.clone(),
            available: product.stock,
        });
    }
    Ok(())
}
