//! Cart commands.

use reklama_core::ProductId;
use reklama_storefront::cart::check_availability;
use reklama_storefront::error::{AppError, Result, add_breadcrumb};
use reklama_storefront::state::AppState;

/// Print the cart.
pub fn show(state: &AppState) {
    super::print_cart(&state.cart().snapshot());
}

/// Add `quantity` units of a product after checking live stock.
#[allow(clippy::print_stdout)]
pub async fn add(state: &AppState, id: &str, quantity: i64) -> Result<()> {
    if quantity < 1 {
        return Err(AppError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let product = state.api().get_product_fresh(&ProductId::new(id)).await?;
    check_availability(&product, quantity)?;

    state.cart().add_item(&product, quantity);
    add_breadcrumb("cart", "Added item", Some(&[("product_id", id)]));

    println!("Added {quantity} x {} to cart", product.name);
    super::print_cart(&state.cart().snapshot());
    Ok(())
}

/// Set the quantity of an existing line; zero or less removes it.
pub fn update(state: &AppState, id: &str, quantity: i64) -> Result<()> {
    let product_id = ProductId::new(id);
    if state.cart().line(&product_id).is_none() {
        return Err(AppError::NotFound(format!("Cart item {id}")));
    }
    // Unchanged quantity is a no-op, not an error
    state.cart().update_quantity(&product_id, quantity);
    super::print_cart(&state.cart().snapshot());
    Ok(())
}

/// Remove a line.
pub fn remove(state: &AppState, id: &str) -> Result<()> {
    if !state.cart().remove_item(&ProductId::new(id)) {
        return Err(AppError::NotFound(format!("Cart item {id}")));
    }
    super::print_cart(&state.cart().snapshot());
    Ok(())
}

/// Empty the cart.
#[allow(clippy::print_stdout)]
pub fn clear(state: &AppState) {
    state.cart().clear();
    println!("Cart cleared");
}
