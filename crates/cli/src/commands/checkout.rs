//! Checkout command.

use reklama_storefront::checkout::{self, CustomerDetails};
use reklama_storefront::error::Result;
use reklama_storefront::state::AppState;

/// Submit the cart and print the payment link.
#[allow(clippy::print_stdout)]
pub async fn run(state: &AppState, name: &str, email: &str, phone: &str, address: &str) -> Result<()> {
    let customer = CustomerDetails::new(name, email, phone, address)?;

    super::print_cart(&state.cart().snapshot());
    println!();

    let redirect = checkout::submit(
        state.cart(),
        state.api(),
        &customer,
        &state.config().origin_url,
    )
    .await?;

    println!("Order {} created", redirect.order_id);
    println!("Complete your payment at:");
    println!("  {}", redirect.checkout_url);
    println!();
    println!("Then confirm it with:");
    println!("  rk payment confirm {}", redirect.session_id);
    Ok(())
}
