//! Command implementations.
//!
//! Output goes to stdout; logs go to stderr.

pub mod cart;
pub mod checkout;
pub mod payment;
pub mod prefs;
pub mod products;

use reklama_storefront::cart::CartSnapshot;

/// Print cart lines followed by the item count and total.
#[allow(clippy::print_stdout)]
fn print_cart(snapshot: &CartSnapshot) {
    if snapshot.is_empty() {
        println!("Your cart is empty");
        return;
    }

    for line in snapshot.items() {
        println!(
            "{:<12} {:<32} {:>4} x {:>10} = {:>10}",
            line.product_id.as_str(),
            truncate(&line.name, 32),
            line.quantity,
            line.unit_price.to_string(),
            line.line_total().to_string(),
        );
    }
    println!();
    println!("Items: {}", snapshot.count());
    println!("Total: {}", snapshot.total());
}

/// Shorten `s` to at most `max` characters, marking the cut with "...".
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
