//! Catalog commands.

use reklama_core::ProductId;
use reklama_storefront::api::ProductQuery;
use reklama_storefront::error::Result;
use reklama_storefront::state::AppState;

/// List products, optionally filtered by category or search term.
#[allow(clippy::print_stdout)]
pub async fn list(state: &AppState, category: Option<String>, search: Option<String>) -> Result<()> {
    let products = state
        .api()
        .list_products(&ProductQuery { category, search })
        .await?;

    if products.is_empty() {
        println!("No products found");
        return Ok(());
    }

    for product in &products {
        let stock = if product.in_stock() {
            format!("{} in stock", product.stock)
        } else {
            "out of stock".to_string()
        };
        println!(
            "{:<12} {:<32} {:<14} {:>10}  {}",
            product.id.as_str(),
            super::truncate(&product.name, 32),
            product.category,
            product.price.to_string(),
            stock,
        );
    }
    Ok(())
}

/// Show a single product.
#[allow(clippy::print_stdout)]
pub async fn show(state: &AppState, id: &str) -> Result<()> {
    let product = state.api().get_product(&ProductId::new(id)).await?;

    println!("{}", product.name);
    println!("  ID:       {}", product.id);
    if !product.sku.is_empty() {
        println!("  SKU:      {}", product.sku);
    }
    println!("  Category: {}", product.category);
    println!("  Price:    {}", product.price);
    if product.in_stock() {
        println!("  Stock:    {}", product.stock);
    } else {
        println!("  Stock:    out of stock");
    }
    if let Some(image) = product.image() {
        println!("  Image:    {image}");
    }
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }
    Ok(())
}

/// List the catalog's categories.
#[allow(clippy::print_stdout)]
pub async fn categories(state: &AppState) -> Result<()> {
    for category in state.api().list_categories().await? {
        println!("{category}");
    }
    Ok(())
}
