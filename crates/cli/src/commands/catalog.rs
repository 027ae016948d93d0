//! Catalog commands.

use tienda_core::{Category, ProductId};
use tienda_storefront::AppState;
use tienda_storefront::backend::Backend;
use tienda_storefront::db::OrderRepository;
use tienda_storefront::models::Product;
use tienda_storefront::services::catalog::ProductFilter;
use tienda_storefront::storage::LocalStore;

use crate::error::Result;

/// List products matching the given filters.
///
/// # Errors
///
/// Returns an error when logged out or the catalog cannot be fetched.
pub async fn list<B: Backend, S: LocalStore, R: OrderRepository>(
    state: &AppState<B, S, R>,
    search: Option<String>,
    category: Option<Category>,
    exact_accents: bool,
) -> Result<()> {
    let mut filter = ProductFilter::new().accent_insensitive(!exact_accents);
    if let Some(query) = search {
        filter = filter.with_query(query);
    }
    if let Some(category) = category {
        filter = filter.with_category(category);
    }

    let products = state.products(&filter).await?;

    #[allow(clippy::print_stdout)]
    {
        if products.is_empty() {
            println!("No products found");
        }
        for product in &products {
            println!("{}", summary_line(product));
        }
    }
    Ok(())
}

/// Show one product in full.
///
/// # Errors
///
/// Returns an error when logged out or the product does not exist.
pub async fn show<B: Backend, S: LocalStore, R: OrderRepository>(
    state: &AppState<B, S, R>,
    id: i64,
) -> Result<()> {
    let product = state.product(ProductId::new(id)).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{}", product.name);
        println!("  id:       {}", product.id);
        println!("  price:    {}", product.price);
        println!("  stock:    {}", product.stock);
        if let Some(category) = &product.category {
            println!("  category: {category}");
        }
        if let Some(description) = &product.description {
            println!();
            println!("{description}");
        }
    }
    Ok(())
}

fn summary_line(product: &Product) -> String {
    let category = product
        .category
        .as_ref()
        .map_or_else(String::new, |c| format!(" [{c}]"));
    let stock = if product.in_stock() {
        format!("{} in stock", product.stock)
    } else {
        "out of stock".to_owned()
    };
    format!(
        "{:>5}  {:<32} {:>10}  {stock}{category}",
        product.id.to_string(),
        product.name,
        product.price.to_string()
    )
}
