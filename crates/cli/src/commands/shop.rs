//! Catalog, cart and menu commands.

use std::collections::{BTreeMap, BTreeSet};

use vitrine_core::{FilterValueId, ProductId};
use vitrine_storefront::Storefront;
use vitrine_storefront::models::{CatalogQuery, MenuItem, Product};

use super::CliError;

/// Print one catalog page for `search` and `filters` (`field=id` pairs).
pub async fn list_catalog(
    app: &Storefront,
    search: &str,
    page: u32,
    filters: &[String],
) -> Result<(), CliError> {
    let mut query = CatalogQuery::new(app.preferences().snapshot().items_per_page);
    query.search = search.to_string();
    query.filters = parse_filters(filters)?;
    query.page = page.max(1);

    let listing = app.api().list_catalog(&query).await?;
    for product in &listing.items {
        print_product_line(app, product);
    }
    println!(
        "page {} - {} of {} product(s)",
        query.page,
        listing.items.len(),
        listing.total
    );
    for group in &listing.filters {
        let values = group
            .values
            .iter()
            .map(|v| format!("{}={}", v.id, v.label))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {} ({}): {values}", group.title, group.field);
    }
    Ok(())
}

pub async fn show_product(app: &Storefront, id: ProductId) -> Result<(), CliError> {
    let product = app.catalog().load_item(id).await?;
    println!("{} [{}]", product.title, product.id);
    println!("{}", product.price);
    println!("{}", if product.in_stock { "in stock" } else { "out of stock" });
    if let Some(description) = &product.description {
        println!();
        println!("{description}");
    }
    Ok(())
}

pub async fn show_cart(app: &Storefront) -> Result<(), CliError> {
    app.cart().fetch_cart().await?;
    let cart = app.cart().snapshot();
    if cart.items.is_empty() {
        println!("Cart is empty");
        return Ok(());
    }
    for item in &cart.items {
        println!(
            "{:>6}  {} x{}  {}",
            item.product.id, item.product.title, item.quantity, item.product.price
        );
    }
    println!("{} item(s)", cart.count);
    Ok(())
}

pub async fn toggle_cart(app: &Storefront, id: ProductId) -> Result<(), CliError> {
    let added = app.cart().toggle_cart_item(id).await?;
    let verb = if added { "Added" } else { "Removed" };
    println!("{verb} product {id}; cart has {} item(s)", app.cart().count());
    Ok(())
}

pub async fn show_menu(app: &Storefront) -> Result<(), CliError> {
    let menu = app.menu().menu().await?;
    print_menu_items(&menu.items, 0);
    if !menu.categories.is_empty() {
        println!();
        for category in &menu.categories {
            println!("{:>6}  {}", category.id, category.title);
        }
    }
    Ok(())
}

fn print_product_line(app: &Storefront, product: &Product) {
    let marker = if app.cart().is_in_cart(product.id) { "*" } else { " " };
    println!(
        "{marker}{:>6}  {}  {}",
        product.id, product.title, product.price
    );
}

fn print_menu_items(items: &[MenuItem], depth: usize) {
    for item in items {
        println!("{:indent$}{} ({})", "", item.title, item.url, indent = depth * 2);
        print_menu_items(&item.children, depth + 1);
    }
}

fn parse_filters(args: &[String]) -> Result<BTreeMap<String, BTreeSet<FilterValueId>>, CliError> {
    let mut filters: BTreeMap<String, BTreeSet<FilterValueId>> = BTreeMap::new();
    for arg in args {
        let (field, value) = arg
            .split_once('=')
            .ok_or_else(|| CliError::InvalidFilter(arg.clone()))?;
        let field = field.trim();
        let value: FilterValueId = value
            .parse()
            .map_err(|_| CliError::InvalidFilter(arg.clone()))?;
        if field.is_empty() {
            return Err(CliError::InvalidFilter(arg.clone()));
        }
        filters.entry(field.to_string()).or_default().insert(value);
    }
    Ok(filters)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filters_groups_by_field() {
        let args = vec!["brand=3".to_string(), "brand=1".to_string(), "color=7".to_string()];
        let filters = parse_filters(&args).unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(
            filters["brand"].iter().copied().collect::<Vec<_>>(),
            vec![FilterValueId::new(1), FilterValueId::new(3)]
        );
    }

    #[test]
    fn test_parse_filters_rejects_malformed() {
        assert!(parse_filters(&["brand".to_string()]).is_err());
        assert!(parse_filters(&["=3".to_string()]).is_err());
        assert!(parse_filters(&["brand=red".to_string()]).is_err());
    }
}
