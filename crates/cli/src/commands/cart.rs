//! Cart commands.
//!
//! # Environment Variables
//!
//! - `STOCK_API_URL` - Base URL of the product API
//! - `CART_DATA_DIR` - Directory holding the persisted cart

use std::fmt::Write as _;

use stockcart::{
    CartConfig, CartStore, FileMirror, HttpStockOracle, OracleError, StoreOptions, TracingSink,
};
use stockcart_core::Cart;

/// Store wired to the product API and the file mirror.
pub type Store = CartStore<HttpStockOracle, FileMirror, TracingSink>;

/// Open the cart store described by `config`.
///
/// # Errors
///
/// Returns `OracleError::Http` if the HTTP client cannot be built.
pub async fn open_store(config: &CartConfig) -> Result<Store, OracleError> {
    let oracle = HttpStockOracle::new(&config.stock_api)?;
    let mirror = FileMirror::new(&config.data_dir);

    Ok(CartStore::open(oracle, mirror, TracingSink, StoreOptions::from(config)).await)
}

/// Render a cart as a plain-text table.
pub fn render(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Cart is empty\n".to_string();
    }

    let mut out = String::new();
    for item in cart.items() {
        let _ = writeln!(
            out,
            "{:>6}  {:<32}  {:>4} x {:>9.2}  = {:>10.2}",
            item.id().as_u32(),
            item.product.title,
            item.amount,
            item.product.price,
            item.line_total(),
        );
    }
    let _ = writeln!(
        out,
        "{} item(s), {} unit(s), subtotal {:.2}",
        cart.len(),
        cart.total_quantity(),
        cart.subtotal()
    );
    out
}

/// Print a cart to stdout.
pub fn print(cart: &Cart) {
    #[allow(clippy::print_stdout)]
    {
        print!("{}", render(cart));
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use stockcart_core::{LineItem, Product, ProductId};

    use super::*;

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&Cart::new()), "Cart is empty\n");
    }

    #[test]
    fn test_render_totals() {
        let cart = Cart::from_items([
            LineItem::new(
                Product::new(ProductId::new(1), "Road runner", Decimal::new(17_990, 2), ""),
                2,
            ),
            LineItem::new(
                Product::new(ProductId::new(2), "Trail runner", Decimal::new(5_000, 2), ""),
                1,
            ),
        ]);

        let out = render(&cart);
        assert_eq!(out.lines().count(), 3);
        assert!(out.lines().next().is_some_and(|line| line.contains("Road runner")));
        assert!(out.contains("359.80"));
        assert!(out.ends_with("2 item(s), 3 unit(s), subtotal 409.80\n"));
    }
}
