//! Cart and checkout commands.

use vitrine_client::ProductQuery;
use vitrine_core::{CartStorage, CartStore, CustomerId, Product, ProductId, format_price};

use super::{CliError, Context, orders};

/// Look up a product by exact SKU.
async fn find_by_sku(ctx: &Context, sku: &str) -> Result<Product, CliError> {
    let query = ProductQuery {
        q: Some(sku.to_string()),
        active: true,
        page: 0,
        size: 50,
    };
    let page = ctx.client.list_products(&query).await?;

    page.content
        .into_iter()
        .find(|dto| dto.sku.eq_ignore_ascii_case(sku))
        .map(Product::from)
        .ok_or_else(|| CliError::UnknownSku(sku.to_string()))
}

fn sku_in_cart<S: CartStorage>(cart: &CartStore<S>, sku: &str) -> Result<ProductId, CliError> {
    cart.lines()
        .iter()
        .find(|line| line.product.sku.eq_ignore_ascii_case(sku))
        .map(|line| line.product.id)
        .ok_or_else(|| CliError::NotInCart(sku.to_string()))
}

/// Render the cart as text.
pub fn render<S: CartStorage>(cart: &CartStore<S>) -> String {
    if cart.is_empty() {
        return "Seu carrinho está vazio".to_string();
    }

    let mut out = String::new();
    for line in cart.lines() {
        out.push_str(&format!(
            "{:<12} {:<32} {:>3} x {:>12} = {:>12}\n",
            line.product.sku,
            line.product.name,
            line.quantity,
            format_price(line.product.price_cents),
            format_price(line.line_total()),
        ));
    }
    out.push_str(&format!(
        "{} itens, total {}",
        cart.total_items(),
        format_price(cart.total_price())
    ));
    out
}

pub fn show(ctx: &Context) {
    println!("{}", render(&ctx.cart()));
}

pub async fn add(ctx: &Context, sku: &str, quantity: u32) -> Result<(), CliError> {
    let product = find_by_sku(ctx, sku).await?;
    if !product.in_stock {
        return Err(CliError::OutOfStock(product.sku));
    }

    let mut cart = ctx.cart();
    cart.add_item(&product, quantity);
    tracing::info!(sku = %product.sku, quantity, "Added to cart");
    println!("{}", render(&cart));
    Ok(())
}

pub fn remove(ctx: &Context, sku: &str) -> Result<(), CliError> {
    let mut cart = ctx.cart();
    let id = sku_in_cart(&cart, sku)?;
    cart.remove_item(&id);
    println!("{}", render(&cart));
    Ok(())
}

pub fn update(ctx: &Context, sku: &str, quantity: i64) -> Result<(), CliError> {
    let mut cart = ctx.cart();
    let id = sku_in_cart(&cart, sku)?;
    cart.update_quantity(&id, quantity);
    println!("{}", render(&cart));
    Ok(())
}

pub fn clear(ctx: &Context) {
    ctx.cart().clear();
    println!("Carrinho esvaziado");
}

pub async fn checkout(ctx: &Context, customer: Option<&str>) -> Result<(), CliError> {
    let customer = customer.map_or_else(
        || {
            let id = CustomerId::generate();
            println!("ID do cliente gerado: {id}");
            id.to_string()
        },
        str::to_string,
    );

    let mut cart = ctx.cart();
    let order = vitrine_client::checkout(&ctx.client, &mut cart, &customer).await?;

    println!("Pedido criado com sucesso!");
    println!("{}", orders::render(&order));
    Ok(())
}
