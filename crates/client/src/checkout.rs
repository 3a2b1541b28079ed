//! Turning the cart into an order.

use tracing::{info, instrument, warn};
use vitrine_core::{CartStorage, CartStore, CreateOrderRequest, Order};

use crate::api::{ApiClient, ApiError};

/// Place an order for everything in the cart.
///
/// The customer id and the cart lines are validated before any request is
/// made. The cart is cleared only after the backend confirms the order; on
/// any failure it is left exactly as it was.
///
/// # Errors
///
/// Returns `ApiError::Validation` for an invalid customer id or cart, or the
/// backend error if the order could not be created.
#[instrument(skip(client, cart), fields(lines = cart.lines().len()))]
pub async fn checkout<S: CartStorage>(
    client: &ApiClient,
    cart: &mut CartStore<S>,
    customer_id: &str,
) -> Result<Order, ApiError> {
    let request = CreateOrderRequest::from_cart(customer_id, cart.lines())?;

    let order = match client.create_order(&request).await {
        Ok(order) => order,
        Err(e) => {
            warn!(error = %e, "Checkout failed, cart kept");
            return Err(e);
        }
    };

    cart.clear();
    cart.close();
    info!(order_id = %order.id, total = %order.total_cents, "Checkout complete");
    Ok(order)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use vitrine_core::{Cents, CustomerId, MemoryCartStorage, Product, ProductId, ValidationError};

    fn client() -> ApiClient {
        // Nothing listens on port 9; these cases must fail before any I/O.
        ApiClient::new(&ClientConfig::new("http://127.0.0.1:9".parse().unwrap())).unwrap()
    }

    fn cart_with_item() -> CartStore<MemoryCartStorage> {
        let mut cart = CartStore::new(MemoryCartStorage::default());
        cart.add_item(
            &Product {
                id: ProductId::generate(),
                sku: "CAF-001".into(),
                name: "Café".into(),
                description: String::new(),
                price_cents: Cents::new(1999),
                image: String::new(),
                category: None,
                in_stock: true,
            },
            2,
        );
        cart
    }

    #[tokio::test]
    async fn test_invalid_customer_keeps_cart() {
        let mut cart = cart_with_item();
        let err = checkout(&client(), &mut cart, "not-a-uuid").await.unwrap_err();

        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::InvalidCustomerId)
        ));
        assert_eq!(cart.total_items(), 2);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let mut cart = CartStore::new(MemoryCartStorage::default());
        let customer = CustomerId::generate().to_string();
        let err = checkout(&client(), &mut cart, &customer).await.unwrap_err();

        assert!(matches!(err, ApiError::Validation(ValidationError::NoItems)));
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_cart() {
        let mut cart = cart_with_item();
        let customer = CustomerId::generate().to_string();
        let err = checkout(&client(), &mut cart, &customer).await.unwrap_err();

        assert!(!matches!(err, ApiError::Validation(_)));
        assert_eq!(cart.total_items(), 2);
        assert!(cart.storage().raw().is_some());
    }
}
