//! Catalog products.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cents, ProductId};

/// A product as the cart sees it.
///
/// Immutable from the cart's perspective; the cart stores a copy per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: Cents,
    /// Image URL or path.
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

const fn default_in_stock() -> bool {
    true
}

/// Product as returned by `GET /products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: Cents,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub stock_qty: i64,
    #[serde(default)]
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ProductDto> for Product {
    fn from(dto: ProductDto) -> Self {
        Self {
            id: dto.id,
            in_stock: dto.active && dto.stock_qty > 0,
            sku: dto.sku,
            name: dto.name,
            description: dto.description,
            price_cents: dto.price_cents,
            image: dto.image_url,
            category: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dto_json(stock_qty: i64, active: bool) -> serde_json::Value {
        json!({
            "id": "5f0c6a8e-7d43-4b8f-9a59-0d2f4b1c9e01",
            "sku": "CAF-001",
            "name": "Café Especial",
            "description": "Torra média",
            "priceCents": 3990,
            "imageUrl": "https://cdn.example.com/cafe.jpg",
            "stockQty": stock_qty,
            "active": active,
            "createdAt": "2024-01-15T14:30:00Z",
            "updatedAt": "2024-01-16T09:00:00Z"
        })
    }

    #[test]
    fn test_dto_converts_to_product() {
        let dto: ProductDto = serde_json::from_value(dto_json(7, true)).unwrap();
        let product = Product::from(dto);
        assert_eq!(product.sku, "CAF-001");
        assert_eq!(product.price_cents, Cents::new(3990));
        assert_eq!(product.image, "https://cdn.example.com/cafe.jpg");
        assert!(product.in_stock);
        assert!(product.category.is_none());
    }

    #[test]
    fn test_out_of_stock_or_inactive() {
        let empty: ProductDto = serde_json::from_value(dto_json(0, true)).unwrap();
        assert!(!Product::from(empty).in_stock);

        let inactive: ProductDto = serde_json::from_value(dto_json(3, false)).unwrap();
        assert!(!Product::from(inactive).in_stock);
    }

    #[test]
    fn test_product_wire_names() {
        let dto: ProductDto = serde_json::from_value(dto_json(1, true)).unwrap();
        let value = serde_json::to_value(Product::from(dto)).unwrap();
        assert_eq!(value["priceCents"], 3990);
        assert_eq!(value["inStock"], true);
        assert!(value.get("category").is_none());
    }
}
