//! Catalog commands.

use vitrine_client::ProductQuery;
use vitrine_core::{Page, Product, ProductDto, format_price};

use super::{CliError, Context};

fn render(page: Page<ProductDto>) -> String {
    if page.content.is_empty() {
        return "Nenhum produto encontrado".to_string();
    }

    let footer = format!(
        "Página {} de {} ({} produtos)",
        page.position(),
        page.total_pages.max(1),
        page.total_elements
    );
    let next = page.has_next().then(|| format!("Mais produtos: --page {}", page.position()));
    let mut lines: Vec<String> = page
        .map(Product::from)
        .content
        .iter()
        .map(|p| {
            format!(
                "{:<12} {:<32} {:>12}  {}",
                p.sku,
                p.name,
                format_price(p.price_cents),
                if p.in_stock { "Em estoque" } else { "Esgotado" }
            )
        })
        .collect();
    lines.push(footer);
    lines.extend(next);
    lines.join("\n")
}

pub async fn list(
    ctx: &Context,
    search: Option<String>,
    page: u32,
    size: u32,
    active: bool,
) -> Result<(), CliError> {
    let query = ProductQuery {
        q: search,
        active,
        page,
        size,
    };
    let page = ctx.client.list_products(&query).await?;
    println!("{}", render(page));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_render_marks_stock() {
        let page: Page<ProductDto> = serde_json::from_str(
            r#"{
                "content": [
                    {"id": "9b2e6f1a-3c4d-4e5f-8a9b-0c1d2e3f4a5b", "sku": "CAF-001",
                     "name": "Café", "priceCents": 1999, "stockQty": 5, "active": true},
                    {"id": "9b2e6f1a-3c4d-4e5f-8a9b-0c1d2e3f4a5c", "sku": "CHA-002",
                     "name": "Chá", "priceCents": 850, "stockQty": 0, "active": true}
                ],
                "totalElements": 2, "totalPages": 1, "number": 0, "size": 12
            }"#,
        )
        .unwrap();

        let text = render(page);
        let lines: Vec<_> = text.lines().collect();
        assert!(lines[0].contains("R$ 19,99") && lines[0].ends_with("Em estoque"));
        assert!(lines[1].ends_with("Esgotado"));
        assert_eq!(lines[2], "Página 1 de 1 (2 produtos)");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_render_points_to_next_page() {
        let page: Page<ProductDto> = serde_json::from_str(
            r#"{
                "content": [
                    {"id": "9b2e6f1a-3c4d-4e5f-8a9b-0c1d2e3f4a5b", "sku": "CAF-001",
                     "name": "Café", "priceCents": 1999, "stockQty": 5, "active": true}
                ],
                "page": {"size": 1, "number": 0, "totalElements": 3, "totalPages": 3}
            }"#,
        )
        .unwrap();

        let text = render(page);
        assert!(text.ends_with("Página 1 de 3 (3 produtos)\nMais produtos: --page 1"));
    }
}
