//! Order commands.

use vitrine_client::{ApiError, OrderListQuery, OrderSync, Subscription, SyncEvent};
use vitrine_core::{CustomerId, Order, OrderStatus, Page, format_date, format_price};

use super::{CliError, Context, parse_order_id};

/// The progress timeline, e.g. `[x] Novo -> [x] Pagamento Pendente -> [ ] Pago -> [ ] Enviado`.
///
/// Cancelled orders have no progress.
pub fn timeline(status: OrderStatus) -> String {
    if status == OrderStatus::Cancelled {
        return format!("[!] {}", status.label());
    }

    OrderStatus::TIMELINE
        .iter()
        .map(|step| {
            let done = step.progress_percent() <= status.progress_percent();
            format!("[{}] {}", if done { 'x' } else { ' ' }, step.label())
        })
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Render an order with its items.
pub fn render(order: &Order) -> String {
    let mut lines = vec![
        format!("Pedido {} ({})", order.reference(), order.id),
        format!("Status:  {} - {}", order.status.label(), order.status.description()),
        format!("         {}", timeline(order.status)),
        format!("Criado:  {}", format_date(&order.created_at)),
        format!("Cliente: {}", order.customer_id),
    ];
    lines.extend(order.items.iter().map(|item| {
        format!(
            "  {:<12} {:>3} x {:>12} = {:>12}",
            item.sku,
            item.qty,
            format_price(item.price_cents),
            format_price(item.line_total())
        )
    }));
    lines.push(format!(
        "Total:   {} ({} itens)",
        format_price(order.total_cents),
        order.total_units()
    ));
    lines.join("\n")
}

fn render_row(order: &Order) -> String {
    format!(
        "{}  {:<20} {:>12}  {}",
        order.reference(),
        order.status.label(),
        format_price(order.total_cents),
        format_date(&order.created_at)
    )
}

fn render_page(page: &Page<Order>) -> String {
    if page.content.is_empty() {
        return "Nenhum pedido encontrado".to_string();
    }

    let mut lines: Vec<String> = page.content.iter().map(render_row).collect();
    lines.push(format!(
        "Página {} de {} ({} pedidos)",
        page.position(),
        page.total_pages.max(1),
        page.total_elements
    ));
    lines.join("\n")
}

fn print_failure(error: &ApiError, last_known: Option<String>) {
    match last_known {
        Some(snapshot) => {
            println!("{} (mostrando último estado conhecido)", error.user_message());
            println!("{snapshot}");
        }
        None => println!("{}", error.user_message()),
    }
}

pub async fn show(ctx: &Context, id: &str) -> Result<(), CliError> {
    let order = ctx.client.get_order(parse_order_id(id)?).await?;
    println!("{}", render(&order));
    Ok(())
}

pub async fn pay(ctx: &Context, id: &str) -> Result<(), CliError> {
    let id = parse_order_id(id)?;
    let order = ctx.client.get_order(id).await?;
    if !order.status.can_pay() {
        return Err(CliError::ActionNotAllowed {
            reference: order.reference(),
            action: "paid",
            status: order.status,
        });
    }

    ctx.client.pay_order(id).await?;
    println!("Pagamento do pedido {} processado", order.reference());

    let order = ctx.client.get_order(id).await?;
    println!("{}", render(&order));
    Ok(())
}

pub async fn cancel(ctx: &Context, id: &str) -> Result<(), CliError> {
    let id = parse_order_id(id)?;
    let order = ctx.client.get_order(id).await?;
    if !order.status.can_cancel() {
        return Err(CliError::ActionNotAllowed {
            reference: order.reference(),
            action: "cancelled",
            status: order.status,
        });
    }

    ctx.client.cancel_order(id).await?;
    println!("Pedido {} cancelado", order.reference());

    let order = ctx.client.get_order(id).await?;
    println!("{}", render(&order));
    Ok(())
}

/// Print events until Ctrl+C.
///
/// When a poll fails after an earlier success, `last_known` renders the
/// cached snapshot, if one is still cached.
async fn follow<T>(
    mut sub: Subscription<T>,
    mut on_update: impl FnMut(&T, bool),
    mut last_known: impl AsyncFnMut() -> Option<String>,
) {
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut first = true;

    loop {
        let event = tokio::select! {
            _ = &mut shutdown => break,
            event = sub.recv() => event,
        };

        match event {
            Some(SyncEvent::Updated(snapshot)) => {
                on_update(&snapshot, first);
                first = false;
            }
            Some(SyncEvent::StatusChanged(change)) => println!("{change}"),
            Some(SyncEvent::FetchFailed { error, stale }) => {
                let snapshot = if stale { last_known().await } else { None };
                print_failure(&error, snapshot);
            }
            None => break,
        }
    }

    sub.cancel();
}

pub async fn watch(ctx: &Context, id: &str) -> Result<(), CliError> {
    let id = parse_order_id(id)?;
    let sync = OrderSync::new(ctx.client.clone(), ctx.config.polling);

    println!(
        "Acompanhando pedido a cada {}s (Ctrl+C para sair)",
        ctx.config.polling.order.as_secs()
    );
    follow(
        sync.watch_order(id),
        |order, first| {
            if first {
                println!("{}", render(order));
            }
        },
        async || ctx.client.cached_order(id).await.as_ref().map(render),
    )
    .await;
    Ok(())
}

pub async fn list(
    ctx: &Context,
    customer: &str,
    query: OrderListQuery,
    watch: bool,
) -> Result<(), CliError> {
    let customer_id: CustomerId = customer
        .parse()
        .map_err(|_| CliError::InvalidCustomerId(customer.to_string()))?;

    if !watch {
        let page = ctx.client.orders_by_customer(customer_id, &query).await?;
        println!("{}", render_page(&page));
        return Ok(());
    }

    let sync = OrderSync::new(ctx.client.clone(), ctx.config.polling);
    println!(
        "Atualizando a cada {}s (Ctrl+C para sair)",
        ctx.config.polling.order_list.as_secs()
    );
    follow(
        sync.watch_customer_orders(customer_id, query.clone()),
        |page, first| {
            if first {
                println!("{}", render_page(page));
            }
        },
        async || {
            ctx.client
                .cached_orders_by_customer(customer_id, &query)
                .await
                .as_ref()
                .map(render_page)
        },
    )
    .await;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vitrine_core::{Cents, OrderItem};

    fn order(status: OrderStatus) -> Order {
        Order {
            id: "1a2b3c4d-0000-4000-8000-000000000001".parse().unwrap(),
            customer_id: CustomerId::generate(),
            status,
            total_cents: Cents::new(4848),
            created_at: "2024-01-15T14:30:00Z".parse().unwrap(),
            items: vec![
                OrderItem {
                    sku: "CAF-001".into(),
                    qty: 2,
                    price_cents: Cents::new(1999),
                },
                OrderItem {
                    sku: "CHA-002".into(),
                    qty: 1,
                    price_cents: Cents::new(850),
                },
            ],
        }
    }

    #[test]
    fn test_timeline_marks_reached_steps() {
        assert_eq!(
            timeline(OrderStatus::PayPending),
            "[x] Novo -> [x] Pagamento Pendente -> [ ] Pago -> [ ] Enviado"
        );
        assert_eq!(
            timeline(OrderStatus::Shipped),
            "[x] Novo -> [x] Pagamento Pendente -> [x] Pago -> [x] Enviado"
        );
        assert_eq!(timeline(OrderStatus::Cancelled), "[!] Cancelado");
    }

    #[test]
    fn test_render_order() {
        let text = render(&order(OrderStatus::Paid));
        assert!(text.starts_with("Pedido #1a2b3c4d"));
        assert!(text.contains("15/01/2024 14:30"));
        assert!(text.contains("R$ 39,98"));
        assert!(text.ends_with("Total:   R$ 48,48 (3 itens)"));
    }

    #[test]
    fn test_render_page() {
        let page = Page {
            content: vec![order(OrderStatus::New)],
            total_elements: 1,
            total_pages: 1,
            number: 0,
            size: 10,
        };
        let text = render_page(&page);
        assert!(text.contains("#1a2b3c4d  Novo"));
        assert!(text.ends_with("Página 1 de 1 (1 pedidos)"));

        let empty: Page<Order> = Page {
            content: vec![],
            total_elements: 0,
            total_pages: 0,
            number: 0,
            size: 10,
        };
        assert_eq!(render_page(&empty), "Nenhum pedido encontrado");
    }
}
