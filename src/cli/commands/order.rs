//! Order commands - placing, listing and advancing orders.

use crate::{
    cli::CliData,
    core::{
        allocation, catalog,
        order::{self, NewOrder},
        product,
    },
    errors::{Error, Result},
};

/// What `order add` was given on the command line.
#[derive(Debug, Clone)]
pub struct OrderInput {
    /// Name of the ordering team
    pub team: String,
    /// Product name, created if unknown
    pub product: String,
    /// Quantity
    pub amount: i64,
    /// Event name, the default order event if `None`
    pub event: Option<String>,
    /// Shop link
    pub url: String,
    /// Free-form requirements
    pub comment: String,
}

/// Places an order and reports how much of it could be served from stock.
///
/// Everything given is checked before an unknown product gets created.
pub async fn add(data: &CliData, input: OrderInput) -> Result<()> {
    let db = &data.database;
    let amount = allocation::ensure_positive_amount(input.amount)?;

    let team = catalog::get_team_by_name(db, &input.team)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "Team",
            key: input.team.clone(),
        })?;
    let event = match input.event.as_deref() {
        Some(name) => Some(catalog::get_event_by_name(db, name).await?.ok_or_else(|| {
            Error::NotFound {
                entity: "Event",
                key: name.to_string(),
            }
        })?),
        None => {
            let configured = data.config.default_order_event.as_deref();
            catalog::default_order_event(db, configured).await?
        }
    };
    let product = product::get_or_create_product(db, &input.product).await?;

    let placed = order::create_order(
        db,
        NewOrder {
            event_id: event.as_ref().map(|e| e.id),
            url: input.url,
            comment: input.comment,
            ..NewOrder::new(amount, product.id, team.id)
        },
    )
    .await?;

    println!(
        "✅ Order {} placed: {} × {} for '{}'{}.",
        placed.record.id,
        placed.record.amount,
        product.name,
        team.name,
        event.map(|e| format!(" at {}", e.name)).unwrap_or_default()
    );
    let served = placed.allocated_units();
    if served > 0 {
        println!("   {served} of them were taken from stock right away.");
    }
    Ok(())
}

/// Lists orders with their state and outstanding amount.
pub async fn list(data: &CliData, team: Option<&str>) -> Result<()> {
    let db = &data.database;
    let orders = match team {
        Some(name) => {
            let team = catalog::get_team_by_name(db, name)
                .await?
                .ok_or_else(|| Error::NotFound {
                    entity: "Team",
                    key: name.to_string(),
                })?;
            order::get_orders_for_team(db, team.id).await?
        }
        None => order::get_all_orders(db).await?,
    };

    if orders.is_empty() {
        println!("No orders yet.");
        return Ok(());
    }
    for order in orders {
        let missing = allocation::to_pillage(db, &order).await?;
        let product = product::get_product_by_id(db, order.product_id)
            .await?
            .map_or_else(|| "Unknown product".to_string(), |p| p.name);
        println!(
            "#{:<5} {:>5} × {:<30} {:<18} missing {}",
            order.id,
            order.amount,
            product,
            order.state.label(),
            missing
        );
    }
    Ok(())
}

/// Moves an order one step along its workflow.
pub async fn advance(data: &CliData, order_id: i64) -> Result<()> {
    let db = &data.database;
    let current = order::get_order_by_id(db, order_id)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))?;
    let Some(next) = current.state.next() else {
        println!("Order {order_id} is already completed.");
        return Ok(());
    };

    let updated = order::transition_order(db, order_id, next).await?;
    println!("✅ Order {order_id} is now {}.", updated.state);
    Ok(())
}
