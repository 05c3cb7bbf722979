//! Order business logic - Requesting, changing and completing orders.
//!
//! Writing an order always runs the allocation engine in the same database
//! transaction, so an order that can be served from stock leaves this module
//! already pillaged.

use crate::{
    core::allocation::{
        Allocated, allocate_for_new_order, ensure_positive_amount, pillaged_for_order,
    },
    entities::{Event, Order, OrderState, Pillage, Product, Team, order, pillage},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Everything needed to place an order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewOrder {
    /// Demanded quantity, at least 1
    pub amount: i64,
    /// Product being ordered
    pub product_id: i64,
    /// Team placing the order
    pub team_id: i64,
    /// Event the order is for, if any
    pub event_id: Option<i64>,
    /// Initial state; privileged users may enter orders past `Requested`
    pub state: OrderState,
    /// Shop link
    pub url: String,
    /// Free-form requirements
    pub comment: String,
}

impl NewOrder {
    /// A requested order without event, link or comment.
    #[must_use]
    pub fn new(amount: i64, product_id: i64, team_id: i64) -> Self {
        Self {
            amount,
            product_id,
            team_id,
            ..Self::default()
        }
    }
}

/// Changes to an existing order; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderChanges {
    /// New quantity; may not drop below what is already pillaged
    pub amount: Option<i64>,
    /// New product; only possible while nothing is pillaged
    pub product_id: Option<i64>,
    /// New event (`Some(None)` clears it)
    pub event_id: Option<Option<i64>>,
    /// New shop link
    pub url: Option<String>,
    /// New comment
    pub comment: Option<String>,
}

async fn ensure_references<C>(
    db: &C,
    product_id: i64,
    team_id: Option<i64>,
    event_id: Option<i64>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    if Product::find_by_id(product_id).one(db).await?.is_none() {
        return Err(Error::not_found("Product", product_id));
    }
    if let Some(team_id) = team_id {
        if Team::find_by_id(team_id).one(db).await?.is_none() {
            return Err(Error::not_found("Team", team_id));
        }
    }
    if let Some(event_id) = event_id {
        if Event::find_by_id(event_id).one(db).await?.is_none() {
            return Err(Error::not_found("Event", event_id));
        }
    }
    Ok(())
}

/// Places an order and fills it from available stock.
///
/// # Errors
/// Returns an error if:
/// - The amount is below 1
/// - The product, team or event doesn't exist
/// - The database write fails
pub async fn create_order(
    db: &DatabaseConnection,
    new_order: NewOrder,
) -> Result<Allocated<order::Model>> {
    ensure_positive_amount(new_order.amount)?;

    let txn = db.begin().await?;
    ensure_references(
        &txn,
        new_order.product_id,
        Some(new_order.team_id),
        new_order.event_id,
    )
    .await?;

    let now = chrono::Utc::now();
    let order = order::ActiveModel {
        amount: Set(new_order.amount),
        product_id: Set(new_order.product_id),
        team_id: Set(new_order.team_id),
        event_id: Set(new_order.event_id),
        state: Set(new_order.state),
        url: Set(new_order.url.trim().to_string()),
        comment: Set(new_order.comment),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let pillages = allocate_for_new_order(&txn, &order).await?;
    txn.commit().await?;

    info!(
        order_id = order.id,
        amount = order.amount,
        product_id = order.product_id,
        team_id = order.team_id,
        "Created order"
    );
    Ok(Allocated {
        record: order,
        pillages,
    })
}

/// Saves changes to an order and tops it up from stock if it now needs more.
///
/// # Errors
/// Returns an error if:
/// - The order doesn't exist
/// - The new amount is below 1 or below the units already pillaged
/// - The product changes although units are already pillaged
/// - A referenced product or event doesn't exist
pub async fn update_order(
    db: &DatabaseConnection,
    order_id: i64,
    changes: OrderChanges,
) -> Result<Allocated<order::Model>> {
    let txn = db.begin().await?;

    let existing = Order::find_by_id(order_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))?;
    let allocated = pillaged_for_order(&txn, order_id, None).await?;

    if let Some(amount) = changes.amount {
        ensure_positive_amount(amount)?;
        if amount < allocated {
            return Err(Error::AmountBelowAllocated { amount, allocated });
        }
    }
    if let Some(product_id) = changes.product_id {
        if product_id != existing.product_id && allocated > 0 {
            return Err(Error::OrderProductLocked { allocated });
        }
    }
    ensure_references(
        &txn,
        changes.product_id.unwrap_or(existing.product_id),
        None,
        changes.event_id.flatten(),
    )
    .await?;

    let mut order: order::ActiveModel = existing.into();
    if let Some(amount) = changes.amount {
        order.amount = Set(amount);
    }
    if let Some(product_id) = changes.product_id {
        order.product_id = Set(product_id);
    }
    if let Some(event_id) = changes.event_id {
        order.event_id = Set(event_id);
    }
    if let Some(url) = changes.url {
        order.url = Set(url.trim().to_string());
    }
    if let Some(comment) = changes.comment {
        order.comment = Set(comment);
    }
    order.updated_at = Set(chrono::Utc::now());
    let order = order.update(&txn).await?;

    let pillages = allocate_for_new_order(&txn, &order).await?;
    txn.commit().await?;

    info!(order_id, "Updated order");
    Ok(Allocated {
        record: order,
        pillages,
    })
}

/// Moves an order along its workflow.
///
/// # Errors
/// Returns [`Error::InvalidStateTransition`] unless `target` is the current state or
/// the one right after it.
pub async fn transition_order(
    db: &DatabaseConnection,
    order_id: i64,
    target: OrderState,
) -> Result<order::Model> {
    let existing = get_order_by_id(db, order_id)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))?;

    if !existing.state.can_transition_to(target) {
        return Err(Error::InvalidStateTransition {
            from: existing.state,
            to: target,
        });
    }
    if existing.state == target {
        return Ok(existing);
    }

    let from = existing.state;
    let mut order: order::ActiveModel = existing.into();
    order.state = Set(target);
    order.updated_at = Set(chrono::Utc::now());
    let updated = order.update(db).await?;

    info!(order_id, %from, to = %target, "Order changed state");
    Ok(updated)
}

/// Deletes an order together with its pillages.
///
/// # Errors
/// Returns [`Error::OrderCompleted`] for completed orders, which are kept for the
/// records.
pub async fn delete_order(db: &DatabaseConnection, order_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let existing = Order::find_by_id(order_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))?;
    if existing.state == OrderState::Completed {
        return Err(Error::OrderCompleted { order_id });
    }

    Pillage::delete_many()
        .filter(pillage::Column::OrderId.eq(order_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;

    txn.commit().await?;
    info!(order_id, "Deleted order");
    Ok(())
}

/// Retrieves an order by id.
pub async fn get_order_by_id(
    db: &DatabaseConnection,
    order_id: i64,
) -> Result<Option<order::Model>> {
    Order::find_by_id(order_id).one(db).await.map_err(Into::into)
}

/// All orders, oldest first.
pub async fn get_all_orders(db: &DatabaseConnection) -> Result<Vec<order::Model>> {
    Order::find()
        .order_by_asc(order::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Orders placed by one team, oldest first.
pub async fn get_orders_for_team(
    db: &DatabaseConnection,
    team_id: i64,
) -> Result<Vec<order::Model>> {
    Order::find()
        .filter(order::Column::TeamId.eq(team_id))
        .order_by_asc(order::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
