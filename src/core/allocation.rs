//! Allocation engine ("pillaging") - fills orders from stockpiles of the same product.
//!
//! Both walks are greedy and FIFO by ascending id: the first candidate with something
//! left is drained completely before the next one is touched. Stock and outstanding
//! demand are recomputed from the pillage rows on every call; nothing is cached.
//!
//! The functions take any [`ConnectionTrait`] so the write path can run them inside
//! the same database transaction as the insert that triggered them. The candidate
//! rows are read with an exclusive lock, which keeps two concurrent passes from
//! handing out the same units twice on backends with row locking.

use crate::{
    core::pillage::insert_validated_pillage,
    entities::{Order, Pillage, Stockpile, order, pillage, stockpile},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, QuerySelect, prelude::*};
use tracing::{debug, info, instrument};

/// A freshly written record together with the pillages its write created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocated<T> {
    /// The order or stockpile that was written
    pub record: T,
    /// Pillages created by the allocation pass, in creation order
    pub pillages: Vec<pillage::Model>,
}

impl<T> Allocated<T> {
    /// Total units moved by the allocation pass.
    #[must_use]
    pub fn allocated_units(&self) -> i64 {
        self.pillages
            .iter()
            .fold(0, |total, p| total.saturating_add(p.amount))
    }
}

/// Order, stockpile and pillage amounts are whole units, at least one.
///
/// # Errors
/// Returns [`Error::InvalidAmount`] for anything below 1.
pub fn ensure_positive_amount(amount: i64) -> Result<i64> {
    if amount < 1 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}

async fn sum_pillages<C>(db: &C, condition: Condition) -> Result<i64>
where
    C: ConnectionTrait,
{
    let pillages = Pillage::find().filter(condition).all(db).await?;
    Ok(pillages
        .iter()
        .fold(0_i64, |total, p| total.saturating_add(p.amount)))
}

/// Units already pillaged for an order, optionally ignoring one pillage (the one
/// being edited).
pub async fn pillaged_for_order<C>(db: &C, order_id: i64, excluding: Option<i64>) -> Result<i64>
where
    C: ConnectionTrait,
{
    let condition = Condition::all()
        .add(pillage::Column::OrderId.eq(order_id))
        .add_option(excluding.map(|id| pillage::Column::Id.ne(id)));
    sum_pillages(db, condition).await
}

/// Units already pillaged from a stockpile, optionally ignoring one pillage.
pub async fn pillaged_from_stockpile<C>(
    db: &C,
    stockpile_id: i64,
    excluding: Option<i64>,
) -> Result<i64>
where
    C: ConnectionTrait,
{
    let condition = Condition::all()
        .add(pillage::Column::StockpileId.eq(stockpile_id))
        .add_option(excluding.map(|id| pillage::Column::Id.ne(id)));
    sum_pillages(db, condition).await
}

/// The part of an order that has yet to be pillaged: `amount - Σ pillages`.
pub async fn to_pillage<C>(db: &C, order: &order::Model) -> Result<i64>
where
    C: ConnectionTrait,
{
    Ok(order
        .amount
        .saturating_sub(pillaged_for_order(db, order.id, None).await?))
}

/// What is left in a stockpile: `amount - Σ pillages`.
pub async fn stock<C>(db: &C, stockpile: &stockpile::Model) -> Result<i64>
where
    C: ConnectionTrait,
{
    Ok(stockpile
        .amount
        .saturating_sub(pillaged_from_stockpile(db, stockpile.id, None).await?))
}

/// A failed check inside an automatic pass means the engine itself is wrong.
fn engine_bug(err: Error) -> Error {
    if err.is_validation() {
        Error::AllocationInvariant {
            source: Box::new(err),
        }
    } else {
        err
    }
}

/// Fills an order from the stockpiles of its product that still have stock.
///
/// Call this after the order row has been written, on the same transaction.
/// Returns the pillages created (possibly none).
#[instrument(skip_all, fields(order_id = order.id, product_id = order.product_id))]
pub async fn allocate_for_new_order<C>(db: &C, order: &order::Model) -> Result<Vec<pillage::Model>>
where
    C: ConnectionTrait,
{
    let mut remaining = to_pillage(db, order).await?;
    let mut created = Vec::new();
    if remaining <= 0 {
        return Ok(created);
    }

    let stockpiles = Stockpile::find()
        .filter(stockpile::Column::ProductId.eq(order.product_id))
        .order_by_asc(stockpile::Column::Id)
        .lock_exclusive()
        .all(db)
        .await?;

    for candidate in stockpiles {
        if remaining == 0 {
            break;
        }
        let available = stock(db, &candidate).await?;
        if available <= 0 {
            continue;
        }

        let amount = remaining.min(available);
        let pillage = insert_validated_pillage(db, order, &candidate, amount)
            .await
            .map_err(engine_bug)?;
        debug!(stockpile_id = candidate.id, amount, "Pillaged stockpile for order");
        remaining -= amount;
        created.push(pillage);
    }

    info!(
        pillages = created.len(),
        still_missing = remaining,
        "Allocated stock to order"
    );
    Ok(created)
}

/// Hands out a stockpile's stock to the orders of its product that still need some.
///
/// Call this after the stockpile row has been written, on the same transaction.
/// Returns the pillages created (possibly none).
#[instrument(skip_all, fields(stockpile_id = stockpile.id, product_id = stockpile.product_id))]
pub async fn allocate_for_new_stockpile<C>(
    db: &C,
    stockpile: &stockpile::Model,
) -> Result<Vec<pillage::Model>>
where
    C: ConnectionTrait,
{
    let mut available = stock(db, stockpile).await?;
    let mut created = Vec::new();
    if available <= 0 {
        return Ok(created);
    }

    let orders = Order::find()
        .filter(order::Column::ProductId.eq(stockpile.product_id))
        .order_by_asc(order::Column::Id)
        .lock_exclusive()
        .all(db)
        .await?;

    for candidate in orders {
        if available == 0 {
            break;
        }
        let missing = to_pillage(db, &candidate).await?;
        if missing <= 0 {
            continue;
        }

        let amount = available.min(missing);
        let pillage = insert_validated_pillage(db, &candidate, stockpile, amount)
            .await
            .map_err(engine_bug)?;
        debug!(order_id = candidate.id, amount, "Filled order from stockpile");
        available -= amount;
        created.push(pillage);
    }

    info!(
        pillages = created.len(),
        left_in_stock = available,
        "Allocated stockpile to orders"
    );
    Ok(created)
}
