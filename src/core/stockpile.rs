//! Stockpile business logic - Recording supply and keeping it allocated.
//!
//! Creating a stockpile immediately hands its units to waiting orders of the same
//! product. Deleting one gives the units back by removing its pillages.

use crate::{
    core::{
        allocation::{
            Allocated, allocate_for_new_stockpile, ensure_positive_amount, pillaged_from_stockpile,
        },
        money::{Money, TaxRate},
    },
    entities::{Pillage, Product, Purchase, Stockpile, pillage, stockpile},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Everything needed to record a stockpile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockpile {
    /// Product held
    pub product_id: i64,
    /// Units acquired, at least 1
    pub amount: i64,
    /// Price per unit, net or gross depending on the purchase
    pub unit_price: Money,
    /// Tax factor
    pub tax: TaxRate,
    /// Purchase the goods came from; `None` for things found in storage
    pub purchase_id: Option<i64>,
}

impl NewStockpile {
    /// A free-standing stockpile with no price and no tax.
    #[must_use]
    pub const fn new(product_id: i64, amount: i64) -> Self {
        Self {
            product_id,
            amount,
            unit_price: Money::ZERO,
            tax: TaxRate::NONE,
            purchase_id: None,
        }
    }
}

/// Changes to an existing stockpile; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockpileChanges {
    /// Only accepted if it equals the current product
    pub product_id: Option<i64>,
    /// New quantity; may not drop below what is already pillaged
    pub amount: Option<i64>,
    /// New price per unit
    pub unit_price: Option<Money>,
    /// New tax factor
    pub tax: Option<TaxRate>,
}

/// Records a stockpile and fills waiting orders from it.
///
/// # Errors
/// Returns an error if:
/// - The amount is below 1
/// - The tax factor is not positive
/// - The product or purchase doesn't exist
/// - The database write fails
pub async fn create_stockpile(
    db: &DatabaseConnection,
    new_stockpile: NewStockpile,
) -> Result<Allocated<stockpile::Model>> {
    ensure_positive_amount(new_stockpile.amount)?;
    let tax = new_stockpile.tax.validate()?;

    let txn = db.begin().await?;
    if Product::find_by_id(new_stockpile.product_id)
        .one(&txn)
        .await?
        .is_none()
    {
        return Err(Error::not_found("Product", new_stockpile.product_id));
    }
    if let Some(purchase_id) = new_stockpile.purchase_id {
        if Purchase::find_by_id(purchase_id).one(&txn).await?.is_none() {
            return Err(Error::not_found("Purchase", purchase_id));
        }
    }

    let stockpile = stockpile::ActiveModel {
        product_id: Set(new_stockpile.product_id),
        amount: Set(new_stockpile.amount),
        unit_price: Set(new_stockpile.unit_price.minor()),
        tax: Set(tax.scaled()),
        purchase_id: Set(new_stockpile.purchase_id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let pillages = allocate_for_new_stockpile(&txn, &stockpile).await?;
    txn.commit().await?;

    info!(
        stockpile_id = stockpile.id,
        product_id = stockpile.product_id,
        amount = stockpile.amount,
        "Created stockpile"
    );
    Ok(Allocated {
        record: stockpile,
        pillages,
    })
}

/// Saves changes to a stockpile and hands out any units it gained.
///
/// # Errors
/// Returns an error if:
/// - The stockpile doesn't exist
/// - A different product is requested
/// - The new amount is below 1 or below the units already pillaged
/// - The new tax factor is not positive
pub async fn update_stockpile(
    db: &DatabaseConnection,
    stockpile_id: i64,
    changes: StockpileChanges,
) -> Result<Allocated<stockpile::Model>> {
    let txn = db.begin().await?;

    let existing = Stockpile::find_by_id(stockpile_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Stockpile", stockpile_id))?;

    if let Some(product_id) = changes.product_id {
        if product_id != existing.product_id {
            return Err(Error::StockpileProductChanged {
                from: existing.product_id,
                to: product_id,
            });
        }
    }
    if let Some(amount) = changes.amount {
        ensure_positive_amount(amount)?;
        let allocated = pillaged_from_stockpile(&txn, stockpile_id, None).await?;
        if amount < allocated {
            return Err(Error::AmountBelowAllocated { amount, allocated });
        }
    }

    let mut stockpile: stockpile::ActiveModel = existing.into();
    if let Some(amount) = changes.amount {
        stockpile.amount = Set(amount);
    }
    if let Some(unit_price) = changes.unit_price {
        stockpile.unit_price = Set(unit_price.minor());
    }
    if let Some(tax) = changes.tax {
        stockpile.tax = Set(tax.validate()?.scaled());
    }
    let stockpile = stockpile.update(&txn).await?;

    let pillages = allocate_for_new_stockpile(&txn, &stockpile).await?;
    txn.commit().await?;

    info!(stockpile_id, "Updated stockpile");
    Ok(Allocated {
        record: stockpile,
        pillages,
    })
}

/// Deletes a stockpile; its pillages go with it and the orders become open again.
///
/// Orders are not refilled from other stockpiles here; that happens the next time
/// stock for their product is recorded or the order is saved.
pub async fn delete_stockpile(db: &DatabaseConnection, stockpile_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let existing = Stockpile::find_by_id(stockpile_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Stockpile", stockpile_id))?;
    let released = Pillage::delete_many()
        .filter(pillage::Column::StockpileId.eq(stockpile_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;

    txn.commit().await?;
    info!(
        stockpile_id,
        pillages_removed = released.rows_affected,
        "Deleted stockpile"
    );
    Ok(())
}

/// The unit price without tax.
///
/// Prices of gross purchases are divided by the tax factor; prices of net
/// purchases and of stockpiles without purchase are returned as recorded.
pub async fn unit_price_net<C>(db: &C, stockpile: &stockpile::Model) -> Result<Money>
where
    C: ConnectionTrait,
{
    let Some(purchase_id) = stockpile.purchase_id else {
        return Ok(stockpile.unit_price());
    };
    let purchase = Purchase::find_by_id(purchase_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Purchase", purchase_id))?;
    if purchase.is_net {
        return Ok(stockpile.unit_price());
    }

    let tax = stockpile.tax().validate()?;
    let net = stockpile
        .unit_price()
        .to_decimal()
        .checked_div(tax.to_decimal())
        .ok_or_else(|| Error::InvalidTax {
            tax: tax.to_string(),
        })?;
    Money::from_decimal(net)
}

/// Retrieves a stockpile by id.
pub async fn get_stockpile_by_id(
    db: &DatabaseConnection,
    stockpile_id: i64,
) -> Result<Option<stockpile::Model>> {
    Stockpile::find_by_id(stockpile_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All stockpiles, oldest first.
pub async fn get_all_stockpiles(db: &DatabaseConnection) -> Result<Vec<stockpile::Model>> {
    Stockpile::find()
        .order_by_asc(stockpile::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Stockpiles of one product, oldest first.
pub async fn get_stockpiles_for_product(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Vec<stockpile::Model>> {
    Stockpile::find()
        .filter(stockpile::Column::ProductId.eq(product_id))
        .order_by_asc(stockpile::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Stockpiles bought in one purchase.
pub async fn get_stockpiles_for_purchase<C>(
    db: &C,
    purchase_id: i64,
) -> Result<Vec<stockpile::Model>>
where
    C: ConnectionTrait,
{
    Stockpile::find()
        .filter(stockpile::Column::PurchaseId.eq(purchase_id))
        .order_by_asc(stockpile::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
