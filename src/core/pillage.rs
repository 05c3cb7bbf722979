//! Pillage business logic - Validation and manual management of pillages.
//!
//! Every pillage write, whether it comes from the allocation engine or from a person
//! correcting an allocation by hand, goes through [`validate_pillage`] on the same
//! connection (usually a transaction) as the write itself.

use crate::{
    core::allocation::{ensure_positive_amount, pillaged_for_order, pillaged_from_stockpile},
    entities::{Order, Pillage, Stockpile, order, pillage, stockpile},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Checks that `amount` units may flow from `stockpile` to `order`.
///
/// `editing` is the id of the pillage being changed, if any; its current amount is
/// left out of both sums so it is not counted twice.
///
/// # Errors
/// - [`Error::InvalidAmount`] if `amount` is below 1
/// - [`Error::ProductMismatch`] if order and stockpile hold different products
/// - [`Error::OrderOverAllocated`] if the order would receive more than it asked for
/// - [`Error::StockpileExhausted`] if the stockpile doesn't have `amount` left
pub async fn validate_pillage<C>(
    db: &C,
    order: &order::Model,
    stockpile: &stockpile::Model,
    amount: i64,
    editing: Option<i64>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    ensure_positive_amount(amount)?;

    if order.product_id != stockpile.product_id {
        return Err(Error::ProductMismatch {
            order_product: order.product_id,
            stockpile_product: stockpile.product_id,
        });
    }

    // `pillaged <= order.amount` holds, so the remainder never goes negative.
    let pillaged = pillaged_for_order(db, order.id, editing).await?;
    if amount > order.amount.saturating_sub(pillaged) {
        return Err(Error::OrderOverAllocated {
            order_amount: order.amount,
            amount,
            total: amount.saturating_add(pillaged),
        });
    }

    let available = stockpile
        .amount
        .saturating_sub(pillaged_from_stockpile(db, stockpile.id, editing).await?);
    if amount > available {
        return Err(Error::StockpileExhausted { available, amount });
    }

    Ok(())
}

/// Validates and inserts a pillage on the given connection.
pub(crate) async fn insert_validated_pillage<C>(
    db: &C,
    order: &order::Model,
    stockpile: &stockpile::Model,
    amount: i64,
) -> Result<pillage::Model>
where
    C: ConnectionTrait,
{
    validate_pillage(db, order, stockpile, amount, None).await?;

    let pillage = pillage::ActiveModel {
        amount: Set(amount),
        stockpile_id: Set(stockpile.id),
        order_id: Set(order.id),
        ..Default::default()
    };
    pillage.insert(db).await.map_err(Into::into)
}

async fn lock_order<C>(db: &C, order_id: i64) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    Order::find_by_id(order_id)
        .lock_exclusive()
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))
}

async fn lock_stockpile<C>(db: &C, stockpile_id: i64) -> Result<stockpile::Model>
where
    C: ConnectionTrait,
{
    Stockpile::find_by_id(stockpile_id)
        .lock_exclusive()
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Stockpile", stockpile_id))
}

/// Creates a pillage by hand, e.g. to take units from a specific stockpile.
///
/// # Errors
/// Returns an error if the order or stockpile doesn't exist or any check of
/// [`validate_pillage`] fails. Nothing is written in that case.
pub async fn create_pillage(
    db: &DatabaseConnection,
    order_id: i64,
    stockpile_id: i64,
    amount: i64,
) -> Result<pillage::Model> {
    let txn = db.begin().await?;

    let order = lock_order(&txn, order_id).await?;
    let stockpile = lock_stockpile(&txn, stockpile_id).await?;
    let pillage = insert_validated_pillage(&txn, &order, &stockpile, amount).await?;

    txn.commit().await?;
    info!(
        pillage_id = pillage.id,
        order_id, stockpile_id, amount, "Created pillage"
    );
    Ok(pillage)
}

/// Changes the amount of an existing pillage, re-running all checks.
///
/// # Errors
/// Returns an error if the pillage doesn't exist or the new amount fails
/// [`validate_pillage`].
pub async fn update_pillage_amount(
    db: &DatabaseConnection,
    pillage_id: i64,
    amount: i64,
) -> Result<pillage::Model> {
    let txn = db.begin().await?;

    let existing = Pillage::find_by_id(pillage_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Pillage", pillage_id))?;
    let order = lock_order(&txn, existing.order_id).await?;
    let stockpile = lock_stockpile(&txn, existing.stockpile_id).await?;

    validate_pillage(&txn, &order, &stockpile, amount, Some(pillage_id)).await?;

    let mut pillage: pillage::ActiveModel = existing.into();
    pillage.amount = Set(amount);
    let updated = pillage.update(&txn).await?;

    txn.commit().await?;
    info!(pillage_id, amount, "Updated pillage");
    Ok(updated)
}

/// Deletes a pillage, returning its units to the stockpile.
///
/// No reallocation happens: the order simply needs those units again.
pub async fn delete_pillage(db: &DatabaseConnection, pillage_id: i64) -> Result<()> {
    let result = Pillage::delete_by_id(pillage_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Pillage", pillage_id));
    }
    info!(pillage_id, "Deleted pillage");
    Ok(())
}

/// Retrieves a pillage by id.
pub async fn get_pillage_by_id(
    db: &DatabaseConnection,
    pillage_id: i64,
) -> Result<Option<pillage::Model>> {
    Pillage::find_by_id(pillage_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All pillages, oldest first.
pub async fn get_all_pillages(db: &DatabaseConnection) -> Result<Vec<pillage::Model>> {
    Pillage::find()
        .order_by_asc(pillage::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Pillages fulfilling one order, oldest first.
pub async fn get_pillages_for_order<C>(db: &C, order_id: i64) -> Result<Vec<pillage::Model>>
where
    C: ConnectionTrait,
{
    Pillage::find()
        .filter(pillage::Column::OrderId.eq(order_id))
        .order_by_asc(pillage::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Pillages taken from one stockpile, oldest first.
pub async fn get_pillages_for_stockpile<C>(
    db: &C,
    stockpile_id: i64,
) -> Result<Vec<pillage::Model>>
where
    C: ConnectionTrait,
{
    Pillage::find()
        .filter(pillage::Column::StockpileId.eq(stockpile_id))
        .order_by_asc(pillage::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::allocation::{stock, to_pillage};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_second_pillage_cannot_overfill_order() -> Result<()> {
        let (db, team, product) = setup_with_product().await?;
        let stockpile = create_test_stockpile(&db, &product, 10).await?.record;
        let order = create_test_order(&db, &team, &product, 7).await?;
        assert_eq!(order.allocated_units(), 7);
        assert_eq!(stock(&db, &stockpile).await?, 3);

        let result = create_pillage(&db, order.record.id, stockpile.id, 8).await;

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            Error::OrderOverAllocated {
                order_amount: 7,
                amount: 8,
                total: 15
            }
        ));
        assert_eq!(
            err.to_string(),
            "The order only is for 7. With this pillage of 8, it would go to 15."
        );
        assert_eq!(get_pillages_for_order(&db, order.record.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_huge_pillage_is_rejected_without_overflow() -> Result<()> {
        let (db, team, product) = setup_with_product().await?;
        let stockpile = create_test_stockpile(&db, &product, 10).await?.record;
        let order = create_test_order(&db, &team, &product, 7).await?.record;
        assert_eq!(to_pillage(&db, &order).await?, 0);

        let err = create_pillage(&db, order.id, stockpile.id, i64::MAX)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::OrderOverAllocated {
                order_amount: 7,
                amount: i64::MAX,
                total: i64::MAX
            }
        ));

        // Plenty of stock must not let the order be overfilled either.
        let big = create_test_stockpile(&db, &product, i64::MAX).await?.record;
        let err = create_pillage(&db, order.id, big.id, i64::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OrderOverAllocated { .. }));
        assert_eq!(get_pillages_for_order(&db, order.id).await?.len(), 1);
        assert_eq!(stock(&db, &big).await?, i64::MAX);
        assert_eq!(to_pillage(&db, &order).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_pillage_cannot_exceed_stock() -> Result<()> {
        let (db, team, product) = setup_with_product().await?;
        let stockpile = create_test_stockpile(&db, &product, 10).await?.record;
        let order = create_test_order(&db, &team, &product, 15).await?;
        // Give the automatic pillage back so the stockpile is fully available again.
        delete_pillage(&db, order.pillages[0].id).await?;
        assert_eq!(stock(&db, &stockpile).await?, 10);

        let err = create_pillage(&db, order.record.id, stockpile.id, 12)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::StockpileExhausted {
                available: 10,
                amount: 12
            }
        ));
        assert_eq!(
            err.to_string(),
            "The stockpile has 10 available, you requested 12."
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_pillage_products_must_match() -> Result<()> {
        let (db, team, product) = setup_with_product().await?;
        let other = create_test_product(&db, "Other Product").await?;
        let stockpile = create_test_stockpile(&db, &other, 10).await?.record;
        let order = create_test_order(&db, &team, &product, 5).await?.record;

        let err = create_pillage(&db, order.id, stockpile.id, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ProductMismatch { .. }));
        assert_eq!(stock(&db, &stockpile).await?, 10);
        Ok(())
    }

    #[tokio::test]
    async fn test_manual_pillages_up_to_exact_amount() -> Result<()> {
        let (db, team, product) = setup_with_product().await?;
        let order = create_test_order(&db, &team, &product, 8).await?;
        let stockpile = create_test_stockpile(&db, &product, 10).await?;
        // The stockpile filled the order on creation; hand the units back.
        for pillage in &stockpile.pillages {
            delete_pillage(&db, pillage.id).await?;
        }

        create_pillage(&db, order.record.id, stockpile.record.id, 3).await?;
        create_pillage(&db, order.record.id, stockpile.record.id, 5).await?;

        assert_eq!(to_pillage(&db, &order.record).await?, 0);
        assert_eq!(stock(&db, &stockpile.record).await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_amount_is_rejected() -> Result<()> {
        let (db, team, product) = setup_with_product().await?;
        let stockpile = create_test_stockpile(&db, &product, 10).await?.record;
        let order = create_test_order(&db, &team, &product, 1).await?.record;

        let err = create_pillage(&db, order.id, stockpile.id, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAmount { amount: 0 }));
        Ok(())
    }

    #[tokio::test]
    async fn test_editing_does_not_count_itself_twice() -> Result<()> {
        let (db, team, product) = setup_with_product().await?;
        let stockpile = create_test_stockpile(&db, &product, 10).await?.record;
        let order = create_test_order(&db, &team, &product, 10).await?;
        let pillage = &order.pillages[0];
        assert_eq!(pillage.amount, 10);

        // Shrinking and growing back to the full stockpile must both be fine.
        let shrunk = update_pillage_amount(&db, pillage.id, 6).await?;
        assert_eq!(shrunk.amount, 6);
        assert_eq!(stock(&db, &stockpile).await?, 4);
        let grown = update_pillage_amount(&db, pillage.id, 10).await?;
        assert_eq!(grown.amount, 10);

        let err = update_pillage_amount(&db, pillage.id, 11)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::OrderOverAllocated {
                order_amount: 10,
                amount: 11,
                total: 11
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_pillage() -> Result<()> {
        let db = setup_test_db().await?;
        let err = update_pillage_amount(&db, 999, 1).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "Pillage", .. }));
        assert!(matches!(
            delete_pillage(&db, 999).await.unwrap_err(),
            Error::NotFound { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_validate_rejects_before_touching_the_database() -> Result<()> {
        use sea_orm::{DatabaseBackend, MockDatabase};

        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let order = order::Model {
            id: 1,
            amount: 5,
            product_id: 1,
            event_id: None,
            team_id: 1,
            state: crate::entities::OrderState::Requested,
            url: String::new(),
            comment: String::new(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let stockpile = stockpile::Model {
            id: 1,
            product_id: 2,
            amount: 5,
            unit_price: 0,
            tax: 10_000,
            purchase_id: None,
        };

        let result = validate_pillage(&db, &order, &stockpile, 1, None).await;
        assert!(matches!(result.unwrap_err(), Error::ProductMismatch { .. }));

        let result = validate_pillage(&db, &order, &stockpile, -3, None).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount: -3 }
        ));
        Ok(())
    }
}
