//! Purchase business logic - Vendors' invoices, their extra costs and their sums.
//!
//! A purchase's net and gross sums are never stored. They are aggregated from its
//! stockpiles and cost items every time, see [`aggregate`].

use crate::{
    core::{
        money::{Money, Rebate, TaxRate},
        stockpile::get_stockpiles_for_purchase,
    },
    entities::{
        CostItem, Pillage, Purchase, Stockpile, TransactionPurchase, Vendor, cost_item, pillage,
        purchase, stockpile, transaction_purchase,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Everything needed to record a purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchase {
    /// Vendor the goods were bought from
    pub vendor_id: i64,
    /// Whether the prices of the purchase's lines exclude tax
    pub is_net: bool,
    /// Rebate on the whole purchase
    pub rebate: Rebate,
    pub ordered_at: NaiveDate,
    pub paid: bool,
    pub paid_at: Option<NaiveDate>,
    /// How it was paid (card, cash, invoice, ...)
    pub payment_method: String,
    /// Who paid
    pub payer: String,
}

impl NewPurchase {
    /// An unpaid purchase with gross prices and no rebate.
    #[must_use]
    pub fn new(vendor_id: i64, ordered_at: NaiveDate) -> Self {
        Self {
            vendor_id,
            is_net: false,
            rebate: Rebate::NONE,
            ordered_at,
            paid: false,
            paid_at: None,
            payment_method: String::new(),
            payer: String::new(),
        }
    }
}

/// An extra cost on a purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCostItem {
    /// What the cost is for, e.g. "Shipping"
    pub description: String,
    pub amount: i64,
    pub unit_price: Money,
    pub tax: TaxRate,
}

/// One priced line of a purchase, whether it is a stockpile or a cost item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostLine {
    pub amount: i64,
    pub unit_price: Money,
    pub tax: TaxRate,
}

impl From<&stockpile::Model> for CostLine {
    fn from(stockpile: &stockpile::Model) -> Self {
        Self {
            amount: stockpile.amount,
            unit_price: stockpile.unit_price(),
            tax: stockpile.tax(),
        }
    }
}

impl From<&cost_item::Model> for CostLine {
    fn from(item: &cost_item::Model) -> Self {
        Self {
            amount: item.amount,
            unit_price: item.unit_price(),
            tax: item.tax(),
        }
    }
}

/// Net and gross sum of a purchase after rebate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurchaseTotals {
    /// Sum without tax
    pub sum_net: Money,
    /// Sum including tax
    pub sum_gross: Money,
}

fn too_large(line: &CostLine) -> Error {
    Error::InvalidMoney {
        input: format!("{} × {}", line.amount, line.unit_price.to_decimal()),
    }
}

fn raw_total(line: &CostLine) -> Result<Decimal> {
    line.unit_price
        .to_decimal()
        .checked_mul(Decimal::from(line.amount))
        .ok_or_else(|| too_large(line))
}

fn with_tax(line: &CostLine) -> Result<Decimal> {
    raw_total(line)?
        .checked_mul(line.tax.to_decimal())
        .ok_or_else(|| too_large(line))
}

fn without_tax(line: &CostLine) -> Result<Decimal> {
    let tax = line.tax.validate()?;
    raw_total(line)?
        .checked_div(tax.to_decimal())
        .ok_or_else(|| Error::InvalidTax {
            tax: tax.to_string(),
        })
}

fn add_line(sum: Decimal, value: Decimal, line: &CostLine) -> Result<Decimal> {
    sum.checked_add(value).ok_or_else(|| too_large(line))
}

/// Sums up priced lines the way a purchase is billed.
///
/// Net purchases add tax on top of the recorded prices to get the gross sum, gross
/// purchases divide it out to get the net sum. The rebate applies to both. Each sum
/// is rounded once, half-up, after everything has been added.
///
/// # Errors
/// Returns [`Error::InvalidTax`] if a gross line has to be divided by a
/// non-positive tax factor, [`Error::InvalidMoney`] if a sum gets too large.
pub fn aggregate<'a, I>(is_net: bool, rebate: Rebate, lines: I) -> Result<PurchaseTotals>
where
    I: IntoIterator<Item = &'a CostLine>,
{
    let mut net = Decimal::ZERO;
    let mut gross = Decimal::ZERO;
    for line in lines {
        let (line_net, line_gross) = if is_net {
            (raw_total(line)?, with_tax(line)?)
        } else {
            (without_tax(line)?, raw_total(line)?)
        };
        net = add_line(net, line_net, line)?;
        gross = add_line(gross, line_gross, line)?;
    }

    let kept = rebate.kept_share();
    Ok(PurchaseTotals {
        sum_net: Money::from_decimal(net * kept)?,
        sum_gross: Money::from_decimal(gross * kept)?,
    })
}

/// Gross, rebated cost of a number of units taken from a stockpile.
///
/// Stockpiles without a purchase cost what their price says.
pub fn units_gross_cost(
    units: i64,
    stockpile: &stockpile::Model,
    purchase: Option<&purchase::Model>,
) -> Result<Money> {
    let line = CostLine {
        amount: units,
        ..CostLine::from(stockpile)
    };
    let Some(purchase) = purchase else {
        return Money::from_decimal(raw_total(&line)?);
    };
    let gross = if purchase.is_net {
        with_tax(&line)?
    } else {
        raw_total(&line)?
    };
    Money::from_decimal(gross * purchase.rebate().kept_share())
}

/// Records a purchase.
///
/// # Errors
/// Returns an error if the rebate is outside 0–100 % or the vendor doesn't exist.
pub async fn create_purchase(
    db: &DatabaseConnection,
    new_purchase: NewPurchase,
) -> Result<purchase::Model> {
    let rebate = new_purchase.rebate.validate()?;
    if Vendor::find_by_id(new_purchase.vendor_id)
        .one(db)
        .await?
        .is_none()
    {
        return Err(Error::not_found("Vendor", new_purchase.vendor_id));
    }

    let purchase = purchase::ActiveModel {
        vendor_id: Set(new_purchase.vendor_id),
        is_net: Set(new_purchase.is_net),
        paid: Set(new_purchase.paid),
        payment_method: Set(new_purchase.payment_method.trim().to_string()),
        payer: Set(new_purchase.payer.trim().to_string()),
        ordered_at: Set(new_purchase.ordered_at),
        paid_at: Set(new_purchase.paid_at),
        rebate: Set(rebate.scaled()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        purchase_id = purchase.id,
        vendor_id = purchase.vendor_id,
        "Created purchase"
    );
    Ok(purchase)
}

/// Marks a purchase as paid on the given day.
pub async fn mark_purchase_paid(
    db: &DatabaseConnection,
    purchase_id: i64,
    paid_at: NaiveDate,
) -> Result<purchase::Model> {
    let existing = get_purchase_by_id(db, purchase_id)
        .await?
        .ok_or_else(|| Error::not_found("Purchase", purchase_id))?;

    let mut purchase: purchase::ActiveModel = existing.into();
    purchase.paid = Set(true);
    purchase.paid_at = Set(Some(paid_at));
    let updated = purchase.update(db).await?;

    info!(purchase_id, %paid_at, "Marked purchase as paid");
    Ok(updated)
}

/// Deletes a purchase with everything bought in it.
///
/// Its stockpiles go (and with them the pillages taken from them), as do its cost
/// items and any links to bank transactions. The bank transactions themselves stay.
pub async fn delete_purchase(db: &DatabaseConnection, purchase_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let existing = Purchase::find_by_id(purchase_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Purchase", purchase_id))?;

    let stockpile_ids: Vec<i64> = get_stockpiles_for_purchase(&txn, purchase_id)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();
    if !stockpile_ids.is_empty() {
        Pillage::delete_many()
            .filter(pillage::Column::StockpileId.is_in(stockpile_ids))
            .exec(&txn)
            .await?;
    }
    Stockpile::delete_many()
        .filter(stockpile::Column::PurchaseId.eq(purchase_id))
        .exec(&txn)
        .await?;
    CostItem::delete_many()
        .filter(cost_item::Column::PurchaseId.eq(purchase_id))
        .exec(&txn)
        .await?;
    TransactionPurchase::delete_many()
        .filter(transaction_purchase::Column::PurchaseId.eq(purchase_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;

    txn.commit().await?;
    info!(purchase_id, "Deleted purchase");
    Ok(())
}

/// Retrieves a purchase by id.
pub async fn get_purchase_by_id(
    db: &DatabaseConnection,
    purchase_id: i64,
) -> Result<Option<purchase::Model>> {
    Purchase::find_by_id(purchase_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All purchases, newest order date first.
pub async fn get_all_purchases(db: &DatabaseConnection) -> Result<Vec<purchase::Model>> {
    Purchase::find()
        .order_by_desc(purchase::Column::OrderedAt)
        .order_by_desc(purchase::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Purchases made at one vendor, newest first.
pub async fn get_purchases_for_vendor(
    db: &DatabaseConnection,
    vendor_id: i64,
) -> Result<Vec<purchase::Model>> {
    Purchase::find()
        .filter(purchase::Column::VendorId.eq(vendor_id))
        .order_by_desc(purchase::Column::OrderedAt)
        .order_by_desc(purchase::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds an extra cost to a purchase.
///
/// # Errors
/// Returns an error if the description is empty, the amount is below 1, the tax
/// factor is not positive or the purchase doesn't exist.
pub async fn add_cost_item(
    db: &DatabaseConnection,
    purchase_id: i64,
    item: NewCostItem,
) -> Result<cost_item::Model> {
    if item.description.trim().is_empty() {
        return Err(Error::MissingField {
            field: "description",
        });
    }
    if item.amount < 1 {
        return Err(Error::InvalidAmount {
            amount: item.amount,
        });
    }
    let tax = item.tax.validate()?;
    if get_purchase_by_id(db, purchase_id).await?.is_none() {
        return Err(Error::not_found("Purchase", purchase_id));
    }

    let created = cost_item::ActiveModel {
        description: Set(item.description.trim().to_string()),
        amount: Set(item.amount),
        unit_price: Set(item.unit_price.minor()),
        tax: Set(tax.scaled()),
        purchase_id: Set(purchase_id),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(cost_item_id = created.id, purchase_id, "Added cost item");
    Ok(created)
}

/// Extra costs of one purchase.
pub async fn get_cost_items_for_purchase<C>(
    db: &C,
    purchase_id: i64,
) -> Result<Vec<cost_item::Model>>
where
    C: ConnectionTrait,
{
    CostItem::find()
        .filter(cost_item::Column::PurchaseId.eq(purchase_id))
        .order_by_asc(cost_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Removes an extra cost.
pub async fn delete_cost_item(db: &DatabaseConnection, cost_item_id: i64) -> Result<()> {
    let result = CostItem::delete_by_id(cost_item_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("CostItem", cost_item_id));
    }
    info!(cost_item_id, "Deleted cost item");
    Ok(())
}

/// Net and gross sum of a stored purchase, over its stockpiles and cost items.
pub async fn purchase_totals<C>(db: &C, purchase: &purchase::Model) -> Result<PurchaseTotals>
where
    C: ConnectionTrait,
{
    let stockpiles = get_stockpiles_for_purchase(db, purchase.id).await?;
    let cost_items = get_cost_items_for_purchase(db, purchase.id).await?;

    let lines: Vec<CostLine> = stockpiles
        .iter()
        .map(CostLine::from)
        .chain(cost_items.iter().map(CostLine::from))
        .collect();
    aggregate(purchase.is_net, purchase.rebate(), &lines)
}

/// Gross cost of the units a pillage took.
pub async fn pillage_gross_cost<C>(db: &C, pillage: &pillage::Model) -> Result<Money>
where
    C: ConnectionTrait,
{
    let stockpile = Stockpile::find_by_id(pillage.stockpile_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Stockpile", pillage.stockpile_id))?;
    let purchase = match stockpile.purchase_id {
        Some(purchase_id) => Some(
            Purchase::find_by_id(purchase_id)
                .one(db)
                .await?
                .ok_or_else(|| Error::not_found("Purchase", purchase_id))?,
        ),
        None => None,
    };
    units_gross_cost(pillage.amount, &stockpile, purchase.as_ref())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::stockpile::{NewStockpile, create_stockpile};
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    fn line(amount: i64, unit_price: i64, tax: i64) -> CostLine {
        CostLine {
            amount,
            unit_price: Money::from_minor(unit_price),
            tax: TaxRate::from_scaled(tax),
        }
    }

    #[test]
    fn test_aggregate_net_purchase() {
        let totals = aggregate(true, Rebate::NONE, &[line(30, 100, 11_900)]).unwrap();
        assert_eq!(totals.sum_gross, Money::from_minor(3570));
        assert_eq!(totals.sum_net, Money::from_minor(3000));
    }

    #[test]
    fn test_aggregate_gross_purchase_divides_tax_out() {
        let totals = aggregate(false, Rebate::NONE, &[line(2, 11_900, 11_900)]).unwrap();
        assert_eq!(totals.sum_gross, Money::from_minor(23_800));
        assert_eq!(totals.sum_net, Money::from_minor(20_000));
    }

    #[test]
    fn test_aggregate_applies_rebate_and_rounds_once() {
        let rebate: Rebate = "10".parse().unwrap();
        let lines = [line(1, 1, 15_000), line(1, 1, 15_000), line(1, 1, 15_000)];
        // Rounded per line this would be 3 × 2.
        let totals = aggregate(true, Rebate::NONE, &lines).unwrap();
        assert_eq!(totals.sum_gross, Money::from_minor(5));

        let totals = aggregate(true, rebate, &[line(3, 10_000, 10_000)]).unwrap();
        assert_eq!(totals.sum_net, Money::from_decimal(dec!(2.7)).unwrap());
        assert_eq!(totals.sum_gross, Money::from_decimal(dec!(2.7)).unwrap());
    }

    #[test]
    fn test_aggregate_empty_and_zero_tax() {
        let empty: [CostLine; 0] = [];
        assert_eq!(
            aggregate(false, Rebate::NONE, &empty).unwrap(),
            PurchaseTotals::default()
        );

        let result = aggregate(false, Rebate::NONE, &[line(1, 100, 0)]);
        assert!(matches!(result.unwrap_err(), Error::InvalidTax { .. }));
    }

    #[test]
    fn test_aggregate_reports_sums_too_large() {
        let huge = [line(i64::MAX, i64::MAX, 11_900)];
        assert!(matches!(
            aggregate(true, Rebate::NONE, &huge).unwrap_err(),
            Error::InvalidMoney { .. }
        ));
        assert!(matches!(
            aggregate(false, Rebate::NONE, &huge).unwrap_err(),
            Error::InvalidMoney { .. }
        ));
    }

    #[tokio::test]
    async fn test_purchase_totals_from_database() -> Result<()> {
        let (db, _team, product) = setup_with_product().await?;
        let vendor = create_test_vendor(&db, "Beverage Wholesale").await?;
        let purchase = create_test_purchase(&db, &vendor, true).await?;

        assert_eq!(
            purchase_totals(&db, &purchase).await?,
            PurchaseTotals::default()
        );

        create_stockpile(
            &db,
            NewStockpile {
                unit_price: Money::from_minor(100),
                tax: TaxRate::from_scaled(11_900),
                purchase_id: Some(purchase.id),
                ..NewStockpile::new(product.id, 30)
            },
        )
        .await?;
        let totals = purchase_totals(&db, &purchase).await?;
        assert_eq!(totals.sum_gross, Money::from_minor(3570));
        assert_eq!(totals.sum_net, Money::from_minor(3000));

        add_cost_item(
            &db,
            purchase.id,
            NewCostItem {
                description: "Shipping".to_string(),
                amount: 1,
                unit_price: Money::from_decimal(dec!(5))?,
                tax: TaxRate::from_scaled(11_900),
            },
        )
        .await?;
        let totals = purchase_totals(&db, &purchase).await?;
        assert_eq!(totals.sum_net, Money::from_decimal(dec!(5.30))?);
        assert_eq!(totals.sum_gross, Money::from_decimal(dec!(6.307))?);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_purchase_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let result = create_purchase(&db, NewPurchase::new(999, day)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NotFound {
                entity: "Vendor",
                ..
            }
        ));

        let vendor = create_test_vendor(&db, "Hardware Store").await?;
        let mut generous = NewPurchase::new(vendor.id, day);
        generous.rebate = Rebate::from_scaled(10_001);
        let result = create_purchase(&db, generous).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidRebate { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_mark_paid() -> Result<()> {
        let db = setup_test_db().await?;
        let vendor = create_test_vendor(&db, "Hardware Store").await?;
        let purchase = create_test_purchase(&db, &vendor, false).await?;
        assert!(!purchase.paid);

        let day = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let paid = mark_purchase_paid(&db, purchase.id, day).await?;
        assert!(paid.paid);
        assert_eq!(paid.paid_at, Some(day));
        Ok(())
    }

    #[tokio::test]
    async fn test_cost_item_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let vendor = create_test_vendor(&db, "Hardware Store").await?;
        let purchase = create_test_purchase(&db, &vendor, false).await?;
        let item = NewCostItem {
            description: "  ".to_string(),
            amount: 1,
            unit_price: Money::CENT,
            tax: TaxRate::NONE,
        };

        let result = add_cost_item(&db, purchase.id, item.clone()).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::MissingField {
                field: "description"
            }
        ));

        let deposit = NewCostItem {
            description: "Deposit".to_string(),
            ..item
        };
        let created = add_cost_item(&db, purchase.id, deposit.clone()).await?;
        let result = add_cost_item(&db, 999, deposit).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        delete_cost_item(&db, created.id).await?;
        assert!(get_cost_items_for_purchase(&db, purchase.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_purchase_cascades() -> Result<()> {
        let (db, team, product) = setup_with_product().await?;
        let vendor = create_test_vendor(&db, "Hardware Store").await?;
        let purchase = create_test_purchase(&db, &vendor, false).await?;
        let order = create_test_order(&db, &team, &product, 5).await?.record;
        create_stockpile(
            &db,
            NewStockpile {
                purchase_id: Some(purchase.id),
                ..NewStockpile::new(product.id, 5)
            },
        )
        .await?;
        add_cost_item(
            &db,
            purchase.id,
            NewCostItem {
                description: "Shipping".to_string(),
                amount: 1,
                unit_price: Money::CENT,
                tax: TaxRate::NONE,
            },
        )
        .await?;

        delete_purchase(&db, purchase.id).await?;

        assert!(get_purchase_by_id(&db, purchase.id).await?.is_none());
        assert!(Stockpile::find().all(&db).await?.is_empty());
        assert!(Pillage::find().all(&db).await?.is_empty());
        assert!(CostItem::find().all(&db).await?.is_empty());
        assert_eq!(crate::core::allocation::to_pillage(&db, &order).await?, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_pillage_gross_cost() -> Result<()> {
        let (db, team, product) = setup_with_product().await?;
        let vendor = create_test_vendor(&db, "Hardware Store").await?;
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut new_purchase = NewPurchase::new(vendor.id, day);
        new_purchase.is_net = true;
        new_purchase.rebate = "50".parse()?;
        let purchase = create_purchase(&db, new_purchase).await?;

        create_stockpile(
            &db,
            NewStockpile {
                unit_price: Money::from_decimal(dec!(2))?,
                tax: "1.19".parse()?,
                purchase_id: Some(purchase.id),
                ..NewStockpile::new(product.id, 10)
            },
        )
        .await?;
        let pillages = create_test_order(&db, &team, &product, 3).await?.pillages;

        // 3 × 2.00 × 1.19 × 50 %
        assert_eq!(
            pillage_gross_cost(&db, &pillages[0]).await?,
            Money::from_decimal(dec!(3.57))?
        );
        Ok(())
    }
}
