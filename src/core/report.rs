//! Report generation business logic.
//!
//! CSV exports of orders and bank transactions, and the per-team budget overview.
//! Everything is computed from the stored pillages at the time of the call; the
//! CSV writers take any [`std::io::Write`] so the CLI can hand in a file or stdout.

use crate::{
    core::{
        account::{get_purchases_for_transaction, get_transactions_for_account},
        money::Money,
        purchase::units_gross_cost,
    },
    entities::{
        Event, Order, Pillage, Product, Purchase, Stockpile, Team, bank_transaction, event, order,
        pillage, product, purchase, stockpile, team,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, prelude::*};
use std::{
    collections::{BTreeMap, HashMap},
    io::Write,
};
use tracing::info;

/// Header of the order export.
pub const ORDER_EXPORT_HEADER: [&str; 8] = [
    "Amount",
    "Item",
    "URL",
    "State",
    "Unit price",
    "Total price",
    "Event",
    "Team",
];

/// Header of the transaction export.
pub const TRANSACTION_EXPORT_HEADER: [&str; 5] =
    ["Date", "Description", "Transfer", "Deposit", "Withdrawal"];

async fn by_id<E, K>(db: &DatabaseConnection, key: K) -> Result<HashMap<i64, E::Model>>
where
    E: EntityTrait,
    K: Fn(&E::Model) -> i64,
{
    let models = E::find().all(db).await?;
    Ok(models.into_iter().map(|m| (key(&m), m)).collect())
}

/// Writes all orders as CSV, oldest first.
///
/// `Unit price` is the product's default price and stays empty if the product has
/// none; `Total price` is that price times the ordered amount.
/// Returns the number of orders written.
pub async fn export_orders_csv<W: Write>(db: &DatabaseConnection, writer: W) -> Result<usize> {
    let products = by_id::<Product, _>(db, |p: &product::Model| p.id).await?;
    let events = by_id::<Event, _>(db, |e: &event::Model| e.id).await?;
    let teams = by_id::<Team, _>(db, |t: &team::Model| t.id).await?;
    let orders = Order::find()
        .order_by_asc(order::Column::Id)
        .all(db)
        .await?;

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(ORDER_EXPORT_HEADER)?;
    for order in &orders {
        let product = products
            .get(&order.product_id)
            .ok_or_else(|| Error::not_found("Product", order.product_id))?;
        let team = teams
            .get(&order.team_id)
            .ok_or_else(|| Error::not_found("Team", order.team_id))?;
        let event = order
            .event_id
            .and_then(|id| events.get(&id))
            .map_or("", |e| e.name.as_str());
        let (unit_price, total_price) = match product.default_price() {
            Some(price) => (
                price.to_string(),
                price.checked_mul(order.amount)?.to_string(),
            ),
            None => (String::new(), String::new()),
        };

        csv_writer.write_record([
            order.amount.to_string().as_str(),
            product.name.as_str(),
            order.url.as_str(),
            order.state.label(),
            unit_price.as_str(),
            total_price.as_str(),
            event,
            team.name.as_str(),
        ])?;
    }
    csv_writer.flush()?;

    info!(orders = orders.len(), "Exported orders");
    Ok(orders.len())
}

/// How much of a withdrawal each team is responsible for, keyed by team name.
///
/// The share of a team is the gross, rebated cost of everything it pillaged from
/// stockpiles of the purchases the transaction is linked to.
pub async fn team_shares(
    db: &DatabaseConnection,
    transaction: &bank_transaction::Model,
) -> Result<BTreeMap<String, Money>> {
    let teams = by_id::<Team, _>(db, |t: &team::Model| t.id).await?;
    let mut shares: BTreeMap<String, Money> = BTreeMap::new();

    for purchase in get_purchases_for_transaction(db, transaction).await? {
        let stockpiles = Stockpile::find()
            .filter(stockpile::Column::PurchaseId.eq(purchase.id))
            .order_by_asc(stockpile::Column::Id)
            .all(db)
            .await?;
        for stockpile in &stockpiles {
            let pillages = Pillage::find()
                .filter(pillage::Column::StockpileId.eq(stockpile.id))
                .find_also_related(Order)
                .all(db)
                .await?;
            for (pillage, order) in pillages {
                let order = order.ok_or_else(|| Error::not_found("Order", pillage.order_id))?;
                let team = teams
                    .get(&order.team_id)
                    .ok_or_else(|| Error::not_found("Team", order.team_id))?;
                let cost = units_gross_cost(pillage.amount, stockpile, Some(&purchase))?;
                let share = shares.entry(team.name.clone()).or_default();
                *share = share.checked_add(cost)?;
            }
        }
    }
    Ok(shares)
}

/// Writes the transactions of an account as CSV, by booking date.
///
/// Every withdrawal is followed by one line per team that pillaged goods from the
/// purchases it paid, carrying that team's share as a withdrawal. Deposits get no
/// breakdown; nobody pays for them.
/// Returns the number of bank transactions written.
pub async fn export_transactions_csv<W: Write>(
    db: &DatabaseConnection,
    account_id: i64,
    writer: W,
) -> Result<usize> {
    let transactions = get_transactions_for_account(db, account_id).await?;

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(TRANSACTION_EXPORT_HEADER)?;
    for transaction in &transactions {
        let amount = transaction.amount().to_string();
        let (deposit, withdrawal) = if transaction.is_withdrawal() {
            ("", amount.as_str())
        } else {
            (amount.as_str(), "")
        };
        csv_writer.write_record([
            transaction.date.to_string().as_str(),
            transaction.description.as_deref().unwrap_or(""),
            "",
            deposit,
            withdrawal,
        ])?;

        if !transaction.is_withdrawal() {
            continue;
        }
        for (team, share) in team_shares(db, transaction).await? {
            csv_writer.write_record([
                "",
                team.as_str(),
                "",
                "",
                (-share).to_string().as_str(),
            ])?;
        }
    }
    csv_writer.flush()?;

    info!(
        account_id,
        transactions = transactions.len(),
        "Exported transactions"
    );
    Ok(transactions.len())
}

/// What a team has ordered and what it was given so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamBudget {
    /// The team
    pub team: team::Model,
    /// Number of orders placed
    pub orders: usize,
    /// Units ordered over all orders
    pub units_ordered: i64,
    /// Units already pillaged for those orders
    pub units_allocated: i64,
    /// Gross cost of the pillaged units
    pub allocated_cost: Money,
}

/// Budget overview of every team, sorted by team name without regard to case.
pub async fn team_budgets(db: &DatabaseConnection) -> Result<Vec<TeamBudget>> {
    let stockpiles = by_id::<Stockpile, _>(db, |s: &stockpile::Model| s.id).await?;
    let purchases = by_id::<Purchase, _>(db, |p: &purchase::Model| p.id).await?;
    let mut teams = Team::find().all(db).await?;
    teams.sort_by_key(|t| t.name.to_lowercase());

    let mut budgets = Vec::with_capacity(teams.len());
    for team in teams {
        let orders = Order::find()
            .filter(order::Column::TeamId.eq(team.id))
            .find_with_related(Pillage)
            .all(db)
            .await?;

        let mut budget = TeamBudget {
            team,
            orders: orders.len(),
            units_ordered: 0,
            units_allocated: 0,
            allocated_cost: Money::ZERO,
        };
        for (order, pillages) in &orders {
            budget.units_ordered = budget.units_ordered.saturating_add(order.amount);
            for pillage in pillages {
                budget.units_allocated = budget.units_allocated.saturating_add(pillage.amount);
                let stockpile = stockpiles
                    .get(&pillage.stockpile_id)
                    .ok_or_else(|| Error::not_found("Stockpile", pillage.stockpile_id))?;
                let purchase = stockpile.purchase_id.and_then(|id| purchases.get(&id));
                let cost = units_gross_cost(pillage.amount, stockpile, purchase)?;
                budget.allocated_cost = budget.allocated_cost.checked_add(cost)?;
            }
        }
        budgets.push(budget);
    }
    Ok(budgets)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{
        account::{NewBankTransaction, create_account, create_transaction, link_purchase},
        catalog::create_team,
        money::TaxRate,
        order::{NewOrder, create_order},
        product::create_product,
        stockpile::{NewStockpile, create_stockpile},
    };
    use crate::test_utils::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn written(buffer: Vec<u8>) -> String {
        String::from_utf8(buffer).unwrap()
    }

    #[tokio::test]
    async fn test_export_orders_csv() -> Result<()> {
        let (db, team, plain) = setup_with_product().await?;
        let event = create_test_event(&db, "Camp").await?;
        let priced = create_product(
            &db,
            "Club Mate",
            Some("crates".into()),
            Some(Money::from_decimal(dec!(1.5))?),
        )
        .await?;

        let mut mate = NewOrder::new(4, priced.id, team.id);
        mate.event_id = Some(event.id);
        mate.url = "https://example.com/mate".into();
        create_order(&db, mate).await?;
        create_test_order(&db, &team, &plain, 2).await?;

        let mut buffer = Vec::new();
        let count = export_orders_csv(&db, &mut buffer).await?;

        assert_eq!(count, 2);
        assert_eq!(
            written(buffer),
            "Amount,Item,URL,State,Unit price,Total price,Event,Team\n\
             4,Club Mate,https://example.com/mate,Requested,1.50,6.00,Camp,Test Team\n\
             2,Test Product,,Requested,,,,Test Team\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_export_orders_reports_total_price_overflow() -> Result<()> {
        let (db, team, _plain) = setup_with_product().await?;
        let priced = create_product(
            &db,
            "Cable tie",
            None,
            Some(Money::from_decimal(dec!(1))?),
        )
        .await?;
        create_order(&db, NewOrder::new(i64::MAX / 2, priced.id, team.id)).await?;

        let mut buffer = Vec::new();
        let result = export_orders_csv(&db, &mut buffer).await;

        assert!(matches!(result.unwrap_err(), Error::InvalidMoney { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_export_transactions_splits_withdrawals_by_team() -> Result<()> {
        let (db, kitchen, product) = setup_with_product().await?;
        let bar = create_team(&db, "Bar").await?;
        let vendor = create_test_vendor(&db, "Beverage Wholesale").await?;
        let purchase = create_test_purchase(&db, &vendor, true).await?;

        create_order(&db, NewOrder::new(10, product.id, kitchen.id)).await?;
        create_order(&db, NewOrder::new(20, product.id, bar.id)).await?;
        create_stockpile(
            &db,
            NewStockpile {
                unit_price: Money::from_decimal(dec!(1))?,
                tax: TaxRate::from_scaled(11_900),
                purchase_id: Some(purchase.id),
                ..NewStockpile::new(product.id, 30)
            },
        )
        .await?;

        let account = create_account(&db, "Main").await?;
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        create_transaction(
            &db,
            NewBankTransaction {
                account_id: account.id,
                amount: Money::from_decimal(dec!(100))?,
                description: Some("Fees".into()),
                date: day,
            },
        )
        .await?;
        let withdrawal = create_transaction(
            &db,
            NewBankTransaction {
                account_id: account.id,
                amount: Money::from_decimal(dec!(-35.70))?,
                description: Some("Beverage Wholesale".into()),
                date: day,
            },
        )
        .await?;
        link_purchase(&db, withdrawal.id, purchase.id).await?;

        let mut buffer = Vec::new();
        let count = export_transactions_csv(&db, account.id, &mut buffer).await?;

        assert_eq!(count, 2);
        assert_eq!(
            written(buffer),
            "Date,Description,Transfer,Deposit,Withdrawal\n\
             2024-03-04,Fees,,100.00,\n\
             2024-03-04,Beverage Wholesale,,,-35.70\n\
             ,Bar,,,-23.80\n\
             ,Test Team,,,-11.90\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_team_budgets() -> Result<()> {
        let (db, kitchen, product) = setup_with_product().await?;
        let bar = create_team(&db, "bar").await?;
        create_stockpile(
            &db,
            NewStockpile {
                unit_price: Money::from_decimal(dec!(2))?,
                ..NewStockpile::new(product.id, 5)
            },
        )
        .await?;
        create_test_order(&db, &kitchen, &product, 3).await?;
        create_test_order(&db, &kitchen, &product, 4).await?;

        let budgets = team_budgets(&db).await?;

        assert_eq!(budgets.len(), 2);
        assert_eq!(budgets[0].team, bar);
        assert_eq!(budgets[0].orders, 0);
        assert_eq!(budgets[0].allocated_cost, Money::ZERO);

        let kitchen_budget = &budgets[1];
        assert_eq!(kitchen_budget.orders, 2);
        assert_eq!(kitchen_budget.units_ordered, 7);
        assert_eq!(kitchen_budget.units_allocated, 5);
        assert_eq!(kitchen_budget.allocated_cost, Money::from_decimal(dec!(10))?);
        Ok(())
    }
}
