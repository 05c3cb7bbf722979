//! Stockpile commands - recording supply.

use crate::{
    cli::CliData,
    core::{
        allocation,
        money::{Money, TaxRate},
        product,
        stockpile::{self, NewStockpile},
    },
    errors::Result,
};

/// Records a stockpile and reports how much of it went to waiting orders.
///
/// Amount, price and tax are checked before an unknown product gets created.
pub async fn add(
    data: &CliData,
    product_name: &str,
    amount: i64,
    unit_price: &str,
    tax: &str,
    purchase_id: Option<i64>,
) -> Result<()> {
    let db = &data.database;
    let amount = allocation::ensure_positive_amount(amount)?;
    let unit_price: Money = unit_price.parse()?;
    let tax = tax.parse::<TaxRate>()?.validate()?;
    let product = product::get_or_create_product(db, product_name).await?;

    let recorded = stockpile::create_stockpile(
        db,
        NewStockpile {
            unit_price,
            tax,
            purchase_id,
            ..NewStockpile::new(product.id, amount)
        },
    )
    .await?;

    println!(
        "✅ Stockpile {} recorded: {} × {} at {} each.",
        recorded.record.id, recorded.record.amount, product.name, unit_price
    );
    for pillage in &recorded.pillages {
        println!("   {} went to order {}.", pillage.amount, pillage.order_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::catalog::CatalogConfig, errors::Error, test_utils::*};

    #[tokio::test]
    async fn test_bad_input_leaves_no_product_behind() -> Result<()> {
        let data = CliData::new(setup_test_db().await?, CatalogConfig::default());

        let result = add(&data, "Gaffer tape", 5, "1.50", "0", None).await;
        assert!(matches!(result, Err(Error::InvalidTax { .. })));
        let result = add(&data, "Gaffer tape", 0, "1.50", "1.19", None).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: 0 })));
        let result = add(&data, "Gaffer tape", 5, "cheap", "1.19", None).await;
        assert!(matches!(result, Err(Error::InvalidMoney { .. })));

        assert!(
            product::get_product_by_name(&data.database, "Gaffer tape")
                .await?
                .is_none()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_add_records_stockpile() -> Result<()> {
        let data = CliData::new(setup_test_db().await?, CatalogConfig::default());

        add(&data, "Gaffer tape", 5, "1.50", "1.19", None).await?;

        let stockpiles = stockpile::get_all_stockpiles(&data.database).await?;
        assert_eq!(stockpiles.len(), 1);
        assert_eq!(stockpiles[0].amount, 5);
        assert_eq!(stockpiles[0].unit_price(), Money::from_minor(15_000));
        assert_eq!(stockpiles[0].tax().scaled(), 11_900);
        Ok(())
    }
}
