//! Report commands - order export, team budgets and purchase sums.

use crate::{
    cli::{CliData, commands::output},
    core::{purchase, report},
    errors::{Error, Result},
};
use std::{io::Write, path::PathBuf};

/// Writes all orders as CSV.
pub async fn export_orders(data: &CliData, file: Option<PathBuf>) -> Result<()> {
    let mut writer = output(file.as_deref())?;
    report::export_orders_csv(&data.database, &mut writer).await?;
    writer.flush()?;
    Ok(())
}

/// Prints the budget overview of every team.
pub async fn budget(data: &CliData) -> Result<()> {
    let budgets = report::team_budgets(&data.database).await?;
    if budgets.is_empty() {
        println!("No teams have been defined yet.");
        return Ok(());
    }

    println!(
        "{:<24} {:>6} {:>8} {:>9} {:>12}",
        "Team", "Orders", "Ordered", "Received", "Cost"
    );
    for budget in budgets {
        println!(
            "{:<24} {:>6} {:>8} {:>9} {:>12}",
            budget.team.name,
            budget.orders,
            budget.units_ordered,
            budget.units_allocated,
            budget.allocated_cost.to_string()
        );
    }
    Ok(())
}

/// Prints net and gross sum of one purchase.
pub async fn purchase_sums(data: &CliData, purchase_id: i64) -> Result<()> {
    let purchase = purchase::get_purchase_by_id(&data.database, purchase_id)
        .await?
        .ok_or_else(|| Error::not_found("Purchase", purchase_id))?;
    let totals = purchase::purchase_totals(&data.database, &purchase).await?;

    println!("Purchase {} ({})", purchase.id, purchase.ordered_at);
    println!("  Net:   {}", totals.sum_net);
    println!("  Gross: {}", totals.sum_gross);
    if purchase.rebate > 0 {
        println!("  Rebate: {} %", purchase.rebate());
    }
    Ok(())
}
