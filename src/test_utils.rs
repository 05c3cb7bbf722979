//! Shared test utilities for Squirrel.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        allocation::Allocated,
        catalog, order,
        order::NewOrder,
        product,
        purchase::{self, NewPurchase},
        stockpile::{self, NewStockpile},
    },
    entities,
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = crate::config::database::create_connection("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test team with the given name.
pub async fn create_test_team(db: &DatabaseConnection, name: &str) -> Result<entities::team::Model> {
    catalog::create_team(db, name).await
}

/// Creates a test event with the given name.
pub async fn create_test_event(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::event::Model> {
    catalog::create_event(db, name).await
}

/// Creates a test vendor with the given name.
pub async fn create_test_vendor(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::vendor::Model> {
    catalog::create_vendor(db, name).await
}

/// Creates a test product without unit or default price.
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::product::Model> {
    product::create_product(db, name, None, None).await
}

/// Creates a test purchase at `vendor`.
///
/// # Defaults
/// * `ordered_at`: 2024-01-15
/// * `rebate`: none
/// * unpaid
pub async fn create_test_purchase(
    db: &DatabaseConnection,
    vendor: &entities::vendor::Model,
    is_net: bool,
) -> Result<entities::purchase::Model> {
    let ordered_at = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default();
    purchase::create_purchase(
        db,
        NewPurchase {
            is_net,
            ..NewPurchase::new(vendor.id, ordered_at)
        },
    )
    .await
}

/// Creates a free-standing stockpile of `amount` units of `product`, price 0, no tax.
/// Waiting orders are filled from it right away.
pub async fn create_test_stockpile(
    db: &DatabaseConnection,
    product: &entities::product::Model,
    amount: i64,
) -> Result<Allocated<entities::stockpile::Model>> {
    stockpile::create_stockpile(db, NewStockpile::new(product.id, amount)).await
}

/// Creates a requested order without event. It is filled from stock right away.
pub async fn create_test_order(
    db: &DatabaseConnection,
    team: &entities::team::Model,
    product: &entities::product::Model,
    amount: i64,
) -> Result<Allocated<entities::order::Model>> {
    order::create_order(db, NewOrder::new(amount, product.id, team.id)).await
}

/// Sets up a complete test environment with a team and a product.
/// Returns (db, team, product) for allocation tests.
pub async fn setup_with_product() -> Result<(
    DatabaseConnection,
    entities::team::Model,
    entities::product::Model,
)> {
    let db = setup_test_db().await?;
    let team = create_test_team(&db, "Test Team").await?;
    let product = create_test_product(&db, "Test Product").await?;
    Ok((db, team, product))
}
