//! Database configuration module for Squirrel.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL. Foreign keys
//! and their delete rules come from the entities' relation attributes.

use crate::entities::{
    Account, BankTransaction, CostItem, Event, Order, Pillage, Product, Purchase, Stockpile, Team,
    TransactionPurchase, Vendor,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::{debug, info};

/// Database used when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/squirrel.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Creates the directory a file-backed `SQLite` database lives in.
fn ensure_database_dir(url: &str) -> Result<()> {
    let Some(path) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Establishes a connection to the database named by `url`.
pub async fn create_connection(url: &str) -> Result<DatabaseConnection> {
    ensure_database_dir(url)?;
    let db = Database::connect(url).await?;
    info!(url, "Connected to database");
    Ok(db)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    debug!(table = entity.table_name(), "Ensured table exists");
    Ok(())
}

/// Creates all tables that don't exist yet, referenced tables first.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Team).await?;
    create_table(db, &schema, Event).await?;
    create_table(db, &schema, Vendor).await?;
    create_table(db, &schema, Product).await?;
    create_table(db, &schema, Purchase).await?;
    create_table(db, &schema, Order).await?;
    create_table(db, &schema, Stockpile).await?;
    create_table(db, &schema, Pillage).await?;
    create_table(db, &schema, CostItem).await?;
    create_table(db, &schema, Account).await?;
    create_table(db, &schema, BankTransaction).await?;
    create_table(db, &schema, TransactionPurchase).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        bank_transaction::Model as BankTransactionModel, order::Model as OrderModel,
        pillage::Model as PillageModel, transaction_purchase::Model as TransactionPurchaseModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = create_connection("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<OrderModel> = Order::find().limit(1).all(&db).await?;
        let _: Vec<PillageModel> = Pillage::find().limit(1).all(&db).await?;
        let _: Vec<BankTransactionModel> = BankTransaction::find().limit(1).all(&db).await?;
        let _: Vec<TransactionPurchaseModel> =
            TransactionPurchase::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_twice() -> Result<()> {
        let db = create_connection("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[test]
    fn test_default_database_url() {
        assert!(DEFAULT_DATABASE_URL.starts_with("sqlite://"));
    }
}
