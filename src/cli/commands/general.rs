//! Setup commands - `init`.

use crate::{cli::CliData, config::database, core::catalog, errors::Result};
use tracing::info;

/// Creates missing tables and seeds the catalog from the configuration.
pub async fn init(data: &CliData) -> Result<()> {
    database::create_tables(&data.database).await?;
    let created = catalog::seed_catalog(&data.database, &data.config).await?;

    info!(created, "Database initialized");
    println!("✅ Database ready, {created} catalog entries created.");
    Ok(())
}
