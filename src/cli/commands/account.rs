//! Account commands - bank statement import and transaction export.

use crate::{
    cli::{CliData, commands::output},
    core::{account, report},
    entities::account::Model as AccountModel,
    errors::{Error, Result},
};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

async fn find_account(data: &CliData, name: &str) -> Result<AccountModel> {
    account::get_account_by_name(&data.database, name)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "Account",
            key: name.to_string(),
        })
}

/// Imports a tab-separated statement file into the named account.
pub async fn import(data: &CliData, account_name: &str, file: &Path) -> Result<()> {
    let account = find_account(data, account_name).await?;
    let reader = BufReader::new(File::open(file)?);

    let imported = account::import_transactions(&data.database, account.id, reader).await?;
    println!(
        "✅ Imported {} transactions into '{}'.",
        imported.len(),
        account.name
    );
    Ok(())
}

/// Writes the named account's transactions as CSV.
pub async fn export(data: &CliData, account_name: &str, file: Option<PathBuf>) -> Result<()> {
    let account = find_account(data, account_name).await?;
    let mut writer = output(file.as_deref())?;

    report::export_transactions_csv(&data.database, account.id, &mut writer).await?;
    writer.flush()?;
    Ok(())
}
