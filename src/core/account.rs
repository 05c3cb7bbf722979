//! Account business logic - Bank accounts, their statements and what paid for what.
//!
//! Statements come in as tab-separated exports from the bank. Each withdrawal can
//! be linked to the purchases it paid, which is what lets the transaction export
//! split it up among the teams.

use crate::{
    core::{
        catalog::clean_name,
        money::Money,
        purchase::{get_all_purchases, purchase_totals},
    },
    entities::{
        Account, BankTransaction, Purchase, TransactionPurchase, account, bank_transaction,
        purchase, transaction_purchase,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use std::io::Read;
use tracing::{debug, info};

/// Date format used by the bank export (`DD.MM.YYYY`).
pub const IMPORT_DATE_FORMAT: &str = "%d.%m.%Y";

/// Creates an account.
///
/// # Errors
/// Returns an error if the name is empty or already taken.
pub async fn create_account(db: &DatabaseConnection, name: &str) -> Result<account::Model> {
    let name = clean_name(name)?;
    if get_account_by_name(db, &name).await?.is_some() {
        return Err(Error::DuplicateName {
            entity: "Account",
            name,
        });
    }

    let account = account::ActiveModel {
        name: Set(name),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(account_id = account.id, name = %account.name, "Created account");
    Ok(account)
}

/// Finds an account by its exact name.
pub async fn get_account_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<account::Model>> {
    Account::find()
        .filter(account::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves an account by id.
pub async fn get_account_by_id(
    db: &DatabaseConnection,
    account_id: i64,
) -> Result<Option<account::Model>> {
    Account::find_by_id(account_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All accounts, sorted by name without regard to case.
pub async fn get_all_accounts(db: &DatabaseConnection) -> Result<Vec<account::Model>> {
    let mut accounts = Account::find().all(db).await?;
    accounts.sort_by_key(|a| a.name.to_lowercase());
    Ok(accounts)
}

/// Deletes an account together with all of its transactions.
pub async fn delete_account(db: &DatabaseConnection, account_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let existing = Account::find_by_id(account_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Account", account_id))?;
    let transaction_ids: Vec<i64> = BankTransaction::find()
        .filter(bank_transaction::Column::AccountId.eq(account_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();
    if !transaction_ids.is_empty() {
        TransactionPurchase::delete_many()
            .filter(transaction_purchase::Column::TransactionId.is_in(transaction_ids))
            .exec(&txn)
            .await?;
    }
    let removed = BankTransaction::delete_many()
        .filter(bank_transaction::Column::AccountId.eq(account_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;

    txn.commit().await?;
    info!(
        account_id,
        transactions_removed = removed.rows_affected,
        "Deleted account"
    );
    Ok(())
}

/// A booking to record on an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBankTransaction {
    /// Account the booking belongs to
    pub account_id: i64,
    /// Signed: negative for withdrawals
    pub amount: Money,
    /// Booking text
    pub description: Option<String>,
    /// Booking date
    pub date: NaiveDate,
}

async fn insert_transaction<C>(
    db: &C,
    new_transaction: NewBankTransaction,
) -> Result<bank_transaction::Model>
where
    C: ConnectionTrait,
{
    let description = new_transaction
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    bank_transaction::ActiveModel {
        account_id: Set(new_transaction.account_id),
        amount: Set(new_transaction.amount.minor()),
        description: Set(description),
        date: Set(new_transaction.date),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Records a single transaction.
///
/// # Errors
/// Returns an error if the account doesn't exist.
pub async fn create_transaction(
    db: &DatabaseConnection,
    new_transaction: NewBankTransaction,
) -> Result<bank_transaction::Model> {
    if get_account_by_id(db, new_transaction.account_id)
        .await?
        .is_none()
    {
        return Err(Error::not_found("Account", new_transaction.account_id));
    }
    let transaction = insert_transaction(db, new_transaction).await?;
    info!(
        transaction_id = transaction.id,
        account_id = transaction.account_id,
        amount = %transaction.amount(),
        "Recorded transaction"
    );
    Ok(transaction)
}

/// Retrieves a transaction by id.
pub async fn get_transaction_by_id(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Option<bank_transaction::Model>> {
    BankTransaction::find_by_id(transaction_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Transactions of one account by booking date.
pub async fn get_transactions_for_account(
    db: &DatabaseConnection,
    account_id: i64,
) -> Result<Vec<bank_transaction::Model>> {
    BankTransaction::find()
        .filter(bank_transaction::Column::AccountId.eq(account_id))
        .order_by_asc(bank_transaction::Column::Date)
        .order_by_asc(bank_transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a transaction and its purchase links.
pub async fn delete_transaction(db: &DatabaseConnection, transaction_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    TransactionPurchase::delete_many()
        .filter(transaction_purchase::Column::TransactionId.eq(transaction_id))
        .exec(&txn)
        .await?;
    let result = BankTransaction::delete_by_id(transaction_id)
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Transaction", transaction_id));
    }
    txn.commit().await?;

    info!(transaction_id, "Deleted transaction");
    Ok(())
}

/// Records that a transaction paid (part of) a purchase. Linking twice is a no-op.
pub async fn link_purchase(
    db: &DatabaseConnection,
    transaction_id: i64,
    purchase_id: i64,
) -> Result<()> {
    if get_transaction_by_id(db, transaction_id).await?.is_none() {
        return Err(Error::not_found("Transaction", transaction_id));
    }
    if Purchase::find_by_id(purchase_id).one(db).await?.is_none() {
        return Err(Error::not_found("Purchase", purchase_id));
    }
    if TransactionPurchase::find_by_id((transaction_id, purchase_id))
        .one(db)
        .await?
        .is_some()
    {
        return Ok(());
    }

    transaction_purchase::ActiveModel {
        transaction_id: Set(transaction_id),
        purchase_id: Set(purchase_id),
    }
    .insert(db)
    .await?;
    info!(transaction_id, purchase_id, "Linked transaction to purchase");
    Ok(())
}

/// Removes the link between a transaction and a purchase.
pub async fn unlink_purchase(
    db: &DatabaseConnection,
    transaction_id: i64,
    purchase_id: i64,
) -> Result<()> {
    TransactionPurchase::delete_by_id((transaction_id, purchase_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Purchases a transaction is linked to.
pub async fn get_purchases_for_transaction<C>(
    db: &C,
    transaction: &bank_transaction::Model,
) -> Result<Vec<purchase::Model>>
where
    C: ConnectionTrait,
{
    transaction
        .find_related(Purchase)
        .order_by_asc(purchase::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Purchases whose gross sum is within a cent of what the transaction moved.
///
/// These are the likely candidates for what a withdrawal paid.
pub async fn suggest_purchases(
    db: &DatabaseConnection,
    transaction: &bank_transaction::Model,
) -> Result<Vec<purchase::Model>> {
    let target = transaction.amount().abs();
    let mut suggestions = Vec::new();
    for purchase in get_all_purchases(db).await? {
        let totals = purchase_totals(db, &purchase).await?;
        let close = target
            .checked_sub(totals.sum_gross)
            .is_ok_and(|diff| diff.abs() <= Money::CENT);
        if close {
            suggestions.push(purchase);
        }
    }
    debug!(
        transaction_id = transaction.id,
        suggestions = suggestions.len(),
        "Suggested purchases for transaction"
    );
    Ok(suggestions)
}

/// One line of a bank statement export. Columns not listed here are ignored.
#[derive(Debug, Deserialize)]
struct StatementRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "Deposit", default)]
    deposit: String,
    #[serde(rename = "Withdrawal", default)]
    withdrawal: String,
}

impl StatementRow {
    fn into_transaction(self, account_id: i64) -> std::result::Result<NewBankTransaction, String> {
        let date = NaiveDate::parse_from_str(self.date.trim(), IMPORT_DATE_FORMAT)
            .map_err(|e| format!("invalid date '{}': {e}", self.date))?;
        let amount = if self.withdrawal.trim().is_empty() {
            Money::parse_lenient(&self.deposit).map_err(|e| e.to_string())?
        } else {
            -Money::parse_lenient(&self.withdrawal).map_err(|e| e.to_string())?
        };
        Ok(NewBankTransaction {
            account_id,
            amount,
            description: self.description,
            date,
        })
    }
}

/// Imports a tab-separated bank statement into an account.
///
/// The first row names the columns; `Date` (`DD.MM.YYYY`), `Description`, `Deposit`
/// and `Withdrawal` are used. A row with a withdrawal becomes a negative amount,
/// otherwise the deposit is taken. Anything but digits and the decimal point is
/// stripped from amounts. The import is all or nothing.
///
/// # Errors
/// Returns [`Error::Import`] naming the line of the first row that can't be read.
pub async fn import_transactions<R: Read>(
    db: &DatabaseConnection,
    account_id: i64,
    reader: R,
) -> Result<Vec<bank_transaction::Model>> {
    if get_account_by_id(db, account_id).await?.is_none() {
        return Err(Error::not_found("Account", account_id));
    }

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map_or(0, csv::Position::line);
        let row: StatementRow = record
            .deserialize(Some(&headers))
            .map_err(|e| Error::Import {
                line,
                message: e.to_string(),
            })?;
        let new_transaction = row
            .into_transaction(account_id)
            .map_err(|message| Error::Import { line, message })?;
        rows.push(new_transaction);
    }

    let txn = db.begin().await?;
    let mut imported = Vec::with_capacity(rows.len());
    for new_transaction in rows {
        imported.push(insert_transaction(&txn, new_transaction).await?);
    }
    txn.commit().await?;

    info!(account_id, count = imported.len(), "Imported transactions");
    Ok(imported)
}
