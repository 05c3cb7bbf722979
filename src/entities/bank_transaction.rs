//! Bank transaction entity - One line of an account statement.
//!
//! Amounts are signed: deposits are positive, withdrawals negative. A transaction
//! can pay for several purchases (see [`super::transaction_purchase`]).

use crate::core::money::Money;
use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Bank transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Account the transaction was booked on
    pub account_id: i64,
    /// Signed amount in 1/100 cent (negative for withdrawals)
    pub amount: i64,
    /// Booking text from the bank statement
    pub description: Option<String>,
    /// Booking date
    pub date: NaiveDate,
}

impl Model {
    /// Amount as [`Money`].
    #[must_use]
    pub const fn amount(&self) -> Money {
        Money::from_minor(self.amount)
    }

    /// Withdrawals are the only transactions anybody pays for.
    #[must_use]
    pub const fn is_withdrawal(&self) -> bool {
        self.amount < 0
    }
}

/// Defines relationships between a bank transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one account
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        super::transaction_purchase::Relation::Purchase.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::transaction_purchase::Relation::Transaction.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
