//! Link table between bank transactions and the purchases they paid for.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction/purchase link model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_purchases")]
pub struct Model {
    /// Paying transaction
    #[sea_orm(primary_key, auto_increment = false)]
    pub transaction_id: i64,
    /// Purchase paid for
    #[sea_orm(primary_key, auto_increment = false)]
    pub purchase_id: i64,
}

/// Both sides of the link
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The bank transaction
    #[sea_orm(
        belongs_to = "super::bank_transaction::Entity",
        from = "Column::TransactionId",
        to = "super::bank_transaction::Column::Id",
        on_delete = "Cascade"
    )]
    Transaction,
    /// The purchase
    #[sea_orm(
        belongs_to = "super::purchase::Entity",
        from = "Column::PurchaseId",
        to = "super::purchase::Column::Id",
        on_delete = "Cascade"
    )]
    Purchase,
}

impl ActiveModelBehavior for ActiveModel {}
