//! Purchase entity - A transaction with a vendor.
//!
//! A purchase groups the stockpiles bought and any extra cost items (shipping,
//! deposit, ...). Its net and gross sums are derived, see [`crate::core::purchase`].

use crate::core::money::Rebate;
use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchase database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    /// Unique identifier for the purchase
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Vendor the goods were bought from
    pub vendor_id: i64,
    /// Whether recorded prices exclude tax
    pub is_net: bool,
    /// Whether the invoice has been paid
    pub paid: bool,
    /// How it was paid (free text)
    pub payment_method: String,
    /// Person who paid the invoice
    pub payer: String,
    /// Day the purchase was ordered
    pub ordered_at: NaiveDate,
    /// Day the purchase was paid, if it was
    pub paid_at: Option<NaiveDate>,
    /// Rebate on the whole purchase, in 1/100 percent (12.5 % is stored as 1250)
    pub rebate: i64,
}

impl Model {
    /// Rebate as [`Rebate`].
    #[must_use]
    pub const fn rebate(&self) -> Rebate {
        Rebate::from_scaled(self.rebate)
    }
}

/// Defines relationships between Purchase and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each purchase is made at one vendor
    #[sea_orm(
        belongs_to = "super::vendor::Entity",
        from = "Column::VendorId",
        to = "super::vendor::Column::Id",
        on_delete = "Restrict"
    )]
    Vendor,
    /// Goods bought in this purchase
    #[sea_orm(has_many = "super::stockpile::Entity")]
    Stockpiles,
    /// Additional costs of this purchase
    #[sea_orm(has_many = "super::cost_item::Entity")]
    CostItems,
}

impl Related<super::vendor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vendor.def()
    }
}

impl Related<super::stockpile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stockpiles.def()
    }
}

impl Related<super::cost_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CostItems.def()
    }
}

impl Related<super::bank_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        super::transaction_purchase::Relation::Transaction.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::transaction_purchase::Relation::Purchase.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
