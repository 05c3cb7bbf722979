//! Cost item entity - Something that costs money on a purchase but yields no goods.
//!
//! Shipping, packaging, deposits and the like.

use crate::core::money::{Money, TaxRate};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cost item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cost_items")]
pub struct Model {
    /// Unique identifier for the cost item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// What the money was spent on
    pub description: String,
    /// Quantity
    pub amount: i64,
    /// Price per unit, in 1/100 cent
    pub unit_price: i64,
    /// Tax rate as a factor, in 1/10000
    pub tax: i64,
    /// Purchase this cost belongs to
    pub purchase_id: i64,
}

impl Model {
    /// Unit price as [`Money`].
    #[must_use]
    pub const fn unit_price(&self) -> Money {
        Money::from_minor(self.unit_price)
    }

    /// Tax factor as [`TaxRate`].
    #[must_use]
    pub const fn tax(&self) -> TaxRate {
        TaxRate::from_scaled(self.tax)
    }
}

/// Defines relationships between CostItem and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each cost item belongs to one purchase
    #[sea_orm(
        belongs_to = "super::purchase::Entity",
        from = "Column::PurchaseId",
        to = "super::purchase::Column::Id",
        on_delete = "Cascade"
    )]
    Purchase,
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
