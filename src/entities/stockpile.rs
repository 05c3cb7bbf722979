//! Stockpile entity - Supply of one product bought at a certain price.
//!
//! A stockpile may belong to a purchase, but does not have to: surprisingly often,
//! things are simply found in storage. Orders take from stockpiles via pillages.

use crate::core::money::{Money, TaxRate};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stockpile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stockpiles")]
pub struct Model {
    /// Unique identifier; also defines allocation order (lowest id is consumed first)
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product held in this stockpile. Fixed once the stockpile exists.
    pub product_id: i64,
    /// Quantity acquired, always positive
    pub amount: i64,
    /// Price per unit, in 1/100 cent
    pub unit_price: i64,
    /// Tax rate as a factor of the net price, in 1/10000 (1.19 is stored as 11900)
    pub tax: i64,
    /// Purchase this stockpile came from, if any
    pub purchase_id: Option<i64>,
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

/// Defines relationships between Stockpile and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each stockpile holds one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Restrict"
    )]
    Product,
    /// Each stockpile may come from one purchase
    #[sea_orm(
        belongs_to = "super::purchase::Entity",
        from = "Column::PurchaseId",
        to = "super::purchase::Column::Id",
        on_delete = "Cascade"
    )]
    Purchase,
    /// Pillages taken from this stockpile
    #[sea_orm(has_many = "super::pillage::Entity")]
    Pillages,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl Related<super::pillage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pillages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
