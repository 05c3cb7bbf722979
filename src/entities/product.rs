//! Product entity - A purchasable item type.
//!
//! Orders and stockpiles reference products by `id`, never by `name`, so products
//! can be renamed freely without breaking any allocation.

use crate::core::money::Money;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique name of the product (e.g., "Club Mate", "Cable tie")
    #[sea_orm(unique)]
    pub name: String,
    /// Optional unit label (e.g., "crates", "pieces")
    pub unit: Option<String>,
    /// Optional default price per unit, in 1/100 cent
    pub default_price: Option<i64>,
}

impl Model {
    /// Default price as [`Money`], if one is set.
    #[must_use]
    pub const fn default_price(&self) -> Option<Money> {
        match self.default_price {
            Some(units) => Some(Money::from_minor(units)),
            None => None,
        }
    }
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Demand for this product
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
    /// Supply of this product
    #[sea_orm(has_many = "super::stockpile::Entity")]
    Stockpiles,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::stockpile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stockpiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
