//! Pillage entity - "This order took `amount` units from this stockpile."
//!
//! Pillages are the only place allocation state lives. They are removed together
//! with either side of the link.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pillage database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pillages")]
pub struct Model {
    /// Unique identifier for the pillage
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Units taken, at least 1
    pub amount: i64,
    /// Stockpile the units are taken from
    pub stockpile_id: i64,
    /// Order the units go to
    pub order_id: i64,
}

/// Defines relationships between Pillage and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Supply side of the link
    #[sea_orm(
        belongs_to = "super::stockpile::Entity",
        from = "Column::StockpileId",
        to = "super::stockpile::Column::Id",
        on_delete = "Cascade"
    )]
    Stockpile,
    /// Demand side of the link
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
}

impl Related<super::stockpile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stockpile.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
