//! Order entity - Demand for a quantity of one product, placed by a team.
//!
//! Orders move through a linear workflow (`REQ` → `APP` → `REA` → `COM`). How much of
//! an order is already covered is never stored on the row itself; it is derived from
//! the pillages pointing at it (see [`crate::core::allocation`]).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow state of an order.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(3))")]
pub enum OrderState {
    /// A team member has requested the order
    #[default]
    #[sea_orm(string_value = "REQ")]
    Requested,
    /// Approved by the purchase department and will be bought
    #[sea_orm(string_value = "APP")]
    Approved,
    /// Delivered (and commissioned if necessary), waiting for the team
    #[sea_orm(string_value = "REA")]
    ReadyForPickup,
    /// Picked up by the team
    #[sea_orm(string_value = "COM")]
    Completed,
}

impl OrderState {
    /// The state that follows this one, `None` for [`OrderState::Completed`].
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Requested => Some(Self::Approved),
            Self::Approved => Some(Self::ReadyForPickup),
            Self::ReadyForPickup => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Staying put or moving exactly one step forward is allowed, nothing else.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self == target || self.next() == Some(target)
    }

    /// Human-readable label used in exports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Requested => "Requested",
            Self::Approved => "Approved",
            Self::ReadyForPickup => "Ready for pick-up",
            Self::Completed => "Completed",
        }
    }

    /// Three-letter code as stored in the database.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Requested => "REQ",
            Self::Approved => "APP",
            Self::ReadyForPickup => "REA",
            Self::Completed => "COM",
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Order database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier; also defines allocation order (lowest id is served first)
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Demanded quantity, always positive
    pub amount: i64,
    /// Product being ordered
    pub product_id: i64,
    /// Event the order is for, if any
    pub event_id: Option<i64>,
    /// Team that placed the order
    pub team_id: i64,
    /// Current workflow state
    pub state: OrderState,
    /// Optional link to a shop page for the item
    pub url: String,
    /// Free-form requirements
    pub comment: String,
    /// When the order was created
    pub created_at: DateTimeUtc,
    /// When the order was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order is for one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Restrict"
    )]
    Product,
    /// Each order may belong to one event
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id",
        on_delete = "Restrict"
    )]
    Event,
    /// Each order belongs to one team
    #[sea_orm(
        belongs_to = "super::team::Entity",
        from = "Column::TeamId",
        to = "super::team::Column::Id",
        on_delete = "Restrict"
    )]
    Team,
    /// Pillages fulfilling this order
    #[sea_orm(has_many = "super::pillage::Entity")]
    Pillages,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl Related<super::team::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Team.def()
    }
}

impl Related<super::pillage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pillages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
