//! Unified error type for Squirrel.
//!
//! Validation errors carry the exact quantities involved so callers can render them
//! back to the user verbatim. Everything coming out of the database is wrapped in
//! [`Error::Database`].

use crate::entities::OrderState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("{field} cannot be empty")]
    MissingField { field: &'static str },

    #[error("A {entity} named '{name}' already exists")]
    DuplicateName { entity: &'static str, name: String },

    #[error("Invalid amount {amount}: must be at least 1")]
    InvalidAmount { amount: i64 },

    #[error("Invalid money value '{input}'")]
    InvalidMoney { input: String },

    #[error("Invalid tax factor {tax}: must be greater than zero")]
    InvalidTax { tax: String },

    #[error("Invalid rebate {rebate}%: must be between 0 and 100")]
    InvalidRebate { rebate: String },

    #[error("The product of the order and the stockpile it is taken from have to match!")]
    ProductMismatch {
        order_product: i64,
        stockpile_product: i64,
    },

    #[error(
        "The order only is for {order_amount}. With this pillage of {amount}, it would go to {total}."
    )]
    OrderOverAllocated {
        order_amount: i64,
        amount: i64,
        total: i64,
    },

    #[error("The stockpile has {available} available, you requested {amount}.")]
    StockpileExhausted { available: i64, amount: i64 },

    #[error("You can't change the product of a Stockpile!")]
    StockpileProductChanged { from: i64, to: i64 },

    #[error("You can't change the product of an order that already took {allocated} units from stock")]
    OrderProductLocked { allocated: i64 },

    #[error("Amount {amount} is below the {allocated} units already allocated")]
    AmountBelowAllocated { amount: i64, allocated: i64 },

    #[error("An order can't go from {from} to {to}")]
    InvalidStateTransition { from: OrderState, to: OrderState },

    #[error("Completed orders can't be deleted.")]
    OrderCompleted { order_id: i64 },

    #[error("{entity} {id} is still referenced by {referenced_by} and can't be deleted")]
    Protected {
        entity: &'static str,
        id: i64,
        referenced_by: &'static str,
    },

    #[error("Import failed on line {line}: {message}")]
    Import { line: u64, message: String },

    #[error("Allocation produced an invalid pillage: {source}")]
    AllocationInvariant {
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Builds a [`Error::NotFound`] for an id lookup.
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound {
            entity,
            key: id.to_string(),
        }
    }

    /// Whether the error is something the user can correct (as opposed to an
    /// infrastructure failure or a bug).
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::MissingField { .. }
                | Self::DuplicateName { .. }
                | Self::InvalidAmount { .. }
                | Self::InvalidMoney { .. }
                | Self::InvalidTax { .. }
                | Self::InvalidRebate { .. }
                | Self::ProductMismatch { .. }
                | Self::OrderOverAllocated { .. }
                | Self::StockpileExhausted { .. }
                | Self::StockpileProductChanged { .. }
                | Self::OrderProductLocked { .. }
                | Self::AmountBelowAllocated { .. }
                | Self::InvalidStateTransition { .. }
                | Self::OrderCompleted { .. }
                | Self::Protected { .. }
                | Self::Import { .. }
        )
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
