//! Core business logic - framework-agnostic procurement operations.
//!
//! Every write that changes supply or demand runs the allocation engine in the
//! same database transaction.

pub mod account;
pub mod allocation;
pub mod catalog;
pub mod money;
pub mod order;
pub mod pillage;
pub mod product;
pub mod purchase;
pub mod report;
pub mod stockpile;
