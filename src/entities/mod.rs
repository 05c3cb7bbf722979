//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod account;
pub mod bank_transaction;
pub mod cost_item;
pub mod event;
pub mod order;
pub mod pillage;
pub mod product;
pub mod purchase;
pub mod stockpile;
pub mod team;
pub mod transaction_purchase;
pub mod vendor;

// Re-export specific types to avoid conflicts
pub use account::{Column as AccountColumn, Entity as Account, Model as AccountModel};
pub use bank_transaction::{
    Column as BankTransactionColumn, Entity as BankTransaction, Model as BankTransactionModel,
};
pub use cost_item::{Column as CostItemColumn, Entity as CostItem, Model as CostItemModel};
pub use event::{Column as EventColumn, Entity as Event, Model as EventModel};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel, OrderState};
pub use pillage::{Column as PillageColumn, Entity as Pillage, Model as PillageModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use purchase::{Column as PurchaseColumn, Entity as Purchase, Model as PurchaseModel};
pub use stockpile::{Column as StockpileColumn, Entity as Stockpile, Model as StockpileModel};
pub use team::{Column as TeamColumn, Entity as Team, Model as TeamModel};
pub use transaction_purchase::{
    Column as TransactionPurchaseColumn, Entity as TransactionPurchase,
    Model as TransactionPurchaseModel,
};
pub use vendor::{Column as VendorColumn, Entity as Vendor, Model as VendorModel};
