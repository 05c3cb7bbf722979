//! CLI layer - command-line interface and shared command context
//!
//! This module provides the `squirrel` command line: argument parsing with `clap`
//! and the dispatch of each subcommand to its handler.

/// Command implementations (setup, orders, stockpiles, accounts, reports)
pub mod commands;

use crate::{config::catalog::CatalogConfig, errors::Result};
use clap::{Parser, Subcommand};
use sea_orm::DatabaseConnection;
use std::path::PathBuf;

/// Shared data available to all commands.
/// This structure holds the database connection and the loaded configuration.
pub struct CliData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Catalog configuration from squirrel.toml
    pub config: CatalogConfig,
}

impl CliData {
    /// Creates a new `CliData` instance.
    #[must_use]
    pub const fn new(database: DatabaseConnection, config: CatalogConfig) -> Self {
        Self { database, config }
    }
}

/// Squirrel - procurement for teams, events and their budgets
#[derive(Debug, Parser)]
#[command(name = "squirrel")]
#[command(author, version, about = "Orders, stockpiles and purchases for events")]
pub struct Cli {
    /// Database URL; defaults to `DATABASE_URL` or a local SQLite file
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create missing tables and seed the catalog from squirrel.toml
    Init,
    /// Place and manage orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Record supply
    Stockpile {
        #[command(subcommand)]
        action: StockpileAction,
    },
    /// Import a tab-separated bank statement into an account
    ImportTransactions {
        /// Name of the account
        #[arg(short, long)]
        account: String,
        /// Statement file
        file: PathBuf,
    },
    /// Export all orders as CSV
    ExportOrders {
        /// Output file; stdout if omitted
        file: Option<PathBuf>,
    },
    /// Export an account's transactions with per-team shares as CSV
    ExportTransactions {
        /// Name of the account
        #[arg(short, long)]
        account: String,
        /// Output file; stdout if omitted
        file: Option<PathBuf>,
    },
    /// Show what every team ordered and received
    Budget,
    /// Show net and gross sum of a purchase
    PurchaseSums {
        /// Purchase id
        id: i64,
    },
}

/// Order subcommands.
#[derive(Debug, Subcommand)]
pub enum OrderAction {
    /// Place an order; unknown products are created on the fly
    Add {
        /// Ordering team
        #[arg(short, long)]
        team: String,
        /// Product name
        #[arg(short, long)]
        product: String,
        /// Quantity
        #[arg(short, long)]
        amount: i64,
        /// Event; the configured default order event if omitted
        #[arg(short, long)]
        event: Option<String>,
        /// Shop link
        #[arg(long, default_value = "")]
        url: String,
        /// Free-form requirements
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// List orders, optionally of one team
    List {
        /// Only orders of this team
        #[arg(short, long)]
        team: Option<String>,
    },
    /// Move an order to its next state
    Advance {
        /// Order id
        id: i64,
    },
}

/// Stockpile subcommands.
#[derive(Debug, Subcommand)]
pub enum StockpileAction {
    /// Record a stockpile and hand it out to waiting orders
    Add {
        /// Product name
        #[arg(short, long)]
        product: String,
        /// Quantity
        #[arg(short, long)]
        amount: i64,
        /// Price per unit (e.g. 1.50)
        #[arg(long, default_value = "0")]
        unit_price: String,
        /// Tax factor (e.g. 1.19)
        #[arg(long, default_value = "1")]
        tax: String,
        /// Purchase the goods came from
        #[arg(long)]
        purchase: Option<i64>,
    },
}

/// Runs one parsed command.
pub async fn run(command: Command, data: &CliData) -> Result<()> {
    match command {
        Command::Init => commands::general::init(data).await,
        Command::Order { action } => match action {
            OrderAction::Add {
                team,
                product,
                amount,
                event,
                url,
                comment,
            } => {
                commands::order::add(
                    data,
                    commands::order::OrderInput {
                        team,
                        product,
                        amount,
                        event,
                        url,
                        comment,
                    },
                )
                .await
            }
            OrderAction::List { team } => commands::order::list(data, team.as_deref()).await,
            OrderAction::Advance { id } => commands::order::advance(data, id).await,
        },
        Command::Stockpile { action } => match action {
            StockpileAction::Add {
                product,
                amount,
                unit_price,
                tax,
                purchase,
            } => {
                commands::stockpile::add(data, &product, amount, &unit_price, &tax, purchase)
                    .await
            }
        },
        Command::ImportTransactions { account, file } => {
            commands::account::import(data, &account, &file).await
        }
        Command::ExportOrders { file } => commands::report::export_orders(data, file).await,
        Command::ExportTransactions { account, file } => {
            commands::account::export(data, &account, file).await
        }
        Command::Budget => commands::report::budget(data).await,
        Command::PurchaseSums { id } => commands::report::purchase_sums(data, id).await,
    }
}
