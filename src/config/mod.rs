/// Database configuration and connection management
pub mod database;

/// Catalog seed data and order defaults from squirrel.toml
pub mod catalog;
