//! Catalog configuration loading from squirrel.toml
//!
//! This module provides functionality to load the initial catalog (teams, events,
//! vendors, accounts and products) from a TOML configuration file. The entries are
//! used to seed the database by `squirrel init`; entries that already exist are left
//! untouched. The file also names the event new orders are filed under.

use crate::core::money::Money;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "squirrel.toml";

/// Configuration structure representing the entire squirrel.toml file
#[derive(Debug, Default, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Event that new orders are filed under; the latest event if unset
    pub default_order_event: Option<String>,
    /// Team names to seed
    pub teams: Vec<String>,
    /// Event names to seed
    pub events: Vec<String>,
    /// Vendor names to seed
    pub vendors: Vec<String>,
    /// Bank account names to seed
    pub accounts: Vec<String>,
    /// Products to seed
    pub products: Vec<ProductSeed>,
}

/// Configuration for a single product
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ProductSeed {
    /// Name of the product
    pub name: String,
    /// Unit label (e.g., "crates")
    #[serde(default)]
    pub unit: Option<String>,
    /// Default price per unit as a decimal string (e.g., "1.50")
    #[serde(default)]
    pub default_price: Option<Money>,
}

/// Loads catalog configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A price is not a decimal number
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    let path = path.as_ref();
    debug!(?path, "Loading catalog configuration");
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path.display()),
    })
}

/// Path of the configuration file: `SQUIRREL_CONFIG` if set, else `./squirrel.toml`.
#[must_use]
pub fn config_path() -> PathBuf {
    std::env::var_os("SQUIRREL_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Loads the catalog configuration from [`config_path`].
///
/// A missing `./squirrel.toml` yields an empty configuration; a missing file named
/// explicitly through `SQUIRREL_CONFIG` is an error.
pub fn load_default_config() -> Result<CatalogConfig> {
    let path = config_path();
    if std::env::var_os("SQUIRREL_CONFIG").is_none() && !path.exists() {
        debug!("No squirrel.toml found, starting with an empty catalog");
        return Ok(CatalogConfig::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_catalog_config() {
        let toml_str = r#"
            default_order_event = "Camp 2024"
            teams = ["Kitchen", "Bar"]
            events = ["Camp 2024"]
            vendors = ["Beverage Wholesale"]
            accounts = ["Main"]

            [[products]]
            name = "Club Mate"
            unit = "crates"
            default_price = "15.60"

            [[products]]
            name = "Cable tie"
        "#;

        let config: CatalogConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_order_event.as_deref(), Some("Camp 2024"));
        assert_eq!(config.teams, ["Kitchen", "Bar"]);
        assert_eq!(config.products.len(), 2);
        assert_eq!(
            config.products[0].default_price,
            Some(Money::from_minor(156_000))
        );
        assert_eq!(config.products[1].unit, None);
        assert_eq!(config.products[1].default_price, None);
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config: CatalogConfig = toml::from_str("").unwrap();
        assert_eq!(config, CatalogConfig::default());
    }

    #[test]
    fn test_bad_price_is_rejected() {
        let result = toml::from_str::<CatalogConfig>(
            r#"
            [[products]]
            name = "Club Mate"
            default_price = "cheap"
        "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_reports_missing_file() {
        let result = load_config("does/not/exist.toml");
        assert!(matches!(result.unwrap_err(), Error::Config { .. }));
    }
}
