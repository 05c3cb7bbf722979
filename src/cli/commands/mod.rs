//! Command implementations organized by category.

/// Account import and export
pub mod account;

/// Setup commands
pub mod general;

/// Order commands
pub mod order;

/// Reports
pub mod report;

/// Stockpile commands
pub mod stockpile;

use crate::errors::Result;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

/// Opens `path` for writing, or stdout if there is none.
pub(crate) fn output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    })
}
