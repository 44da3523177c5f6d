//! # dte-cli — Command-Line Interface for the DTE Stack
//!
//! Provides the `dte` binary.
//!
//! ## Subcommands
//!
//! - `dte validate`: schema and business-rule validation of a document file.
//! - `dte process`: full emission or reception run against the HTTP
//!   collaborators configured in the environment.
//! - `dte explain`: look up an authority or internal error code.
//! - `dte f14`: F14 advance payment for a period's VAT.
//! - `dte summary`: accumulated totals for a business and year.
//!
//! ```bash
//! dte validate factura.json
//! DTE_MH_TOKEN=... DTE_NIT=06140101901013 DTE_CERT_PASSWORD=... dte process factura.json
//! dte explain 004
//! dte f14 --iva 1250.00 --period 2024-01
//! ```
//!
//! Every handler returns the process exit code: `0` on success, `1` when
//! the input was rejected.

pub mod explain;
pub mod f14;
pub mod process;
pub mod summary;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

/// Read and parse a JSON file.
pub fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Pretty-print a value to stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Single-threaded runtime for the async handlers.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
