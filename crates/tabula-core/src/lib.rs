//! Tabula Core - shared types for the client-side table engine
//!
//! This crate provides the types that every other Tabula crate depends on:
//!
//! - `Value` - a single table cell (distinguishes missing from null)
//! - `ColumnDescriptor` - column name, type, visibility, units and formatting hints
//! - `TabulaError` - the common error type and `Result` alias
//! - `EngineConfig` - tunables loaded from TOML (page size, decimation thresholds)

mod config;
mod error;
mod types;

pub use config::*;
pub use error::*;
pub use types::*;

/// Name of the synthetic column that records a row's position in its source table.
pub const ROW_IDX: &str = "ROW_IDX";
