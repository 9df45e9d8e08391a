//! Engine configuration
//!
//! Tunables are read from a TOML file; every key is optional and falls back
//! to the defaults below.

use crate::{Result, TabulaError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of rows per page
pub const DEFAULT_PAGE_SIZE: i64 = 100;
/// Page size used when a request carries none
pub const MAX_ROW: i64 = i32::MAX as i64;
/// Default bin count for decimated chart requests
pub const DEFAULT_MAX_BINS: u32 = 10_000;
/// Default divisor used when padding chart boundaries
pub const DEFAULT_PAD_FACTOR: f64 = 100.0;
/// Token that matches null cells inside an `in` list
pub const NULL_TOKEN: &str = "%NULL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub page_size: i64,
    pub max_row: i64,
    /// Row count at or above which chart requests are decimated server-side
    pub large_table_threshold: u64,
    pub max_bins: u32,
    pub pad_factor: f64,
    pub null_token: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_row: MAX_ROW,
            large_table_threshold: 5000,
            max_bins: DEFAULT_MAX_BINS,
            pad_factor: DEFAULT_PAD_FACTOR,
            null_token: NULL_TOKEN.to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(text).map_err(|e| TabulaError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded engine configuration");
        Ok(config)
    }

    /// Serialize to TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TabulaError::Configuration(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.page_size <= 0 {
            return Err(TabulaError::Configuration(format!(
                "page_size must be positive, got {}",
                self.page_size
            )));
        }
        if self.max_bins == 0 {
            return Err(TabulaError::Configuration("max_bins must be positive".into()));
        }
        if self.pad_factor <= 0.0 {
            return Err(TabulaError::Configuration(format!(
                "pad_factor must be positive, got {}",
                self.pad_factor
            )));
        }
        Ok(())
    }

    /// Page size to use for a request, replacing non-positive sizes with `max_row`
    pub fn fix_page_size(&self, page_size: Option<i64>) -> i64 {
        match page_size {
            Some(ps) if ps > 0 => ps,
            _ => self.max_row,
        }
    }
}
