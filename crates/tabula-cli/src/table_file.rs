//! JSON table files
//!
//! ```json
//! {
//!   "title": "stars",
//!   "columns": [{"name": "ra", "type": "double", "units": "deg"}],
//!   "rows": [[10.5], [11.2]],
//!   "meta": {"source": "gaia"}
//! }
//! ```

use anyhow::{Context, bail};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tabula_core::{ColumnDescriptor, Value};
use tabula_table::{TableModel, Tree};

#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default)]
    tbl_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    columns: Vec<ColumnDescriptor>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    meta: serde_json::Value,
}

/// Read a table file; the id defaults to the file stem
pub fn load_table(path: &Path) -> anyhow::Result<TableModel> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read table file {}", path.display()))?;
    let default_id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table");
    parse_table(&text, default_id).with_context(|| format!("Invalid table file {}", path.display()))
}

pub fn parse_table(text: &str, default_id: &str) -> anyhow::Result<TableModel> {
    let file: TableFile = serde_json::from_str(text)?;

    let width = file.columns.len();
    let mut rows = Vec::with_capacity(file.rows.len());
    for (idx, row) in file.rows.into_iter().enumerate() {
        if row.len() != width {
            bail!("row {} has {} cells, expected {}", idx, row.len(), width);
        }
        rows.push(row.into_iter().map(Value::from).collect());
    }

    let meta = match file.meta {
        serde_json::Value::Null => Arc::new(Tree::default()),
        meta @ serde_json::Value::Object(_) => Arc::new(Tree::from(meta)),
        _ => bail!("meta must be an object"),
    };

    let tbl_id = file.tbl_id.unwrap_or_else(|| default_id.to_string());
    let mut table = TableModel::new(tbl_id, file.columns, rows).with_meta(meta);
    table.title = file.title;
    tracing::debug!(tbl_id = %table.tbl_id, total_rows = table.total_rows, "loaded table file");
    Ok(table)
}
