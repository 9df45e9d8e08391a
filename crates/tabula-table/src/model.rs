//! The table aggregate: columns, the loaded page, request and selection state

use crate::merge::Tree;
use crate::selection::SelectionSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tabula_core::{ColumnDescriptor, FetchFailure, ROW_IDX, Row, Value};

/// Query, paging, sort and filter parameters that produced a table page
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableRequest {
    pub tbl_id: String,
    /// Filter text, `col op operand[; ...]`
    pub filters: String,
    /// Sort text, `DIRECTION,col1,...`
    pub sort_info: String,
    /// Comma separated columns to keep; all columns when `None`
    pub incl_cols: Option<String>,
    pub start_idx: i64,
    /// Rows per page; zero or negative means "all"
    pub page_size: i64,
    /// Logical row to highlight once the page is produced
    pub highlighted_row: Option<i64>,
    /// `ROW_IDX` of a previously highlighted row to keep highlighted
    pub highlighted_row_by_row_idx: Option<i64>,
    /// Collaborator-specific parameters passed through untouched
    pub params: IndexMap<String, String>,
}

impl TableRequest {
    pub fn new(tbl_id: impl Into<String>) -> Self {
        Self {
            tbl_id: tbl_id.into(),
            ..Default::default()
        }
    }

    pub fn with_filters(mut self, filters: impl Into<String>) -> Self {
        self.filters = filters.into();
        self
    }

    pub fn with_sort(mut self, sort_info: impl Into<String>) -> Self {
        self.sort_info = sort_info.into();
        self
    }

    pub fn with_page(mut self, start_idx: i64, page_size: i64) -> Self {
        self.start_idx = start_idx;
        self.page_size = page_size;
        self
    }

    pub fn with_incl_cols(mut self, incl_cols: impl Into<String>) -> Self {
        self.incl_cols = Some(incl_cols.into());
        self
    }

    pub fn with_highlighted_row(mut self, row: i64) -> Self {
        self.highlighted_row = Some(row);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Whether this request asks for a filtered or sorted view
    pub fn derives_view(&self) -> bool {
        !self.filters.trim().is_empty() || !self.sort_info.trim().is_empty()
    }
}

/// Lifecycle state of a table, derived from its fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TableStatus {
    Loading,
    Complete,
    Empty,
    NoMatch,
    Error,
}

impl TableStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Complete => "complete",
            Self::Empty => "empty",
            Self::NoMatch => "no-match",
            Self::Error => "error",
        }
    }
}

/// A table as the client sees it.
///
/// `rows` holds only the loaded window, which starts at logical row
/// `request.start_idx`. `highlighted_row` is always a logical index.
/// When `original` is set this table is a client-side view that can be
/// rebuilt by re-applying `request` to the original's rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableModel {
    pub tbl_id: String,
    pub title: Option<String>,
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Row>,
    pub total_rows: u64,
    pub highlighted_row: i64,
    pub request: TableRequest,
    pub selection: SelectionSet,
    pub is_fetching: bool,
    pub error: Option<FetchFailure>,
    pub meta: Arc<Tree>,
    pub original: Option<Box<TableModel>>,
}

impl TableModel {
    /// A fully loaded table
    pub fn new(tbl_id: impl Into<String>, columns: Vec<ColumnDescriptor>, rows: Vec<Row>) -> Self {
        let tbl_id = tbl_id.into();
        let total_rows = rows.len() as u64;
        Self {
            request: TableRequest::new(tbl_id.clone()),
            tbl_id,
            columns,
            rows,
            total_rows,
            selection: SelectionSet::new(total_rows),
            ..Default::default()
        }
    }

    /// Placeholder for a table whose first page is being fetched
    pub fn loading(request: TableRequest) -> Self {
        Self {
            tbl_id: request.tbl_id.clone(),
            request,
            is_fetching: true,
            ..Default::default()
        }
    }

    /// Placeholder for a table whose fetch failed
    pub fn failed(request: TableRequest, error: FetchFailure) -> Self {
        Self {
            tbl_id: request.tbl_id.clone(),
            request,
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_meta(mut self, meta: Arc<Tree>) -> Self {
        self.meta = meta;
        self
    }

    pub fn status(&self) -> TableStatus {
        derive_status(self)
    }

    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or("untitled")
    }

    /// Whether this table is a client-side view over a cached original
    pub fn is_client_table(&self) -> bool {
        self.original.is_some()
    }

    /// Logical index of the first loaded row
    pub fn page_start(&self) -> u64 {
        self.request.start_idx.max(0) as u64
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// All rows are loaded and nothing is in flight
    pub fn is_fully_loaded(&self) -> bool {
        !self.is_fetching
            && self.error.is_none()
            && self.page_start() == 0
            && self.rows.len() as u64 == self.total_rows
    }

    /// Whether the logical range `[start, end)` is covered by the loaded rows
    pub fn is_data_available(&self, start: u64, end: u64) -> bool {
        let end = end.min(self.total_rows);
        let loaded_end = self.page_start() + self.rows.len() as u64;
        start >= self.page_start() && end <= loaded_end
    }

    /// Loaded row at a logical index
    pub fn loaded_row(&self, logical: u64) -> Option<&Row> {
        let offset = logical.checked_sub(self.page_start())?;
        self.rows.get(offset as usize)
    }

    pub fn cell_value(&self, logical: u64, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.loaded_row(logical)?.get(idx)
    }

    /// Values of one column across the loaded rows
    pub fn column_values(&self, column: &str) -> Vec<&Value> {
        match self.column_index(column) {
            Some(idx) => self
                .rows
                .iter()
                .map(|r| r.get(idx).unwrap_or(&Value::Missing))
                .collect(),
            None => Vec::new(),
        }
    }

    /// A loaded row keyed by column name
    pub fn row_as_map(&self, logical: u64) -> Option<IndexMap<String, Value>> {
        let row = self.loaded_row(logical)?;
        Some(
            self.columns
                .iter()
                .zip(row.iter())
                .map(|(c, v)| (c.name.clone(), v.clone()))
                .collect(),
        )
    }

    /// `ROW_IDX` of a loaded row, if the table carries that column
    pub fn row_idx_of(&self, logical: u64) -> Option<i64> {
        self.cell_value(logical, ROW_IDX)?.as_i64()
    }

    /// Highlight a logical row, clamped into the table
    pub fn set_highlighted_row(&mut self, row: i64) {
        let last = self.total_rows as i64 - 1;
        self.highlighted_row = row.clamp(0, last.max(0));
    }
}

/// Status in priority order: error, loading, empty, no-match, complete
pub fn derive_status(model: &TableModel) -> TableStatus {
    if model.error.is_some() {
        TableStatus::Error
    } else if model.is_fetching {
        TableStatus::Loading
    } else if model.total_rows == 0 {
        if model.request.filters.trim().is_empty() {
            TableStatus::Empty
        } else {
            TableStatus::NoMatch
        }
    } else {
        TableStatus::Complete
    }
}
