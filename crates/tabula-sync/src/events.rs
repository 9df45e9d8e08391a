//! The closed set of intents a table store reacts to

use crate::staleness::FetchTicket;
use std::sync::Arc;
use tabula_chart::XyPlotParams;
use tabula_core::FetchFailure;
use tabula_table::{SelectionSet, TableModel, TableRequest, Tree};

/// A change to a table's selection
#[derive(Debug, Clone, PartialEq)]
pub enum SelectChange {
    All(bool),
    Row { index: i64, selected: bool },
    Replace(SelectionSet),
}

#[derive(Debug, Clone)]
pub enum TableEvent {
    /// Load or re-request a table; client-side views are recomputed locally
    Load(TableRequest),
    /// Register a table whose rows are all present
    Insert(TableModel),
    Highlight { tbl_id: String, row: i64 },
    Select { tbl_id: String, change: SelectChange },
    Filter { tbl_id: String, filters: String },
    Sort { tbl_id: String, sort_info: String },
    /// Merge metadata into a table
    Update { tbl_id: String, meta: Arc<Tree> },
    FetchComplete { ticket: FetchTicket, table: TableModel },
    FetchError { ticket: FetchTicket, error: FetchFailure },
    Remove { tbl_id: String },
    /// Set or clear (`None`) the scatter plot `chart_id` drawn from `tbl_id`
    PlotParams {
        chart_id: String,
        tbl_id: String,
        params: Option<XyPlotParams>,
    },
}

impl TableEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TableEvent::Load(_) => "load",
            TableEvent::Insert(_) => "insert",
            TableEvent::Highlight { .. } => "highlight",
            TableEvent::Select { .. } => "select",
            TableEvent::Filter { .. } => "filter",
            TableEvent::Sort { .. } => "sort",
            TableEvent::Update { .. } => "update",
            TableEvent::FetchComplete { .. } => "fetch-complete",
            TableEvent::FetchError { .. } => "fetch-error",
            TableEvent::Remove { .. } => "remove",
            TableEvent::PlotParams { .. } => "plot-params",
        }
    }

    pub fn tbl_id(&self) -> &str {
        match self {
            TableEvent::Load(request) => &request.tbl_id,
            TableEvent::Insert(table) => &table.tbl_id,
            TableEvent::FetchComplete { ticket, .. } | TableEvent::FetchError { ticket, .. } => {
                &ticket.request.tbl_id
            }
            TableEvent::Highlight { tbl_id, .. }
            | TableEvent::Select { tbl_id, .. }
            | TableEvent::Filter { tbl_id, .. }
            | TableEvent::Sort { tbl_id, .. }
            | TableEvent::Update { tbl_id, .. }
            | TableEvent::PlotParams { tbl_id, .. }
            | TableEvent::Remove { tbl_id } => tbl_id,
        }
    }
}

/// Work the store asks its driver to carry out
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Fetch a page; answer with `FetchComplete` or `FetchError` carrying
    /// the same ticket
    Fetch(FetchTicket),
    /// Find the first row of a partially loaded table matching `filter` and
    /// answer with `Highlight`
    FindIndex { tbl_id: String, filter: String },
}
