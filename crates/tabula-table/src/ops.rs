//! Operations over in-memory tables: filter/sort/page and page arithmetic

use crate::filter::FilterExpression;
use crate::model::{TableModel, TableRequest};
use crate::sort::{RowSorter, SortSpec};
use crate::text::{split_cols, strip_column_quotes};
use serde::{Deserialize, Serialize};
use tabula_core::{
    ColumnDescriptor, ColumnType, EngineConfig, FetchFailure, ROW_IDX, Result, Row, TabulaError,
    Value,
};

#[cfg(test)]
mod tests;

/// Pagination arithmetic for a table at its current highlight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Highlighted logical row after clamping
    pub highlighted_row: i64,
    /// 1-based page containing the highlight
    pub current_page: i64,
    /// Highlight relative to the page start
    pub hl_row_idx: i64,
    pub start_idx: i64,
    pub end_idx: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total_rows: u64,
}

/// Page arithmetic for `model`, using `page_size` instead of the request's when positive
pub fn compute_page_info(
    model: &TableModel,
    page_size: Option<i64>,
    config: &EngineConfig,
) -> PageInfo {
    let page_size = match page_size {
        Some(ps) if ps > 0 => ps,
        _ => config.fix_page_size(Some(model.request.page_size)),
    };
    let total = model.total_rows as i64;
    let highlighted_row = model.highlighted_row.clamp(0, (total - 1).max(0));
    let current_page = highlighted_row / page_size + 1;
    let start_idx = (current_page - 1) * page_size;
    PageInfo {
        highlighted_row,
        current_page,
        hl_row_idx: highlighted_row % page_size,
        start_idx,
        end_idx: (start_idx + page_size).min(total),
        page_size,
        total_pages: (total + page_size - 1) / page_size,
        total_rows: model.total_rows,
    }
}

/// Produce one page of a filtered, sorted, projected view of a fully loaded table.
///
/// The rows come from `source.original` when `source` is itself a view, so
/// repeated calls never stack views. Filtering or sorting adds a hidden
/// `ROW_IDX` column holding each row's index in the original. A filter or
/// sort that cannot be applied yields a table in the error state rather than
/// an `Err`.
#[tracing::instrument(skip(source, config), fields(tbl_id = %source.tbl_id))]
pub fn apply_filter_sort_page(
    source: &TableModel,
    request: &TableRequest,
    config: &EngineConfig,
) -> Result<TableModel> {
    let origin = source.original.as_deref().unwrap_or(source);
    if !origin.is_fully_loaded() {
        return Err(TabulaError::Other(format!(
            "table '{}' is not fully loaded ({} of {} rows)",
            origin.tbl_id,
            origin.rows.len(),
            origin.total_rows
        )));
    }

    let (columns, rows) = numbered_rows(origin, request);
    match derive_rows(rows, &columns, request, config) {
        Ok(filtered) => Ok(build_page(source, origin, request, columns, filtered, config)),
        Err(e) => {
            tracing::debug!(error = %e, "client-side filter/sort failed");
            let mut failed = TableModel::failed(
                TableRequest {
                    tbl_id: source.tbl_id.clone(),
                    ..request.clone()
                },
                FetchFailure::from(&e),
            );
            failed.title = source.title.clone();
            failed.columns = columns;
            failed.meta = origin.meta.clone();
            failed.original = Some(Box::new(origin.clone()));
            Ok(failed)
        }
    }
}

/// Index in the original of every row a client-side view covers, in view order.
///
/// Unlike the view itself this is not limited to the loaded page.
pub fn view_row_positions(view: &TableModel, config: &EngineConfig) -> Result<Vec<u64>> {
    let origin = view.original.as_deref().unwrap_or(view);
    let (columns, rows) = numbered_rows(origin, &view.request);
    let filtered = derive_rows(rows, &columns, &view.request, config)?;
    Ok(filtered.into_iter().map(|(pos, _)| pos).collect())
}

/// Rows of `origin` tagged with their position, plus `ROW_IDX` when `request` derives a view
fn numbered_rows(
    origin: &TableModel,
    request: &TableRequest,
) -> (Vec<ColumnDescriptor>, Vec<(u64, Row)>) {
    let mut columns = origin.columns.clone();
    let mut rows: Vec<(u64, Row)> = origin
        .rows
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, r)| (i as u64, r))
        .collect();

    if request.derives_view() && origin.column_index(ROW_IDX).is_none() {
        columns.push(ColumnDescriptor::new(ROW_IDX, ColumnType::Int).hidden());
        for (pos, row) in rows.iter_mut() {
            row.push(Value::Int(*pos as i64));
        }
    }
    (columns, rows)
}

fn derive_rows(
    rows: Vec<(u64, Row)>,
    columns: &[ColumnDescriptor],
    request: &TableRequest,
    config: &EngineConfig,
) -> Result<Vec<(u64, Row)>> {
    let filter = FilterExpression::parse(&request.filters).compile(columns, &config.null_token)?;
    let mut filtered: Vec<(u64, Row)> = if filter.is_empty() {
        rows
    } else {
        rows.into_iter()
            .filter(|(pos, row)| filter.matches(row, *pos as usize))
            .collect()
    };

    let sorter = RowSorter::new(&SortSpec::parse(&request.sort_info), columns)?;
    filtered.sort_by(|(_, a), (_, b)| sorter.compare_rows(a, b));
    Ok(filtered)
}

fn build_page(
    source: &TableModel,
    origin: &TableModel,
    request: &TableRequest,
    columns: Vec<ColumnDescriptor>,
    filtered: Vec<(u64, Row)>,
    config: &EngineConfig,
) -> TableModel {
    let total = filtered.len() as i64;
    let page_size = if request.page_size > 0 {
        request.page_size
    } else if total > 0 {
        total
    } else {
        config.max_row
    };

    let row_idx_col = columns.iter().position(|c| c.name == ROW_IDX);
    let (highlighted_row, start_idx) = if let Some(hl) = request.highlighted_row {
        let hl = hl.clamp(0, (total - 1).max(0));
        (hl, hl / page_size * page_size)
    } else if let Some(prev) = request.highlighted_row_by_row_idx {
        let rel = row_idx_col
            .and_then(|idx| {
                filtered
                    .iter()
                    .position(|(_, r)| r.get(idx).and_then(Value::as_i64) == Some(prev))
            })
            .unwrap_or(0) as i64;
        (rel, rel / page_size * page_size)
    } else if request.start_idx < total {
        let start = request.start_idx.max(0);
        (start, start)
    } else {
        // past the end: land on the last page
        let hl = (total - 1).max(0);
        (hl, hl / page_size * page_size)
    };

    let selection = origin
        .selection
        .remapped(filtered.iter().map(|(pos, _)| *pos), filtered.len() as u64);

    let (columns, keep) = project_columns(columns, request.incl_cols.as_deref());
    let rows: Vec<Row> = filtered
        .into_iter()
        .skip(start_idx as usize)
        .take(page_size as usize)
        .map(|(_, row)| match &keep {
            Some(keep) => keep.iter().map(|&i| row[i].clone()).collect(),
            None => row,
        })
        .collect();

    tracing::debug!(total, start_idx, page_rows = rows.len(), "derived client-side page");

    TableModel {
        tbl_id: source.tbl_id.clone(),
        title: source.title.clone().or_else(|| origin.title.clone()),
        columns,
        rows,
        total_rows: total as u64,
        highlighted_row,
        request: TableRequest {
            tbl_id: source.tbl_id.clone(),
            start_idx,
            ..request.clone()
        },
        selection,
        is_fetching: false,
        error: None,
        meta: origin.meta.clone(),
        original: Some(Box::new(origin.clone())),
    }
}

/// Keep the listed columns (plus `ROW_IDX`) in table order.
/// Returns the kept descriptors and their source indices.
fn project_columns(
    columns: Vec<ColumnDescriptor>,
    incl_cols: Option<&str>,
) -> (Vec<ColumnDescriptor>, Option<Vec<usize>>) {
    let Some(incl) = incl_cols.filter(|s| !s.trim().is_empty()) else {
        return (columns, None);
    };
    let wanted: Vec<String> = split_cols(incl).iter().map(|c| strip_column_quotes(c)).collect();
    let keep: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.name == ROW_IDX || wanted.contains(&c.name))
        .map(|(i, _)| i)
        .collect();
    let projected = keep.iter().map(|&i| columns[i].clone()).collect();
    (projected, Some(keep))
}

/// The selected rows of a fully loaded table, restricted to `column_names`
/// (all columns when empty), as a new table
pub fn selected_rows(model: &TableModel, column_names: &[&str]) -> TableModel {
    let indices: Vec<usize> = if column_names.is_empty() {
        (0..model.columns.len()).collect()
    } else {
        column_names
            .iter()
            .filter_map(|name| model.column_index(name))
            .collect()
    };
    let columns = indices.iter().map(|&i| model.columns[i].clone()).collect();
    let rows: Vec<Row> = model
        .selection
        .all_selected_indices()
        .into_iter()
        .filter_map(|logical| model.loaded_row(logical))
        .map(|row| {
            indices
                .iter()
                .map(|&i| row.get(i).cloned().unwrap_or_default())
                .collect()
        })
        .collect();
    TableModel::new(format!("{}-selected", model.tbl_id), columns, rows)
        .with_meta(model.meta.clone())
}

/// Logical index of the first loaded row matching `filter`, if any
pub fn find_loaded_index(
    model: &TableModel,
    filter: &str,
    config: &EngineConfig,
) -> Result<Option<u64>> {
    let compiled = FilterExpression::parse(filter).compile(&model.columns, &config.null_token)?;
    let start = model.page_start();
    Ok(model
        .rows
        .iter()
        .enumerate()
        .find(|(i, row)| compiled.matches(row, start as usize + i))
        .map(|(i, _)| start + i as u64))
}
