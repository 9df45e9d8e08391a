//! The boundary to whatever serves table pages

use async_trait::async_trait;
use tabula_core::{EngineConfig, FetchFailure, Result, TabulaError};
use tabula_table::{TableModel, TableRequest, find_loaded_index};

/// Column a lookup request asks the server to add with each row's
/// position in the unfiltered table
pub const ORG_ROWNUM: &str = "ORG_ROWNUM";

/// Message used when a failure reason is not recognised
pub const GENERIC_FETCH_MESSAGE: &str =
    "Failed to fetch data. Please contact support if the problem persists.";

/// Serves pages of tables.
///
/// Implementations report failures as `TabulaError::Fetch` with the raw
/// reason; retries, if any, belong to the implementation.
#[async_trait]
pub trait FetchCollaborator: Send + Sync {
    async fn fetch(&self, request: &TableRequest) -> Result<TableModel>;
}

/// Turn a raw failure reason into a user-facing failure
pub fn classify_reason(reason: &str) -> FetchFailure {
    let lower = reason.to_lowercase();
    if lower.contains("not supported") {
        FetchFailure::new(
            "Cannot display requested data",
            "Unsupported feature requested. Please choose valid options.",
        )
    } else if lower.contains("data exception") || lower.contains("column not found") {
        FetchFailure::new("Cannot display requested data", lower.replace("error: ", ""))
    } else if lower.contains("invalid column") {
        FetchFailure::new(
            "Cannot display requested data",
            "Non-existent column or invalid expression. Please choose valid columns.",
        )
    } else {
        tracing::warn!(reason, "unclassified fetch failure");
        FetchFailure::new(GENERIC_FETCH_MESSAGE, reason)
    }
}

/// Failure to record on a table for an error from the collaborator
pub fn fetch_failure(err: &TabulaError) -> FetchFailure {
    match err {
        TabulaError::Fetch { reason, .. } => classify_reason(reason),
        other => classify_reason(&other.to_string()),
    }
}

/// Logical index of the first row of `table` matching `filter`.
///
/// The loaded rows are searched first. When they hold no match and the
/// table is only partially loaded, the collaborator is asked for the
/// matching rows of the same result set, tagged with their original
/// position.
pub async fn find_index(
    collaborator: &dyn FetchCollaborator,
    table: &TableModel,
    filter: &str,
    config: &EngineConfig,
) -> Result<Option<u64>> {
    if let Some(idx) = find_loaded_index(table, filter, config)? {
        return Ok(Some(idx));
    }
    if table.is_fully_loaded() {
        return Ok(None);
    }

    let request = TableRequest {
        filters: filter.to_string(),
        incl_cols: Some(format!("ROW_NUM as {ORG_ROWNUM}")),
        highlighted_row: None,
        highlighted_row_by_row_idx: None,
        ..table.request.clone()
    }
    .with_page(0, 1);
    tracing::debug!(tbl_id = %table.tbl_id, filter, "looking up row through the collaborator");

    let found = collaborator.fetch(&request).await?;
    Ok(found
        .cell_value(found.page_start(), ORG_ROWNUM)
        .and_then(|v| v.as_i64())
        .and_then(|i| u64::try_from(i).ok()))
}
