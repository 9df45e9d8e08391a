//! Common test utilities and mocks

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tabula_core::{ColumnDescriptor, EngineConfig, ROW_IDX, Result, TabulaError, Value};
use tabula_sync::{FetchCollaborator, ORG_ROWNUM};
use tabula_table::{TableModel, TableRequest, apply_filter_sort_page};

/// Mock collaborator that serves pages of in-memory tables the way a
/// server would: filtered, sorted and paged, without a cached original.
///
/// Responses can be delayed per filter pattern to force out-of-order
/// completion, and every request is logged for assertions.
pub struct MockFetcher {
    pub tables: Vec<TableModel>,
    pub config: EngineConfig,
    pub should_fail: Option<String>,
    /// If a request's filter contains the pattern, the response is delayed
    pub delays: Vec<(String, Duration)>,
    pub request_log: Arc<parking_lot::Mutex<Vec<TableRequest>>>,
    pub completed: Arc<parking_lot::Mutex<usize>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            tables: vec![],
            config: EngineConfig::default(),
            should_fail: None,
            delays: vec![],
            request_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
            completed: Arc::new(parking_lot::Mutex::new(0)),
        }
    }

    pub fn with_table(mut self, table: TableModel) -> Self {
        self.tables.push(table);
        self
    }

    /// Fail every fetch with the given raw reason
    pub fn with_failure(mut self, reason: impl Into<String>) -> Self {
        self.should_fail = Some(reason.into());
        self
    }

    pub fn with_delay(mut self, filter_contains: impl Into<String>, delay: Duration) -> Self {
        self.delays.push((filter_contains.into(), delay));
        self
    }

    pub fn request_log(&self) -> Vec<TableRequest> {
        self.request_log.lock().clone()
    }

    pub fn completed(&self) -> usize {
        *self.completed.lock()
    }

    fn serve(&self, request: &TableRequest) -> Result<TableModel> {
        if let Some(reason) = &self.should_fail {
            return Err(TabulaError::Fetch {
                message: "fetch failed".into(),
                reason: reason.clone(),
            });
        }
        let source = self
            .tables
            .iter()
            .find(|t| t.tbl_id == request.tbl_id)
            .ok_or_else(|| TabulaError::TableNotFound(request.tbl_id.clone()))?;

        let wants_rownum = request
            .incl_cols
            .as_deref()
            .is_some_and(|cols| cols.contains(ORG_ROWNUM));
        let server_request = TableRequest {
            incl_cols: if wants_rownum { None } else { request.incl_cols.clone() },
            ..request.clone()
        };
        let mut page = apply_filter_sort_page(source, &server_request, &self.config)?;
        if let Some(error) = page.error.take() {
            return Err(TabulaError::Fetch {
                message: error.message,
                reason: error.reason,
            });
        }
        if wants_rownum && let Some(idx) = page.column_index(ROW_IDX) {
            page.columns[idx] = ColumnDescriptor::int(ORG_ROWNUM);
        }
        page.original = None;
        page.request = TableRequest {
            start_idx: page.request.start_idx,
            ..request.clone()
        };
        Ok(page)
    }
}

#[async_trait]
impl FetchCollaborator for MockFetcher {
    async fn fetch(&self, request: &TableRequest) -> Result<TableModel> {
        self.request_log.lock().push(request.clone());

        let delay = self
            .delays
            .iter()
            .find(|(pattern, _)| request.filters.contains(pattern.as_str()))
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = self.serve(request);
        *self.completed.lock() += 1;
        result
    }
}

/// `rows` stars with a sequential ROWID and `mag` equal to the row number
pub fn star_table(tbl_id: &str, rows: i64) -> TableModel {
    TableModel::new(
        tbl_id,
        vec![
            ColumnDescriptor::int("ROWID"),
            ColumnDescriptor::text("name"),
            ColumnDescriptor::float("mag"),
        ],
        (0..rows)
            .map(|i| {
                vec![
                    Value::from(i),
                    Value::from(format!("star-{i}")),
                    Value::from(i as f64),
                ]
            })
            .collect(),
    )
}
