//! The table reducer
//!
//! `TableStore` owns the registry and reacts to one [`TableEvent`] at a time.
//! Client-side views are recomputed on the spot; everything that needs the
//! server comes back as an [`Effect`] for the driver to run.

use crate::chart_sync::{ChartState, is_stale_chart_result, needs_fetch};
use crate::events::{Effect, SelectChange, TableEvent};
use crate::propagate::{
    HighlightSync, IdentityLink, apply_selection_update, highlight_target, pull_selection,
    selection_updates,
};
use crate::registry::TableRegistry;
use crate::staleness::{FetchTicket, LatestRequests};
use std::collections::HashMap;
use std::sync::Arc;
use tabula_chart::{XyPlotParams, is_large_table, plan_request};
use tabula_core::{EngineConfig, FetchFailure, ROW_IDX};
use tabula_table::{
    SelectionSet, TableModel, TableRequest, Tree, apply_filter_sort_page, structural_merge,
    view_row_positions,
};

#[cfg(test)]
mod tests;

/// What a dispatched event did
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reduction {
    /// Tables whose state changed, in the order they changed
    pub changed: Vec<String>,
    pub effects: Vec<Effect>,
}

impl Reduction {
    fn changed(tbl_id: &str) -> Self {
        Self {
            changed: vec![tbl_id.to_string()],
            effects: Vec::new(),
        }
    }

    fn mark(&mut self, tbl_id: &str) {
        if !self.changed.iter().any(|id| id == tbl_id) {
            self.changed.push(tbl_id.to_string());
        }
    }

    fn absorb(&mut self, other: Reduction) {
        for id in &other.changed {
            self.mark(id);
        }
        self.effects.extend(other.effects);
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.effects.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableStore {
    registry: TableRegistry,
    latest: LatestRequests,
    links: Vec<IdentityLink>,
    charts: HashMap<String, ChartState>,
    config: EngineConfig,
}

impl TableStore {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_registry(TableRegistry::new(), config)
    }

    pub fn with_registry(registry: TableRegistry, config: EngineConfig) -> Self {
        Self {
            registry,
            latest: LatestRequests::new(),
            links: Vec::new(),
            charts: HashMap::new(),
            config,
        }
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    pub fn table(&self, tbl_id: &str) -> Option<&TableModel> {
        self.registry.get(tbl_id)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn latest(&self) -> &LatestRequests {
        &self.latest
    }

    /// Keep highlight and selection of two tables in step
    pub fn link(&mut self, link: IdentityLink) {
        if !self.links.contains(&link) {
            self.links.push(link);
        }
    }

    pub fn links(&self) -> &[IdentityLink] {
        &self.links
    }

    #[tracing::instrument(skip(self, event), fields(kind = event.kind(), tbl_id = %event.tbl_id()))]
    pub fn dispatch(&mut self, event: TableEvent) -> Reduction {
        match event {
            TableEvent::Load(request) => self.load(request),
            TableEvent::Insert(table) => self.insert(table),
            TableEvent::Highlight { tbl_id, row } => self.highlight(&tbl_id, row),
            TableEvent::Select { tbl_id, change } => self.select(&tbl_id, change),
            TableEvent::Filter { tbl_id, filters } => {
                self.refine(&tbl_id, |request| request.filters = filters)
            }
            TableEvent::Sort { tbl_id, sort_info } => {
                self.refine(&tbl_id, |request| request.sort_info = sort_info)
            }
            TableEvent::Update { tbl_id, meta } => self.update(&tbl_id, &meta),
            TableEvent::FetchComplete { ticket, table } => self.fetch_complete(ticket, table),
            TableEvent::FetchError { ticket, error } => self.fetch_error(ticket, error),
            TableEvent::Remove { tbl_id } => self.remove(&tbl_id),
            TableEvent::PlotParams {
                chart_id,
                tbl_id,
                params,
            } => self.plot_params(&chart_id, &tbl_id, params),
        }
    }

    fn load(&mut self, mut request: TableRequest) -> Reduction {
        request.page_size = self.config.fix_page_size(Some(request.page_size));
        let tbl_id = request.tbl_id.clone();

        let recomputed = self
            .registry
            .get(&tbl_id)
            .filter(|table| table.is_client_table())
            .map(|table| apply_filter_sort_page(table, &request, &self.config));

        if let Some(result) = recomputed {
            // a local answer supersedes any fetch still in flight
            self.latest.record(request.clone());
            let table = match result {
                Ok(table) => table,
                Err(e) => {
                    tracing::warn!(error = %e, "client-side recompute failed");
                    TableModel::failed(request, FetchFailure::from(&e))
                }
            };
            tracing::info!(
                total_rows = table.total_rows,
                status = table.status().label(),
                "recomputed client table"
            );
            let highlight_applied = table.request.highlighted_row.is_some();
            self.registry.insert(table);
            let mut reduction = Reduction::changed(&tbl_id);
            if highlight_applied {
                reduction.absorb(self.sync_highlights(&tbl_id));
            }
            return reduction;
        }

        self.fetch(request)
    }

    /// Issue a server fetch, superseding whatever is in flight for the table
    fn fetch(&mut self, request: TableRequest) -> Reduction {
        let tbl_id = request.tbl_id.clone();
        let ticket = self.latest.record(request);
        match self.registry.get_mut(&tbl_id) {
            Some(table) => table.is_fetching = true,
            None => {
                self.registry.insert(TableModel::loading(ticket.request.clone()));
            }
        }
        tracing::info!(
            tbl_id = %tbl_id,
            seq = ticket.seq,
            start_idx = ticket.request.start_idx,
            page_size = ticket.request.page_size,
            "fetching table"
        );
        Reduction {
            changed: vec![tbl_id],
            effects: vec![Effect::Fetch(ticket)],
        }
    }

    fn insert(&mut self, table: TableModel) -> Reduction {
        let tbl_id = table.tbl_id.clone();
        // whatever was in flight for this id is answered by the inserted rows
        self.latest.forget(&tbl_id);

        if !table.is_fully_loaded() {
            tracing::info!(total_rows = table.total_rows, "registered partially loaded table");
            self.registry.insert(table);
            return Reduction::changed(&tbl_id);
        }

        let mut request = TableRequest {
            tbl_id: tbl_id.clone(),
            ..table.request.clone()
        };
        request.page_size = self.config.fix_page_size(Some(request.page_size));
        let view = match apply_filter_sort_page(&table, &request, &self.config) {
            Ok(view) => view,
            Err(e) => TableModel::failed(request, FetchFailure::from(&e)),
        };
        tracing::info!(total_rows = view.total_rows, "registered client table");
        self.registry.insert(view);
        Reduction::changed(&tbl_id)
    }

    fn highlight(&mut self, tbl_id: &str, row: i64) -> Reduction {
        let Some(table) = self.registry.get_mut(tbl_id) else {
            tracing::debug!(tbl_id, "highlight for unknown table");
            return Reduction::default();
        };
        let row = row.clamp(0, (table.total_rows as i64 - 1).max(0));
        if table.highlighted_row == row {
            return Reduction::default();
        }

        if table.is_data_available(row as u64, row as u64 + 1) {
            table.set_highlighted_row(row);
            let mut reduction = Reduction::changed(tbl_id);
            reduction.absorb(self.sync_highlights(tbl_id));
            return reduction;
        }

        let page_size = self.config.fix_page_size(Some(table.request.page_size));
        let request = TableRequest {
            start_idx: row / page_size * page_size,
            highlighted_row: Some(row),
            highlighted_row_by_row_idx: None,
            ..table.request.clone()
        };
        self.load(request)
    }

    fn sync_highlights(&mut self, tbl_id: &str) -> Reduction {
        let links: Vec<IdentityLink> = self
            .links
            .iter()
            .filter(|link| link.involves(tbl_id))
            .cloned()
            .collect();
        let mut reduction = Reduction::default();
        for link in links {
            match highlight_target(&self.registry, &link, tbl_id, &self.config) {
                Ok(HighlightSync::Found { tbl_id: other, index }) => {
                    reduction.absorb(self.highlight(&other, index as i64));
                }
                Ok(HighlightSync::Lookup { tbl_id: other, filter }) => {
                    reduction.effects.push(Effect::FindIndex { tbl_id: other, filter });
                }
                Ok(HighlightSync::Unresolved) => {}
                Err(e) => tracing::warn!(error = %e, "highlight sync failed"),
            }
        }
        reduction
    }

    fn select(&mut self, tbl_id: &str, change: SelectChange) -> Reduction {
        let Some(table) = self.registry.get_mut(tbl_id) else {
            tracing::debug!(tbl_id, "selection for unknown table");
            return Reduction::default();
        };
        match change {
            SelectChange::Row { index, selected } => {
                table.selection.set_row(index, selected);
                forward_to_original(table);
            }
            SelectChange::All(selected) => {
                table.selection.set_all(selected);
                forward_view_to_original(table, &self.config);
            }
            SelectChange::Replace(selection) => {
                table.selection = selection;
                forward_view_to_original(table, &self.config);
            }
        }
        let mut reduction = Reduction::changed(tbl_id);

        let links: Vec<IdentityLink> = self
            .links
            .iter()
            .filter(|link| link.involves(tbl_id))
            .cloned()
            .collect();
        for link in links {
            let touched = if link.derived_tbl == tbl_id {
                self.push_to_source(&link)
            } else {
                self.pull_into_derived(&link)
            };
            if let Some(other) = touched {
                reduction.mark(&other);
            }
        }
        reduction
    }

    fn push_to_source(&mut self, link: &IdentityLink) -> Option<String> {
        let update = selection_updates(self.registry.get(&link.derived_tbl)?, &link.derived_column);
        let source = self.registry.get_mut(&link.source_tbl)?;
        let touched = apply_selection_update(&mut source.selection, update);
        forward_to_original(source);
        tracing::debug!(touched, source = %link.source_tbl, "propagated selection to source");
        Some(link.source_tbl.clone())
    }

    fn pull_into_derived(&mut self, link: &IdentityLink) -> Option<String> {
        let source_selection: SelectionSet = self.registry.get(&link.source_tbl)?.selection.clone();
        let derived = self.registry.get_mut(&link.derived_tbl)?;
        let touched = pull_selection(derived, &link.derived_column, &source_selection);
        forward_to_original(derived);
        tracing::debug!(
            touched,
            derived = %link.derived_tbl,
            "pulled selection into derived table"
        );
        Some(link.derived_tbl.clone())
    }

    fn refine(&mut self, tbl_id: &str, change: impl FnOnce(&mut TableRequest)) -> Reduction {
        let Some(table) = self.registry.get(tbl_id) else {
            tracing::debug!(tbl_id, "filter or sort for unknown table");
            return Reduction::default();
        };
        let mut request = table.request.clone();
        change(&mut request);
        request.start_idx = 0;
        request.highlighted_row = None;
        let highlighted = table.highlighted_row.max(0);
        // an underived view lines up one-for-one with its original
        request.highlighted_row_by_row_idx = table
            .row_idx_of(highlighted as u64)
            .or_else(|| {
                (!table.request.derives_view() && table.total_rows > 0).then_some(highlighted)
            });
        self.load(request)
    }

    fn update(&mut self, tbl_id: &str, meta: &Arc<Tree>) -> Reduction {
        let Some(table) = self.registry.get_mut(tbl_id) else {
            return Reduction::default();
        };
        let merged = structural_merge(Some(&table.meta), meta);
        if Arc::ptr_eq(&merged, &table.meta) {
            return Reduction::default();
        }
        table.meta = merged;
        Reduction::changed(tbl_id)
    }

    fn fetch_complete(&mut self, ticket: FetchTicket, mut table: TableModel) -> Reduction {
        if !self.latest.is_current(&ticket) {
            tracing::warn!(
                tbl_id = %ticket.request.tbl_id,
                seq = ticket.seq,
                "discarding stale fetch result"
            );
            return Reduction::default();
        }
        let request = ticket.request;
        let tbl_id = request.tbl_id.clone();

        if let Some(chart) = self.charts.values_mut().find(|c| c.feeds(&tbl_id)) {
            match chart.requested.take() {
                Some(fetched)
                    if !is_stale_chart_result(
                        &fetched,
                        chart.params.as_ref(),
                        chart.is_large,
                        &self.config,
                    ) =>
                {
                    chart.data_used = Some(fetched);
                }
                _ => {
                    tracing::warn!(%tbl_id, "discarding chart data for outdated parameters");
                    return Reduction::default();
                }
            }
        }

        let previous = self.registry.get(&tbl_id);

        table.selection = match previous {
            Some(prev)
                if same_result_set(&prev.request, &request)
                    && prev.selection.row_count() == table.total_rows =>
            {
                prev.selection.clone()
            }
            _ => SelectionSet::new(table.total_rows),
        };
        if table.title.is_none() {
            table.title = previous.and_then(|p| p.title.clone());
        }
        table.tbl_id = tbl_id.clone();
        table.is_fetching = false;
        table.error = None;
        table.original = None;
        let highlight = request.highlighted_row;
        let mut request = request;
        let row = match (highlight, request.highlighted_row_by_row_idx) {
            (Some(row), _) => row,
            // the collaborator located the previous highlight and chose the page
            (None, Some(_)) => {
                request.start_idx = table.request.start_idx;
                table.highlighted_row
            }
            (None, None) => request.start_idx,
        };
        table.set_highlighted_row(row);
        table.request = request;

        tracing::info!(total_rows = table.total_rows, rows = table.rows.len(), "table page loaded");
        self.registry.insert(table);

        let mut reduction = Reduction::changed(&tbl_id);
        if highlight.is_some() {
            reduction.absorb(self.sync_highlights(&tbl_id));
        }
        reduction
    }

    fn fetch_error(&mut self, ticket: FetchTicket, error: FetchFailure) -> Reduction {
        if !self.latest.is_current(&ticket) {
            tracing::warn!(
                tbl_id = %ticket.request.tbl_id,
                seq = ticket.seq,
                "discarding stale fetch error"
            );
            return Reduction::default();
        }
        let request = ticket.request;
        if let Some(chart) = self.charts.values_mut().find(|c| c.feeds(&request.tbl_id)) {
            chart.requested = None;
        }
        tracing::warn!(
            tbl_id = %request.tbl_id,
            message = %error.message,
            reason = %error.reason,
            "fetch failed"
        );
        let tbl_id = request.tbl_id.clone();
        match self.registry.get_mut(&tbl_id) {
            Some(table) => {
                table.is_fetching = false;
                table.error = Some(error);
                table.request = request;
            }
            None => {
                self.registry.insert(TableModel::failed(request, error));
            }
        }
        Reduction::changed(&tbl_id)
    }

    /// Track a chart's parameters, fetching its data only when the new
    /// parameters cannot be served by what was fetched before
    fn plot_params(
        &mut self,
        chart_id: &str,
        tbl_id: &str,
        params: Option<XyPlotParams>,
    ) -> Reduction {
        let Some(params) = params else {
            let Some(chart) = self.charts.remove(chart_id) else {
                return Reduction::default();
            };
            tracing::info!(chart_id, "chart cleared");
            return match chart.data_tbl {
                Some(data_tbl) => self.remove(&data_tbl),
                None => Reduction::default(),
            };
        };
        let Some(source) = self.registry.get(tbl_id) else {
            tracing::debug!(tbl_id, chart_id, "plot for unknown table");
            return Reduction::default();
        };
        let is_large = is_large_table(source.total_rows, &self.config);
        let request = plan_request(&params, is_large, &self.config).to_table_request(
            &source.request,
            chart_id,
            &self.config,
        );

        let chart = self
            .charts
            .entry(chart_id.to_string())
            .or_insert_with(|| ChartState::new(tbl_id));
        if chart.source_tbl != tbl_id {
            *chart = ChartState::new(tbl_id);
        }
        let refetch = chart.data_tbl.is_none()
            || chart.is_large != is_large
            || needs_fetch(
                chart.params.as_ref(),
                Some(&params),
                is_large,
                chart.data_used.as_ref(),
                &self.config,
            );
        chart.params = Some(params.clone());
        chart.is_large = is_large;
        if !refetch {
            tracing::debug!(chart_id, "chart data reused");
            return Reduction::default();
        }
        chart.requested = Some(params);
        chart.data_tbl = Some(request.tbl_id.clone());
        tracing::info!(chart_id, is_large, "fetching chart data");
        self.fetch(request)
    }

    fn remove(&mut self, tbl_id: &str) -> Reduction {
        self.latest.forget(tbl_id);
        self.links.retain(|link| !link.involves(tbl_id));
        self.charts.retain(|_, chart| chart.source_tbl != tbl_id);
        for chart in self.charts.values_mut().filter(|c| c.feeds(tbl_id)) {
            chart.clear_data();
        }
        match self.registry.remove(tbl_id) {
            Some(_) => {
                tracing::info!(tbl_id, "removed table");
                Reduction::changed(tbl_id)
            }
            None => Reduction::default(),
        }
    }
}

/// Copy the loaded rows' selection of a client-side view onto its original
fn forward_to_original(table: &mut TableModel) {
    if table.original.is_none() {
        return;
    }
    let update = selection_updates(table, ROW_IDX);
    if let Some(original) = table.original.as_deref_mut() {
        apply_selection_update(&mut original.selection, update);
    }
}

/// Copy the selection of every row of a client-side view, loaded or not, onto its original
fn forward_view_to_original(table: &mut TableModel, config: &EngineConfig) {
    if table.original.is_none() || table.column_index(ROW_IDX).is_none() {
        forward_to_original(table);
        return;
    }
    let positions = match view_row_positions(table, config) {
        Ok(positions) => positions,
        Err(e) => {
            tracing::warn!(error = %e, "could not list view rows, forwarding the loaded page");
            forward_to_original(table);
            return;
        }
    };
    let selection = &table.selection;
    if let Some(original) = table.original.as_deref_mut() {
        let target = &mut original.selection;
        for (i, pos) in positions.into_iter().enumerate() {
            if pos < target.row_count() {
                target.set_row(pos as i64 - target.offset(), selection.contains_logical(i as u64));
            }
        }
    }
}

/// Two requests address the same rows, possibly different pages of them
fn same_result_set(a: &TableRequest, b: &TableRequest) -> bool {
    a.filters == b.filters
        && a.sort_info == b.sort_info
        && a.incl_cols == b.incl_cols
        && a.params == b.params
}
