//! Whether a chart's data must be fetched again

use tabula_chart::{XyPlotParams, plan_request};
use tabula_core::EngineConfig;

/// A scatter plot the store keeps fed from a source table
#[derive(Debug, Clone)]
pub(crate) struct ChartState {
    pub(crate) source_tbl: String,
    /// Table the fetched chart data lands in
    pub(crate) data_tbl: Option<String>,
    pub(crate) params: Option<XyPlotParams>,
    /// Parameters of the fetch in flight
    pub(crate) requested: Option<XyPlotParams>,
    /// Parameters the current data was fetched with
    pub(crate) data_used: Option<XyPlotParams>,
    pub(crate) is_large: bool,
}

impl ChartState {
    pub(crate) fn new(source_tbl: &str) -> Self {
        Self {
            source_tbl: source_tbl.to_string(),
            data_tbl: None,
            params: None,
            requested: None,
            data_used: None,
            is_large: false,
        }
    }

    pub(crate) fn feeds(&self, tbl_id: &str) -> bool {
        self.data_tbl.as_deref() == Some(tbl_id)
    }

    pub(crate) fn clear_data(&mut self) {
        self.data_tbl = None;
        self.requested = None;
        self.data_used = None;
    }
}

/// Decide whether moving a chart from `old` to `new` parameters needs a
/// round trip.
///
/// Large tables compare only what the decimation call depends on (columns,
/// bins, ratio, zoom). Small tables compare the raw column set (sort and
/// error columns included) against the parameters the current data was
/// actually fetched with when known, else against `old`.
pub fn needs_fetch(
    old: Option<&XyPlotParams>,
    new: Option<&XyPlotParams>,
    is_large: bool,
    data_used: Option<&XyPlotParams>,
    config: &EngineConfig,
) -> bool {
    let (Some(old), Some(new)) = (old, new) else {
        return old.is_some() || new.is_some();
    };
    if std::ptr::eq(old, new) {
        return false;
    }
    let baseline = if is_large { old } else { data_used.unwrap_or(old) };
    plan_request(baseline, is_large, config) != plan_request(new, is_large, config)
}

/// A chart result fetched for `fetched` is stale when the chart is gone or
/// its parameters have since moved to something needing another fetch
pub fn is_stale_chart_result(
    fetched: &XyPlotParams,
    current: Option<&XyPlotParams>,
    is_large: bool,
    config: &EngineConfig,
) -> bool {
    match current {
        None => true,
        Some(current) => needs_fetch(Some(fetched), Some(current), is_large, None, config),
    }
}
