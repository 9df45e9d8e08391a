//! Decide between a decimated and a raw fetch for a scatter plot

use crate::boundaries::Boundaries;
use crate::params::XyPlotParams;
use serde::{Deserialize, Serialize};
use tabula_core::EngineConfig;
use tabula_table::TableRequest;

/// Request parameter carrying the serialised decimation tuple
pub const DECIMATE_PARAM: &str = "decimate";

/// Server-side decimation of two column expressions into at most
/// `max_bins` bins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecimateParams {
    pub x_expr: String,
    pub y_expr: String,
    pub max_bins: u32,
    pub xy_ratio: f64,
    pub zoom: Boundaries,
}

impl DecimateParams {
    /// `x,y,maxBins,xyRatio[,xMin,xMax,yMin,yMax]`; unknown zoom limits are
    /// left empty and the zoom part is dropped when there is no zoom at all
    pub fn to_request_string(&self) -> String {
        let mut parts = vec![
            self.x_expr.clone(),
            self.y_expr.clone(),
            self.max_bins.to_string(),
            self.xy_ratio.to_string(),
        ];
        if !self.zoom.is_empty() {
            let limits = [self.zoom.x_min, self.zoom.x_max, self.zoom.y_min, self.zoom.y_max];
            parts.extend(limits.iter().map(|v| v.map(|v| v.to_string()).unwrap_or_default()));
        }
        parts.join(",")
    }
}

/// Raw columns for a small table; unset entries are omitted
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_err: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_err_low: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_err_high: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_err: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_err_low: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_err_high: Option<String>,
}

impl RawParams {
    /// The set entries in order, keyed the way the fetch collaborator expects
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("sortBy", &self.sort_by),
            ("x", &self.x),
            ("xErr", &self.x_err),
            ("xErrLow", &self.x_err_low),
            ("xErrHigh", &self.x_err_high),
            ("y", &self.y),
            ("yErr", &self.y_err),
            ("yErrLow", &self.y_err_low),
            ("yErrHigh", &self.y_err_high),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect()
    }
}

/// What to ask the fetch collaborator for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChartRequest {
    Decimated(DecimateParams),
    Raw(RawParams),
}

impl ChartRequest {
    pub fn is_decimated(&self) -> bool {
        matches!(self, ChartRequest::Decimated(_))
    }

    /// Request for the whole of `source`'s result set, shaped for the plot
    pub fn to_table_request(
        &self,
        source: &TableRequest,
        chart_id: &str,
        config: &EngineConfig,
    ) -> TableRequest {
        let mut request = source.clone().with_page(0, config.max_row);
        request.tbl_id = format!("xy-{chart_id}");
        request.highlighted_row = None;
        request.highlighted_row_by_row_idx = None;
        match self {
            ChartRequest::Decimated(decimate) => {
                request
                    .params
                    .insert(DECIMATE_PARAM.to_string(), decimate.to_request_string());
            }
            ChartRequest::Raw(raw) => {
                for (key, value) in raw.entries() {
                    request.params.insert(key.to_string(), value.to_string());
                }
            }
        }
        request
    }
}

/// Tables at or above the configured threshold are decimated server-side
pub fn is_large_table(total_rows: u64, config: &EngineConfig) -> bool {
    total_rows >= config.large_table_threshold
}

/// Plan the fetch for a scatter plot.
///
/// Large tables get a decimation tuple: `max_bins` and ratio come from the
/// bin grid when one is given, otherwise from the configured bin count and
/// the plot's aspect ratio (1.0 when unset). Small tables get the raw
/// columns with sort and error-bar columns.
pub fn plan_request(params: &XyPlotParams, is_large: bool, config: &EngineConfig) -> ChartRequest {
    let request = if is_large {
        let (max_bins, xy_ratio) = match params.nbins {
            Some(grid) if grid.y > 0 => {
                (grid.x.saturating_mul(grid.y), grid.x as f64 / grid.y as f64)
            }
            _ => (config.max_bins, params.xy_ratio.unwrap_or(1.0)),
        };
        ChartRequest::Decimated(DecimateParams {
            x_expr: params.x.column_or_expr.clone(),
            y_expr: params.y.column_or_expr.clone(),
            max_bins,
            xy_ratio,
            zoom: params.zoom.unwrap_or_default(),
        })
    } else {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        ChartRequest::Raw(RawParams {
            sort_by: params.sort_by.clone(),
            x: non_empty(&params.x.column_or_expr),
            x_err: params.x.error.clone(),
            x_err_low: params.x.error_low.clone(),
            x_err_high: params.x.error_high.clone(),
            y: non_empty(&params.y.column_or_expr),
            y_err: params.y.error.clone(),
            y_err_low: params.y.error_low.clone(),
            y_err_high: params.y.error_high.clone(),
        })
    };
    tracing::debug!(
        x = %params.x.column_or_expr,
        y = %params.y.column_or_expr,
        decimated = is_large,
        "planned chart request"
    );
    request
}
