//! Scatter plot parameters

use crate::boundaries::{Boundaries, resolve_boundaries};
use crate::data::XyData;
use serde::{Deserialize, Serialize};
use tabula_table::TableModel;

/// Options for one plot axis
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AxisParams {
    /// Column name or an expression built from column names
    pub column_or_expr: String,
    pub label: Option<String>,
    pub unit: Option<String>,
    /// Symmetric error column or expression
    pub error: Option<String>,
    pub error_low: Option<String>,
    pub error_high: Option<String>,
    /// Comma separated options: `grid`, `log`, `flip`
    pub options: Option<String>,
}

impl AxisParams {
    pub fn new(column_or_expr: impl Into<String>) -> Self {
        Self {
            column_or_expr: column_or_expr.into(),
            ..Default::default()
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_asymmetric_error(
        mut self,
        low: impl Into<String>,
        high: impl Into<String>,
    ) -> Self {
        self.error_low = Some(low.into());
        self.error_high = Some(high.into());
        self
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options
            .as_deref()
            .is_some_and(|opts| opts.split(',').any(|o| o.trim() == option))
    }

    pub fn is_log(&self) -> bool {
        self.has_option("log")
    }

    pub fn has_errors(&self) -> bool {
        self.error.is_some() || self.error_low.is_some() || self.error_high.is_some()
    }
}

/// Number of bins along each axis of a decimated plot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinGrid {
    pub x: u32,
    pub y: u32,
}

/// Everything a scatter plot needs to request and draw its data
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct XyPlotParams {
    pub title: Option<String>,
    pub x: AxisParams,
    pub y: AxisParams,
    /// Column the raw points are ordered by (small tables only)
    pub sort_by: Option<String>,
    /// Aspect ratio of the plot area
    pub xy_ratio: Option<f64>,
    pub nbins: Option<BinGrid>,
    pub zoom: Option<Boundaries>,
    /// Rectangle the user has dragged out but not yet acted on
    pub selection: Option<Boundaries>,
    pub user_set_boundaries: Option<Boundaries>,
    /// Limits resolved from user settings and the data
    pub boundaries: Option<Boundaries>,
}

impl XyPlotParams {
    pub fn new(x: AxisParams, y: AxisParams) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    pub fn with_sort_by(mut self, column: impl Into<String>) -> Self {
        self.sort_by = Some(column.into());
        self
    }

    pub fn with_xy_ratio(mut self, ratio: f64) -> Self {
        self.xy_ratio = Some(ratio);
        self
    }

    pub fn with_nbins(mut self, x: u32, y: u32) -> Self {
        self.nbins = Some(BinGrid { x, y });
        self
    }

    pub fn with_zoom(mut self, zoom: Boundaries) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn has_errors(&self) -> bool {
        self.x.has_errors() || self.y.has_errors()
    }

    /// Zoom into `selection`, or reset the zoom when it is `None`.
    ///
    /// Returns whether the plot data must be fetched again: zooming into a
    /// decimated plot needs finer bins, and resetting needs a fetch unless
    /// the unzoomed data are known not to be decimated.
    pub fn zoom_to(
        &mut self,
        selection: Option<Boundaries>,
        data: Option<&XyData>,
        decimated_unzoomed: Option<bool>,
    ) -> bool {
        let Some(data) = data else {
            return false;
        };
        match selection {
            Some(selection) => {
                self.zoom = Some(selection);
                self.selection = None;
                data.is_decimated()
            }
            None => {
                self.zoom = self.selection.take();
                decimated_unzoomed.unwrap_or(true)
            }
        }
    }

    /// Parameters to draw with once `data` has arrived for `table`.
    ///
    /// Missing axis labels default to the column expression, missing units
    /// come from the table's column, any pending selection is dropped and
    /// the boundaries are resolved against the data.
    pub fn updated_for(&self, table: &TableModel, data: &XyData, pad_factor: f64) -> XyPlotParams {
        let mut updated = self.clone();
        for axis in [&mut updated.x, &mut updated.y] {
            if axis.label.as_deref().is_none_or(str::is_empty) {
                axis.label = Some(axis.column_or_expr.clone());
            }
            if axis.unit.as_deref().is_none_or(str::is_empty) {
                let units = table
                    .column(&axis.column_or_expr)
                    .and_then(|c| c.units.clone())
                    .unwrap_or_default();
                axis.unit = Some(units);
            }
        }
        updated.selection = None;
        if let Some(resolved) = resolve_boundaries(self, data, pad_factor) {
            updated.boundaries = Some(resolved);
        }
        updated
    }
}
