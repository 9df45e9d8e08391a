//! Axis boundaries: extraction from plot data and padding

use crate::data::XyData;
use crate::params::XyPlotParams;
use serde::{Deserialize, Serialize};

/// X and Y limits; any of them may be unknown
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Boundaries {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_max: Option<f64>,
}

impl Boundaries {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min: Some(x_min),
            x_max: Some(x_max),
            y_min: Some(y_min),
            y_max: Some(y_max),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x_min.is_none() && self.x_max.is_none() && self.y_min.is_none() && self.y_max.is_none()
    }

    /// All four limits are known and finite
    pub fn is_complete(&self) -> bool {
        [self.x_min, self.x_max, self.y_min, self.y_max]
            .iter()
            .all(|v| v.is_some_and(f64::is_finite))
    }

    pub fn x_range(&self) -> Option<f64> {
        Some(self.x_max? - self.x_min?)
    }

    pub fn y_range(&self) -> Option<f64> {
        Some(self.y_max? - self.y_min?)
    }
}

/// Data extrema reported with the plot data, omitting unknown ones
pub fn compute_boundaries(data: &XyData) -> Boundaries {
    data.bounds
}

/// Pad both axes by `range / factor` on each side.
///
/// A log axis is padded in log10 space and only when its minimum is
/// positive, so a padded log minimum is always positive. An axis with an
/// unknown or non-positive range is returned unchanged.
pub fn pad(boundaries: &Boundaries, log_x: bool, log_y: bool, factor: f64) -> Boundaries {
    let mut padded = *boundaries;
    if let (Some(min), Some(max)) = (boundaries.x_min, boundaries.x_max) {
        let (min, max) = padded_range(min, max, log_x && min > 0.0, factor);
        padded.x_min = Some(min);
        padded.x_max = Some(max);
    }
    if let (Some(min), Some(max)) = (boundaries.y_min, boundaries.y_max) {
        let (min, max) = padded_range(min, max, log_y && min > 0.0, factor);
        padded.y_min = Some(min);
        padded.y_max = Some(max);
    }
    padded
}

fn padded_range(min: f64, max: f64, log: bool, factor: f64) -> (f64, f64) {
    let range = max - min;
    if range.is_nan() || range <= 0.0 {
        return (min, max);
    }
    if log {
        let (min_log, max_log) = (min.log10(), max.log10());
        let pad_log = (max_log - min_log) / factor;
        (10f64.powf(min_log - pad_log), 10f64.powf(max_log + pad_log))
    } else {
        let pad = range / factor;
        (min - pad, max + pad)
    }
}

/// Pad data boundaries using the log options of the plot's axes
pub fn padded_boundaries(
    params: &XyPlotParams,
    boundaries: &Boundaries,
    factor: f64,
) -> Boundaries {
    pad(boundaries, params.x.is_log(), params.y.is_log(), factor)
}

/// Axis limits to draw: user-set limits where given and finite, padded data
/// limits for the rest. `None` when nothing is known.
pub fn resolve_boundaries(params: &XyPlotParams, data: &XyData, factor: f64) -> Option<Boundaries> {
    let user = params.user_set_boundaries.unwrap_or_default();
    if user.is_complete() {
        return Some(user);
    }
    let data_bounds = compute_boundaries(data);
    if data_bounds.is_empty() {
        return (!user.is_empty()).then_some(user);
    }
    let padded = padded_boundaries(params, &data_bounds, factor);
    let pick = |user: Option<f64>, data: Option<f64>| user.filter(|v| v.is_finite()).or(data);
    let resolved = Boundaries {
        x_min: pick(user.x_min, padded.x_min),
        x_max: pick(user.x_max, padded.x_max),
        y_min: pick(user.y_min, padded.y_min),
        y_max: pick(user.y_max, padded.y_max),
    };
    (!resolved.is_empty()).then_some(resolved)
}
