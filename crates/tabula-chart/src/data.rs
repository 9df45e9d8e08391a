//! Shape fetched tables into plot points

use crate::boundaries::Boundaries;
use crate::params::{AxisParams, XyPlotParams};
use indexmap::IndexMap;
use tabula_core::{ColumnDescriptor, Result, Row, TabulaError, Value};
use tabula_table::TableModel;

/// Metadata key naming the catalog overlay type
pub const CATALOG_OVERLAY_TYPE: &str = "CatalogOverlayType";
/// Metadata key holding `lon;lat;system` coordinate columns
pub const CATALOG_COORD_COLS: &str = "CatalogCoordColumns";

/// One plotted point
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XyPoint {
    pub x: f64,
    pub y: f64,
    /// Source row, or the representative row of a bin
    pub row_idx: Option<i64>,
    /// Number of rows in the bin (decimated data only)
    pub weight: Option<f64>,
    /// Any further numeric columns, such as error bars
    pub extra: IndexMap<String, f64>,
}

/// Plot-ready data for one chart
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XyData {
    pub rows: Vec<XyPoint>,
    /// Present when the server binned the data
    pub decimate_key: Option<String>,
    pub bounds: Boundaries,
    pub weight_min: Option<f64>,
    pub weight_max: Option<f64>,
    /// Id of the table the points came from
    pub id_str: Option<String>,
}

impl XyData {
    pub fn is_decimated(&self) -> bool {
        self.decimate_key.is_some()
    }

    /// Points from a decimation result: columns are x, y, row index and,
    /// when the table carries a `decimate_key`, the bin weight
    pub fn from_decimated_table(table: &TableModel) -> Result<Self> {
        let decimate_key = meta_str(table, "decimate_key");
        let width = if decimate_key.is_some() { 4 } else { 3 };
        check_width(table, width)?;

        let rows = table
            .rows
            .iter()
            .map(|row| XyPoint {
                x: cell_f64(row, 0),
                y: cell_f64(row, 1),
                row_idx: row.get(2).and_then(Value::as_i64),
                weight: decimate_key.as_ref().map(|_| cell_f64(row, 3)),
                extra: IndexMap::new(),
            })
            .collect();

        Ok(Self {
            rows,
            bounds: Boundaries {
                x_min: meta_f64(table, "decimate.X-MIN"),
                x_max: meta_f64(table, "decimate.X-MAX"),
                y_min: meta_f64(table, "decimate.Y-MIN"),
                y_max: meta_f64(table, "decimate.Y-MAX"),
            },
            weight_min: meta_f64(table, "decimate.WEIGHT-MIN"),
            weight_max: meta_f64(table, "decimate.WEIGHT-MAX"),
            id_str: meta_str(table, "tbl_id"),
            decimate_key,
        })
    }

    /// Points from a raw fetch: the row index, x, y, then any error or
    /// sort columns, which are kept by name
    pub fn from_raw_table(table: &TableModel) -> Result<Self> {
        check_width(table, 3)?;
        let extra_columns: Vec<(usize, &ColumnDescriptor)> =
            table.columns.iter().enumerate().skip(3).collect();

        let rows = table
            .rows
            .iter()
            .map(|row| XyPoint {
                x: cell_f64(row, 1),
                y: cell_f64(row, 2),
                row_idx: row.first().and_then(Value::as_i64),
                weight: None,
                extra: extra_columns
                    .iter()
                    .map(|(idx, col)| (col.name.clone(), cell_f64(row, *idx)))
                    .collect(),
            })
            .collect();

        Ok(Self {
            rows,
            bounds: Boundaries {
                x_min: meta_f64(table, "X-MIN"),
                x_max: meta_f64(table, "X-MAX"),
                y_min: meta_f64(table, "Y-MIN"),
                y_max: meta_f64(table, "Y-MAX"),
            },
            id_str: meta_str(table, "tbl_id"),
            ..Default::default()
        })
    }

    /// Whether the unzoomed plot is decimated, after receiving this data.
    ///
    /// Data fetched while zoomed says nothing about the unzoomed plot unless
    /// it is itself decimated, so `previous` is kept in that case.
    pub fn decimated_unzoomed(&self, zoomed: bool, previous: Option<bool>) -> Option<bool> {
        if self.is_decimated() {
            Some(true)
        } else if zoomed {
            previous
        } else {
            Some(false)
        }
    }
}

fn check_width(table: &TableModel, width: usize) -> Result<()> {
    if !table.rows.is_empty() && table.columns.len() < width {
        return Err(TabulaError::Other(format!(
            "chart table {} has {} columns, expected at least {width}",
            table.tbl_id,
            table.columns.len()
        )));
    }
    Ok(())
}

fn cell_f64(row: &Row, idx: usize) -> f64 {
    row.get(idx).and_then(Value::as_f64).unwrap_or(f64::NAN)
}

fn meta_value<'a>(table: &'a TableModel, key: &str) -> Option<&'a Value> {
    table.meta.get(key)?.as_value()
}

fn meta_f64(table: &TableModel, key: &str) -> Option<f64> {
    meta_value(table, key)?.as_f64().filter(|v| v.is_finite())
}

fn meta_str(table: &TableModel, key: &str) -> Option<String> {
    match meta_value(table, key)? {
        Value::Missing | Value::Null => None,
        Value::Text(s) if s.is_empty() => None,
        other => Some(other.to_string()),
    }
}

/// Default axes for a table: the catalog coordinate columns when the
/// metadata names them, otherwise the first two numeric columns (or the
/// only one, on both axes). `None` for an empty table.
pub fn default_xy_columns(table: &TableModel) -> Option<XyPlotParams> {
    if table.total_rows == 0 {
        return None;
    }

    if meta_str(table, CATALOG_OVERLAY_TYPE).is_some()
        && let Some(coords) = meta_str(table, CATALOG_COORD_COLS)
    {
        let parts: Vec<&str> = coords.split(';').collect();
        if parts.len() != 3 {
            return None;
        }
        if let (Some(lon), Some(lat)) = (table.column(parts[0]), table.column(parts[1])) {
            return Some(XyPlotParams::new(
                AxisParams::new(&lon.name).with_options("flip"),
                AxisParams::new(&lat.name),
            ));
        }
    }

    let mut numeric = table.columns.iter().filter(|c| c.col_type.is_numeric());
    let x = numeric.next()?;
    let y = numeric.next().unwrap_or(x);
    Some(XyPlotParams::new(AxisParams::new(&x.name), AxisParams::new(&y.name)))
}
