//! Sort descriptors and the row comparator
//!
//! A sort spec serializes as `DIRECTION,col1,col2` (`ASC` or `DESC`), or as
//! the empty string when unsorted. Column names that are not plain
//! identifiers are double-quoted.

use crate::text::{quote_column_name, split_cols, strip_column_quotes};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tabula_core::{ColumnDescriptor, Result, TabulaError, Value};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
    #[default]
    Unsorted,
}

impl SortDirection {
    /// Get the serialized label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::Unsorted => "",
        }
    }

    /// Next state in the ASC -> DESC -> UNSORTED -> ASC cycle
    pub fn toggle(&self) -> Self {
        match self {
            Self::Unsorted => Self::Asc,
            Self::Asc => Self::Desc,
            Self::Desc => Self::Unsorted,
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            "" | "UNSORTED" => Some(Self::Unsorted),
            _ => None,
        }
    }
}

/// Ordering descriptor: a direction applied to one or more columns
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec {
    pub direction: SortDirection,
    /// Primary column first
    pub columns: Vec<String>,
}

impl SortSpec {
    pub fn new<S: Into<String>>(
        direction: SortDirection,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        if direction == SortDirection::Unsorted {
            return Self::unsorted();
        }
        Self {
            direction,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn is_sorted(&self) -> bool {
        self.direction != SortDirection::Unsorted && !self.columns.is_empty()
    }

    /// Parse `DIRECTION,col1,col2`. Unrecognized text parses as unsorted.
    pub fn parse(text: &str) -> Self {
        match Self::try_parse(text) {
            Ok(spec) => spec,
            Err(e) => {
                tracing::debug!(error = %e, "treating sort text as unsorted");
                Self::unsorted()
            }
        }
    }

    /// Strict parse used by validators
    pub fn try_parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::unsorted());
        }
        let mut parts = split_cols(text).into_iter();
        let head = parts.next().unwrap_or_default();
        let direction = SortDirection::from_label(&head)
            .ok_or_else(|| {
                TabulaError::InvalidSort(format!("unknown direction '{}'", head.trim()))
            })?;
        let columns = parts
            .map(|c| strip_column_quotes(&c))
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>();
        if direction != SortDirection::Unsorted && columns.is_empty() {
            return Err(TabulaError::InvalidSort(format!("'{}' names no column", text.trim())));
        }
        Ok(Self::new(direction, columns))
    }

    pub fn serialize(&self) -> String {
        if !self.is_sorted() {
            return String::new();
        }
        std::iter::once(self.direction.label().to_string())
            .chain(self.columns.iter().map(|c| quote_column_name(c)))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// This spec's direction if `column` is the primary sort column, else unsorted
    pub fn get_direction(&self, column: &str) -> SortDirection {
        match self.columns.first() {
            Some(primary) if *primary == strip_column_quotes(column) => self.direction,
            _ => SortDirection::Unsorted,
        }
    }

    /// Next spec when the user toggles `columns`.
    ///
    /// The same column set cycles ASC -> DESC -> UNSORTED; a different set
    /// starts again at ASC.
    pub fn toggle<S: AsRef<str>>(&self, columns: &[S]) -> SortSpec {
        let requested = columns
            .iter()
            .map(|c| strip_column_quotes(c.as_ref()))
            .collect::<Vec<_>>();
        let direction = if requested == self.columns {
            self.direction.toggle()
        } else {
            SortDirection::Asc
        };
        SortSpec::new(direction, requested)
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

/// How a column's cells are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortKind {
    Numeric,
    Text,
}

#[derive(Debug, Clone)]
struct SortColumn {
    column_index: usize,
    kind: SortKind,
}

/// A `SortSpec` resolved against a column layout
#[derive(Debug, Clone)]
pub struct RowSorter {
    columns: Vec<SortColumn>,
    direction: SortDirection,
}

impl RowSorter {
    /// Resolve the spec's columns; fails on a column that does not exist
    pub fn new(spec: &SortSpec, columns: &[ColumnDescriptor]) -> Result<Self> {
        let resolved = if spec.is_sorted() {
            spec.columns
                .iter()
                .map(|name| {
                    let idx = columns
                        .iter()
                        .position(|c| c.name == *name)
                        .ok_or_else(|| TabulaError::UnknownColumn(name.clone()))?;
                    let kind = if columns[idx].col_type.is_numeric() {
                        SortKind::Numeric
                    } else {
                        SortKind::Text
                    };
                    Ok(SortColumn {
                        column_index: idx,
                        kind,
                    })
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };
        Ok(Self {
            columns: resolved,
            direction: spec.direction,
        })
    }

    /// Compare two rows on every sort column in priority order
    pub fn compare_rows(&self, row_a: &[Value], row_b: &[Value]) -> Ordering {
        for col in &self.columns {
            let a = row_a.get(col.column_index).unwrap_or(&Value::Missing);
            let b = row_b.get(col.column_index).unwrap_or(&Value::Missing);
            let ordering = match col.kind {
                SortKind::Numeric => compare_numeric(a, b),
                SortKind::Text => compare_text(a, b),
            };
            if ordering != Ordering::Equal {
                return match self.direction {
                    SortDirection::Desc => ordering.reverse(),
                    _ => ordering,
                };
            }
        }
        Ordering::Equal
    }

    /// Stable sort in place
    pub fn sort_rows<R: AsRef<[Value]>>(&self, rows: &mut [R]) {
        if self.columns.is_empty() {
            return;
        }
        rows.sort_by(|a, b| self.compare_rows(a.as_ref(), b.as_ref()));
    }
}

/// Missing before null (including non-numeric cells) before numbers ascending
fn compare_numeric(a: &Value, b: &Value) -> Ordering {
    let rank = |v: &Value| match v {
        Value::Missing => 0,
        _ if v.as_f64().is_none() => 1,
        _ => 2,
    };
    match rank(a).cmp(&rank(b)) {
        Ordering::Equal => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
        other => other,
    }
}

/// Case-sensitive, with missing before null before the empty string
fn compare_text(a: &Value, b: &Value) -> Ordering {
    let rank = |v: &Value| match v {
        Value::Missing => 0,
        Value::Null => 1,
        _ => 2,
    };
    match rank(a).cmp(&rank(b)) {
        Ordering::Equal => a.to_string().cmp(&b.to_string()),
        other => other,
    }
}
