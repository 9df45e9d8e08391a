//! Core types for Tabula

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single table cell.
///
/// `Missing` and `Null` are kept apart because ordering and filtering treat
/// them differently: a missing cell was never sent, a null cell was sent empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    /// No value was provided for this cell
    #[default]
    Missing,
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 text
    Text(String),
}

/// One row of cells, aligned to the table's columns
pub type Row = Vec<Value>;

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for both missing and null cells
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Missing | Value::Null)
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Value::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Try to get as f64, parsing numeric text.
    ///
    /// Returns `None` for missing, null, boolean and non-numeric text cells,
    /// and for NaN.
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            Value::Int(v) => *v as f64,
            Value::Float(v) => *v,
            Value::Text(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        (!v.is_nan()).then_some(v)
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Length of the cell as rendered by `Display`, in characters
    pub fn display_len(&self) -> usize {
        self.to_string().chars().count()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing | Value::Null => Ok(()),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Text(other.to_string()),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Missing | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Column data type, parsed from the type tag a table arrives with
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    Int,
    Float,
    #[default]
    Text,
    Bool,
    Date,
    Other(String),
}

impl ColumnType {
    /// Parse a type tag such as `int`, `double`, `char` or `date`
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "int" | "long" | "short" | "integer" => ColumnType::Int,
            "double" | "float" | "real" => ColumnType::Float,
            "char" | "string" | "text" => ColumnType::Text,
            "boolean" | "bool" => ColumnType::Bool,
            "date" => ColumnType::Date,
            _ => ColumnType::Other(tag.trim().to_string()),
        }
    }

    /// Tag written in exports and headers
    pub fn label(&self) -> &str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Float => "double",
            ColumnType::Text => "char",
            ColumnType::Bool => "boolean",
            ColumnType::Date => "date",
            ColumnType::Other(tag) => tag,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Float)
    }

    /// Whether literals for this type are written as quoted strings
    pub fn uses_string(&self) -> bool {
        matches!(self, ColumnType::Text | ColumnType::Date)
    }
}

impl From<String> for ColumnType {
    fn from(tag: String) -> Self {
        ColumnType::from_tag(&tag)
    }
}

impl From<ColumnType> for String {
    fn from(ty: ColumnType) -> Self {
        ty.label().to_string()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Column visibility in views and exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Show,
    Hidden,
}

/// Metadata about a table column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name, unique within its table
    pub name: String,
    /// Data type
    #[serde(rename = "type", default)]
    pub col_type: ColumnType,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub units: Option<String>,
    /// Display label, falls back to the name
    #[serde(default)]
    pub label: Option<String>,
    /// Text rendered for null cells; also matched as null by filters
    #[serde(default)]
    pub null_string: Option<String>,
    /// Display precision such as `F3`, `E2` or `G6`
    #[serde(default)]
    pub precision: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            col_type,
            visibility: Visibility::Show,
            units: None,
            label: None,
            null_string: None,
            precision: None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Float)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Int)
    }

    pub fn hidden(mut self) -> Self {
        self.visibility = Visibility::Hidden;
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_null_string(mut self, null_string: impl Into<String>) -> Self {
        self.null_string = Some(null_string.into());
        self
    }

    pub fn with_precision(mut self, precision: impl Into<String>) -> Self {
        self.precision = Some(precision.into());
        self
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Show
    }

    /// Label if present, otherwise the column name
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}
