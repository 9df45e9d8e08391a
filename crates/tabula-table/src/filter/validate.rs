//! Validation and auto-correction of user-entered filter text

use super::{Clause, FilterOp, split_conditions};
use crate::text::{split_clauses, split_vals, strip_column_quotes};
use serde::{Deserialize, Serialize};
use tabula_core::{ColumnDescriptor, ROW_IDX};

/// Hint shown next to a per-column condition field
pub const CONDITION_HINT: &str = "Valid values are one of (=, >, <, !=, >=, <=, LIKE, IS, IS NOT) \
followed by a value separated by a space. Or 'IN', followed by a list of values separated by commas. \
Combine conditions with 'and' or ';'. Examples: > 12345; != 3000 and IN a,b,c,d";

/// Outcome of validating filter text. Never an error: invalid input is
/// reported through `valid` and `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub valid: bool,
    pub message: String,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: String::new(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// Validation result for a field that also rewrites its value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectedValidation {
    pub valid: bool,
    /// The auto-corrected text
    pub value: String,
    pub message: String,
}

impl super::FilterExpression {
    /// Grammar check of filter text. Empty text is valid.
    pub fn validate(text: &str) -> Validation {
        validate_clauses(text, None)
    }

    /// Grammar check plus column existence. `ROW_IDX` is always accepted.
    pub fn validate_with_columns(text: &str, columns: &[ColumnDescriptor]) -> Validation {
        validate_clauses(text, Some(columns))
    }

    /// Auto-correct free-form filter text, then validate it against `columns`
    pub fn validator(text: &str, columns: &[ColumnDescriptor]) -> CorrectedValidation {
        let value = auto_correct_filter(text, columns);
        let Validation { valid, message } = Self::validate_with_columns(&value, columns);
        CorrectedValidation {
            valid,
            value,
            message,
        }
    }
}

fn validate_clauses(text: &str, columns: Option<&[ColumnDescriptor]>) -> Validation {
    let mut problems = Vec::new();
    for raw in split_clauses(text) {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let clause = Clause::split(raw);
        if !clause.is_complete() {
            problems.push(format!("\"{}\" is not a valid filter.", raw));
            continue;
        }
        if let Some(columns) = columns {
            let name = clause.column_name();
            if name != ROW_IDX && !columns.iter().any(|c| c.name == name) {
                problems.push(format!("\"{}\" unrecognized column.", raw));
            }
        }
    }
    if problems.is_empty() {
        Validation::ok()
    } else {
        Validation::invalid(problems.join("\n"))
    }
}

/// Whether every condition in `conditions` is a bare `op operand`
pub fn validate_conditions(conditions: &str) -> bool {
    split_conditions(conditions).iter().all(|part| {
        let clause = Clause::split(part);
        clause.column.is_empty() && clause.op.is_some() && !clause.operand.is_empty()
    })
}

/// Validator for a per-column condition field: auto-corrects, then validates
pub fn condition_validator(
    conditions: &str,
    column: Option<&ColumnDescriptor>,
) -> CorrectedValidation {
    let value = auto_correct_conditions(conditions, column);
    CorrectedValidation {
        valid: validate_conditions(&value),
        value,
        message: CONDITION_HINT.to_string(),
    }
}

/// Auto-correct every condition of a column's condition list
pub fn auto_correct_conditions(conditions: &str, column: Option<&ColumnDescriptor>) -> String {
    split_conditions(conditions)
        .iter()
        .map(|c| auto_correct_condition(c, column))
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Auto-correct every clause of free-form filter text
pub fn auto_correct_filter(text: &str, columns: &[ColumnDescriptor]) -> String {
    split_clauses(text)
        .iter()
        .map(|raw| raw.trim())
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            let clause = Clause::split(raw);
            if clause.column.is_empty() {
                return raw.to_string();
            }
            let name = strip_column_quotes(&clause.column);
            let col = columns.iter().find(|c| c.name == name);
            let condition = match clause.op {
                Some(op) => format!("{} {}", op, clause.operand),
                None => clause.operand.clone(),
            };
            format!("{} {}", clause.column, auto_correct_condition(&condition, col))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Rewrite one condition into a valid form for the column's type.
///
/// - no operator: `like '%val%'` for text or untyped columns, `= val` for numeric ones
/// - `like` with an unquoted value: wildcards escaped, wrapped in `'%...%'`
/// - `in`: wrapped in parentheses, items single-quoted for text columns
/// - comparisons: value single-quoted for text columns
/// - `is` / `is not`: value forced to `NULL`
pub fn auto_correct_condition(condition: &str, column: Option<&ColumnDescriptor>) -> String {
    let clause = Clause::split(condition);
    let mut value = clause.operand;
    if clause.op.is_none() && value.is_empty() {
        return condition.trim().to_string();
    }

    let use_quote = column.is_some_and(|c| c.col_type.uses_string());
    let op = clause.op.unwrap_or(if column.is_none() || use_quote {
        FilterOp::Like
    } else {
        FilterOp::Eq
    });

    match op {
        FilterOp::Like => {
            if !is_single_quoted(&value) {
                let escaped = escape_like_wildcards(&value);
                value = format!("'%{}%'", escaped);
            }
        }
        FilterOp::In => {
            let inner = value
                .strip_prefix('(')
                .and_then(|v| v.strip_suffix(')'))
                .unwrap_or(&value);
            let items = split_vals(inner)
                .iter()
                .map(|item| {
                    let item = item.trim();
                    if use_quote {
                        enclose_string(item)
                    } else {
                        item.to_string()
                    }
                })
                .collect::<Vec<_>>();
            value = format!("({})", items.join(", "));
        }
        FilterOp::Is | FilterOp::IsNot => value = "NULL".to_string(),
        _ => {
            if use_quote {
                value = enclose_string(&value);
            }
        }
    }
    format!("{} {}", op, value)
}

fn is_single_quoted(value: &str) -> bool {
    value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'')
}

fn enclose_string(value: &str) -> String {
    if is_single_quoted(value) {
        value.to_string()
    } else {
        format!("'{}'", value)
    }
}

fn escape_like_wildcards(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Number of individual conditions in filter text
pub fn filter_count(text: &str) -> usize {
    split_conditions(text)
        .iter()
        .filter(|part| Clause::split(part).op.is_some())
        .count()
}
