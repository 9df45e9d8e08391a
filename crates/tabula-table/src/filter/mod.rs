//! Per-column filter expressions
//!
//! A filter is an ordered map from column name to one or more conditions,
//! written as `col op operand` clauses joined by `;`. Conditions on the same
//! column are ANDed. Parsing is lenient: a clause that does not match the
//! grammar is skipped rather than rejecting the whole expression.

mod predicate;
mod validate;


pub use predicate::*;
pub use validate::*;

use crate::text::{quote_column_name, split_clauses, strip_column_quotes};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "is")]
    Is,
    #[serde(rename = "is not")]
    IsNot,
}

/// Symbolic operators, longest first so `<=` wins over `<`
const SYMBOLIC_OPS: [(&str, FilterOp); 6] = [
    ("!=", FilterOp::Ne),
    (">=", FilterOp::Ge),
    ("<=", FilterOp::Le),
    ("<", FilterOp::Lt),
    (">", FilterOp::Gt),
    ("=", FilterOp::Eq),
];

/// Word operators, which must be surrounded by whitespace
const WORD_OPS: [(&str, FilterOp); 4] = [
    ("is not", FilterOp::IsNot),
    ("like", FilterOp::Like),
    ("in", FilterOp::In),
    ("is", FilterOp::Is),
];

/// `word` would be read as (part of) a word operator
pub(crate) fn is_operator_word(word: &str) -> bool {
    WORD_OPS
        .iter()
        .flat_map(|(label, _)| label.split_whitespace())
        .any(|w| w.eq_ignore_ascii_case(word))
}

impl FilterOp {
    /// Operator as written in filter text
    pub fn label(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Like => "like",
            Self::In => "in",
            Self::Is => "is",
            Self::IsNot => "is not",
        }
    }

    /// Parse an operator token, case-insensitive for word operators
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        SYMBOLIC_OPS
            .iter()
            .chain(WORD_OPS.iter())
            .find(|(label, _)| label.eq_ignore_ascii_case(token))
            .map(|(_, op)| *op)
    }

    pub fn all() -> &'static [FilterOp] {
        &[
            Self::Lt,
            Self::Gt,
            Self::Le,
            Self::Ge,
            Self::Eq,
            Self::Ne,
            Self::Like,
            Self::In,
            Self::Is,
            Self::IsNot,
        ]
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One `op operand` condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub op: FilterOp,
    pub operand: String,
}

impl Condition {
    pub fn new(op: FilterOp, operand: impl Into<String>) -> Self {
        Self {
            op,
            operand: operand.into().trim().to_string(),
        }
    }

    /// Parse `op operand`; returns `None` when either part is missing
    /// or the text names a column.
    pub fn parse(text: &str) -> Option<Self> {
        let clause = Clause::split(text);
        match clause.op {
            Some(op) if clause.column.is_empty() && !clause.operand.is_empty() => {
                Some(Condition::new(op, clause.operand))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, self.operand)
    }
}

/// A clause split into its raw parts
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Clause {
    /// Column name as written, quotes included
    pub column: String,
    pub op: Option<FilterOp>,
    pub operand: String,
}

impl Clause {
    /// Split `col op operand`. When no operator is found the whole text
    /// becomes the operand and the column is empty.
    pub fn split(text: &str) -> Self {
        let text = text.trim();
        let search_from = quoted_prefix_len(text);
        match find_operator(&text[search_from..]) {
            Some((start, end, op)) => Clause {
                column: text[..search_from + start].trim().to_string(),
                op: Some(op),
                operand: text[search_from + end..].trim().to_string(),
            },
            None => Clause {
                column: String::new(),
                op: None,
                operand: text.to_string(),
            },
        }
    }

    /// Column name with surrounding quotes removed
    pub fn column_name(&self) -> String {
        strip_column_quotes(&self.column)
    }

    pub fn is_complete(&self) -> bool {
        !self.column.is_empty() && self.op.is_some() && !self.operand.is_empty()
    }
}

/// Byte length of a leading double-quoted name, or 0
fn quoted_prefix_len(text: &str) -> usize {
    if !text.starts_with('"') {
        return 0;
    }
    let bytes = text.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'"' {
            if bytes.get(i + 1) == Some(&b'"') {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    0
}

/// Leftmost operator in `text` as (start, end, op) byte offsets
fn find_operator(text: &str) -> Option<(usize, usize, FilterOp)> {
    let mut prev_is_space = true;
    for (i, c) in text.char_indices() {
        let rest = &text[i..];
        if let Some((label, op)) = SYMBOLIC_OPS.iter().find(|(label, _)| rest.starts_with(label)) {
            return Some((i, i + label.len(), *op));
        }
        if prev_is_space {
            for (label, op) in WORD_OPS.iter() {
                let Some(head) = rest.get(..label.len()) else {
                    continue;
                };
                let followed_by_space = rest[label.len()..]
                    .chars()
                    .next()
                    .is_some_and(char::is_whitespace);
                if head.eq_ignore_ascii_case(label) && followed_by_space {
                    return Some((i, i + label.len(), *op));
                }
            }
        }
        prev_is_space = c.is_whitespace() || c == '"';
    }
    None
}

/// Split a column's condition list on `;` or ` and `, outside quotes
pub(crate) fn split_conditions(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    for clause in split_clauses(text) {
        let mut current = String::new();
        let mut in_quote = false;
        let mut chars = clause.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                in_quote = !in_quote;
            }
            let at_and = !in_quote
                && clause
                    .get(i..i + 5)
                    .is_some_and(|s| s.eq_ignore_ascii_case(" and "));
            if at_and {
                parts.push(std::mem::take(&mut current));
                for _ in 0..4 {
                    chars.next();
                }
                continue;
            }
            current.push(c);
        }
        parts.push(current);
    }
    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Filter conditions keyed by column, in insertion order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterExpression {
    filters: IndexMap<String, Vec<Condition>>,
}

impl FilterExpression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `col op operand[; col op operand]*`, skipping malformed clauses
    pub fn parse(text: &str) -> Self {
        let mut expr = Self::new();
        for raw in split_clauses(text) {
            if raw.trim().is_empty() {
                continue;
            }
            let clause = Clause::split(&raw);
            match clause.op {
                Some(op) if clause.is_complete() => {
                    expr.add_condition(&clause.column_name(), Condition::new(op, clause.operand));
                }
                _ => tracing::debug!(clause = %raw.trim(), "skipping malformed filter clause"),
            }
        }
        expr
    }

    /// Join every condition as `col op operand` with `; `
    pub fn serialize(&self) -> String {
        self.iter()
            .map(|(col, cond)| format!("{} {}", quote_column_name(col), cond))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Append one condition, written `op operand`, to a column.
    ///
    /// Returns false, leaving the filter unchanged, if the condition does
    /// not parse.
    pub fn add_filter(&mut self, column: &str, condition: &str) -> bool {
        match Condition::parse(condition) {
            Some(cond) => {
                self.add_condition(column, cond);
                true
            }
            None => false,
        }
    }

    pub fn add_condition(&mut self, column: &str, condition: Condition) {
        self.filters
            .entry(strip_column_quotes(column))
            .or_default()
            .push(condition);
    }

    /// Replace all conditions on a column.
    ///
    /// `conditions` may hold several conditions separated by `;` or `and`.
    /// An empty string removes the column.
    pub fn set_filter(&mut self, column: &str, conditions: &str) {
        let column = strip_column_quotes(column);
        self.filters.shift_remove(&column);
        for part in split_conditions(conditions) {
            if let Some(cond) = Condition::parse(&part) {
                self.add_condition(&column, cond);
            }
        }
    }

    /// A column's conditions joined with ` and `
    pub fn get_filter(&self, column: &str) -> Option<String> {
        let conds = self.filters.get(&strip_column_quotes(column))?;
        Some(
            conds
                .iter()
                .map(Condition::to_string)
                .collect::<Vec<_>>()
                .join(" and "),
        )
    }

    pub fn conditions(&self, column: &str) -> &[Condition] {
        self.filters
            .get(&strip_column_quotes(column))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn remove(&mut self, column: &str) {
        self.filters.shift_remove(&strip_column_quotes(column));
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// Every (column, condition) pair in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.filters
            .iter()
            .flat_map(|(col, conds)| conds.iter().map(move |c| (col.as_str(), c)))
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Number of individual conditions
    pub fn condition_count(&self) -> usize {
        self.filters.values().map(Vec::len).sum()
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}
