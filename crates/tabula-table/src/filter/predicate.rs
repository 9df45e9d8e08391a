//! Compiling a filter into row predicates for client-side evaluation

use super::{FilterExpression, FilterOp};
use crate::text::{split_vals, strip_single_quotes};
use regex::Regex;
use std::cmp::Ordering;
use tabula_core::{ColumnDescriptor, ROW_IDX, Result, TabulaError, Value};

/// Error reported when a numeric column is compared with a non-numeric literal
pub const CAST_ERROR: &str = "data exception: invalid character value for cast";

/// A filter bound to a column layout; every predicate must hold (AND)
#[derive(Debug, Clone, Default)]
pub struct CompiledFilter {
    predicates: Vec<Predicate>,
}

impl CompiledFilter {
    /// Whether a row passes. `position` is the row's index in the table
    /// being filtered, used for a synthetic `ROW_IDX`.
    pub fn matches(&self, row: &[Value], position: usize) -> bool {
        self.predicates.iter().all(|p| p.matches(row, position))
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Predicate {
    target: Target,
    kind: Kind,
    null_string: String,
    test: Test,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Column(usize),
    /// `ROW_IDX` on a table that does not carry it
    Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    Numeric,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Num(f64),
    Text(String),
}

#[derive(Debug, Clone)]
enum Test {
    Compare(FilterOp, Literal),
    Like(Regex),
    In { items: Vec<Literal>, matches_null: bool },
    IsNull(bool),
}

enum Cell {
    Null,
    Num(f64),
    Text(String),
}

impl FilterExpression {
    /// Bind this filter to `columns`.
    ///
    /// Fails on a column that does not exist (other than `ROW_IDX`) and on
    /// numeric comparisons against non-numeric literals.
    pub fn compile(
        &self,
        columns: &[ColumnDescriptor],
        null_token: &str,
    ) -> Result<CompiledFilter> {
        let mut predicates = Vec::with_capacity(self.condition_count());
        for (name, cond) in self.iter() {
            let (target, kind, null_string) = match columns.iter().position(|c| c.name == name) {
                Some(idx) => {
                    let col = &columns[idx];
                    let kind = if col.col_type.is_numeric() {
                        Kind::Numeric
                    } else {
                        Kind::Text
                    };
                    let null_string = col.null_string.clone().unwrap_or_default().to_lowercase();
                    (Target::Column(idx), kind, null_string)
                }
                None if name == ROW_IDX => (Target::Position, Kind::Numeric, String::new()),
                None => return Err(TabulaError::UnknownColumn(name.to_string())),
            };
            let test = compile_test(cond.op, &cond.operand, kind, null_token)?;
            predicates.push(Predicate {
                target,
                kind,
                null_string,
                test,
            });
        }
        Ok(CompiledFilter { predicates })
    }
}

fn compile_test(op: FilterOp, operand: &str, kind: Kind, null_token: &str) -> Result<Test> {
    let literal = |raw: &str| -> Result<Literal> {
        let unquoted = strip_single_quotes(raw.trim());
        match kind {
            Kind::Numeric => unquoted
                .trim()
                .parse::<f64>()
                .map(Literal::Num)
                .map_err(|_| TabulaError::InvalidFilter(CAST_ERROR.to_string())),
            Kind::Text => Ok(Literal::Text(unquoted.to_lowercase())),
        }
    };

    let test = match op {
        FilterOp::Like => Test::Like(like_to_regex(&strip_single_quotes(operand).to_lowercase())?),
        FilterOp::In => {
            let inner = operand
                .strip_prefix('(')
                .and_then(|v| v.strip_suffix(')'))
                .unwrap_or(operand);
            let mut items = Vec::new();
            let mut matches_null = false;
            for raw in split_vals(inner) {
                if strip_single_quotes(raw.trim()).eq_ignore_ascii_case(null_token) {
                    matches_null = true;
                } else if kind == Kind::Numeric && raw.trim().is_empty() {
                    // a bare empty element reads as zero
                    items.push(Literal::Num(0.0));
                } else {
                    items.push(literal(raw.as_str())?);
                }
            }
            Test::In {
                items,
                matches_null,
            }
        }
        FilterOp::Is | FilterOp::IsNot => {
            if !operand.trim().eq_ignore_ascii_case("null") {
                return Err(TabulaError::InvalidFilter(format!(
                    "'{}' expects NULL, got '{}'",
                    op, operand
                )));
            }
            Test::IsNull(op == FilterOp::Is)
        }
        _ => Test::Compare(op, literal(operand)?),
    };
    Ok(test)
}

impl Predicate {
    fn matches(&self, row: &[Value], position: usize) -> bool {
        let cell = match self.target {
            Target::Position => Cell::Num(position as f64),
            Target::Column(idx) => self.resolve(row.get(idx).unwrap_or(&Value::Missing)),
        };

        match &self.test {
            Test::IsNull(want_null) => matches!(cell, Cell::Null) == *want_null,
            Test::Like(re) => match cell {
                Cell::Null => false,
                Cell::Num(n) => re.is_match(&Value::Float(n).to_string()),
                Cell::Text(s) => re.is_match(&s),
            },
            Test::In {
                items,
                matches_null,
            } => {
                if *matches_null && matches!(cell, Cell::Null) {
                    return true;
                }
                self.comparable(cell).is_some_and(|lit| items.contains(&lit))
            }
            Test::Compare(op, lit) => {
                if matches!(cell, Cell::Null) && !matches!(op, FilterOp::Eq | FilterOp::Ne) {
                    return false;
                }
                self.comparable(cell)
                    .and_then(|value| compare(&value, lit))
                    .is_some_and(|ord| op_holds(*op, ord))
            }
        }
    }

    fn resolve(&self, value: &Value) -> Cell {
        if value.is_absent() {
            return Cell::Null;
        }
        match self.kind {
            Kind::Numeric => value.as_f64().map(Cell::Num).unwrap_or(Cell::Null),
            Kind::Text => {
                let text = value.to_string().to_lowercase();
                if text == self.null_string {
                    Cell::Null
                } else {
                    Cell::Text(text)
                }
            }
        }
    }

    /// Value used by comparisons; null text cells compare as the null string
    fn comparable(&self, cell: Cell) -> Option<Literal> {
        match (cell, self.kind) {
            (Cell::Num(n), _) => Some(Literal::Num(n)),
            (Cell::Text(s), _) => Some(Literal::Text(s)),
            (Cell::Null, Kind::Text) => Some(Literal::Text(self.null_string.clone())),
            (Cell::Null, Kind::Numeric) => None,
        }
    }
}

fn compare(a: &Literal, b: &Literal) -> Option<Ordering> {
    match (a, b) {
        (Literal::Num(x), Literal::Num(y)) => x.partial_cmp(y),
        (Literal::Text(x), Literal::Text(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn op_holds(op: FilterOp, ord: Ordering) -> bool {
    match op {
        FilterOp::Lt => ord == Ordering::Less,
        FilterOp::Gt => ord == Ordering::Greater,
        FilterOp::Le => ord != Ordering::Greater,
        FilterOp::Ge => ord != Ordering::Less,
        FilterOp::Eq => ord == Ordering::Equal,
        FilterOp::Ne => ord != Ordering::Equal,
        _ => false,
    }
}

/// Translate a SQL `like` pattern into an anchored regular expression.
///
/// `%` matches any run and `_` any single character; `\%` and `\_` are literal.
pub fn like_to_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::from("(?s)^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some(&next @ ('%' | '_' | '\\')) => {
                    chars.next();
                    re.push_str(&regex::escape(&next.to_string()));
                }
                _ => re.push_str(r"\\"),
            },
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| TabulaError::InvalidFilter(e.to_string()))
}
