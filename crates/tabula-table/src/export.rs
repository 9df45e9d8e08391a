//! Fixed-width text renderings of a table page

use crate::model::TableModel;
use crate::text::printable;
use tabula_core::{ColumnDescriptor, ColumnType, Value};

/// Render a cell for display, honoring the column's null string and precision
pub fn format_value(col: &ColumnDescriptor, value: &Value) -> String {
    if value.is_absent() {
        return col.null_string.clone().unwrap_or_default();
    }
    match col.col_type {
        ColumnType::Int => value
            .as_i64()
            .map(|v| v.to_string())
            .unwrap_or_else(|| value.to_string()),
        ColumnType::Float => match (value.as_f64(), col.precision.as_deref()) {
            (Some(v), Some(precision)) => {
                format_precision(v, precision).unwrap_or_else(|| value.to_string())
            }
            _ => value.to_string(),
        },
        _ => value.to_string(),
    }
}

/// Format with an `F<n>`, `E<n>` or `G<n>` precision; `None` if it does not parse
fn format_precision(v: f64, precision: &str) -> Option<String> {
    let precision = precision.trim().to_ascii_uppercase();
    let (kind, digits) = match precision.chars().next()? {
        c @ ('E' | 'F' | 'G') => (c, &precision[1..]),
        _ => ('F', precision.as_str()),
    };
    let n: usize = digits.parse().ok()?;
    match kind {
        'F' => Some(format!("{:.*}", n, v)),
        'E' => Some(format_exponent(v, n)),
        _ if n >= 1 => Some(format_general(v, n)),
        _ => None,
    }
}

/// C-style `%.{n}e`: two-digit signed exponent
fn format_exponent(v: f64, n: usize) -> String {
    let s = format!("{:.*e}", n, v);
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => s,
    }
}

/// C-style `%.{n}g`: `n` significant digits, trailing zeros removed
fn format_general(v: f64, n: usize) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    let sci = format!("{:.*e}", n - 1, v);
    let exp: i32 = sci
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);
    if exp < -4 || exp >= n as i32 {
        let formatted = format_exponent(v, n - 1);
        match formatted.split_once('e') {
            Some((mantissa, rest)) => format!("{}e{}", trim_fraction(mantissa), rest),
            None => formatted,
        }
    } else {
        let decimals = (n as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, v)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn pad_end(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let mut out = text.to_string();
    out.extend(std::iter::repeat_n(' ', width.saturating_sub(len)));
    out
}

/// Display width of each column: the longest of its header texts and its
/// formatted cells on the loaded page
pub fn column_widths(model: &TableModel, use_labels: bool) -> Vec<usize> {
    model
        .columns
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let name = if use_labels { col.display_name() } else { col.name.as_str() };
            let headers = [
                name.chars().count(),
                col.col_type.label().chars().count(),
                col.units.as_deref().map_or(0, |u| u.chars().count()),
                col.null_string.as_deref().map_or(0, |n| n.chars().count()),
            ];
            let cells = model.rows.iter().map(|row| {
                format_value(col, row.get(idx).unwrap_or(&Value::Missing))
                    .chars()
                    .count()
            });
            headers.into_iter().chain(cells).max().unwrap_or(0)
        })
        .collect()
}

fn meta_lines(model: &TableModel) -> Vec<String> {
    model
        .meta
        .leaf_entries()
        .into_iter()
        .map(|(k, v)| format!("\\{} = {}", k, v))
        .collect()
}

fn data_line(row: &[Value], cols: &[(usize, &ColumnDescriptor)], widths: &[usize]) -> String {
    let cells = cols
        .iter()
        .map(|(idx, col)| {
            let text = format_value(col, row.get(*idx).unwrap_or(&Value::Missing));
            printable(&pad_end(&text, widths[*idx]))
        })
        .collect::<Vec<_>>();
    format!(" {} ", cells.join(" "))
}

/// Render the loaded page as a fixed-width IPAC table.
///
/// Metadata lines (`\key = value`) come first, then `|`-delimited name, type,
/// and optional units and null-string header lines, then one line per row
/// prefixed with a space.
pub fn to_ipac(model: &TableModel) -> String {
    let widths = column_widths(model, false);
    let all: Vec<(usize, &ColumnDescriptor)> = model.columns.iter().enumerate().collect();

    let mut lines = meta_lines(model);
    for col in &model.columns {
        if !col.is_visible() {
            lines.push(format!("\\col.{}.Visibility = hidden", col.name));
        }
        if let Some(label) = &col.label {
            lines.push(format!("\\col.{}.Label = {}", col.name, label));
        }
    }
    if !lines.is_empty() {
        lines.push("\\".to_string());
    }

    let header = |text: &dyn Fn(&ColumnDescriptor) -> String| {
        let cells = all
            .iter()
            .map(|(idx, col)| pad_end(&text(col), widths[*idx]))
            .collect::<Vec<_>>();
        format!("|{}|", cells.join("|"))
    };
    lines.push(header(&|c| c.name.clone()));
    lines.push(header(&|c| c.col_type.label().to_string()));
    if model.columns.iter().any(|c| c.units.is_some()) {
        lines.push(header(&|c| c.units.clone().unwrap_or_default()));
    }
    if model.columns.iter().any(|c| c.null_string.is_some()) {
        lines.push(header(&|c| c.null_string.clone().unwrap_or_default()));
    }

    lines.extend(model.rows.iter().map(|row| data_line(row, &all, &widths)));
    lines.join("\n")
}

/// Render visible columns as a bordered text table, preferring labels
pub fn to_text_view(model: &TableModel) -> String {
    let widths = column_widths(model, true);
    let visible: Vec<(usize, &ColumnDescriptor)> = model
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_visible())
        .collect();

    let separator = format!(
        "+{}+",
        visible
            .iter()
            .map(|(idx, _)| "-".repeat(widths[*idx]))
            .collect::<Vec<_>>()
            .join("+")
    );
    let names = format!(
        "|{}|",
        visible
            .iter()
            .map(|(idx, c)| pad_end(c.display_name(), widths[*idx]))
            .collect::<Vec<_>>()
            .join("|")
    );
    let types = format!(
        "|{}|",
        visible
            .iter()
            .map(|(idx, c)| pad_end(c.col_type.label(), widths[*idx]))
            .collect::<Vec<_>>()
            .join("|")
    );

    let mut lines = meta_lines(model);
    lines.extend([separator.clone(), names, types, separator]);
    lines.extend(model.rows.iter().map(|row| data_line(row, &visible, &widths)));
    lines.join("\n")
}
