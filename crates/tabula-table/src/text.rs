//! Splitting and quoting helpers shared by the filter and sort grammars

use crate::filter::is_operator_word;

/// Split on `sep`, ignoring separators inside `quote` pairs.
///
/// A doubled quote inside a quoted run is an escaped quote and does not end it.
pub fn split_outside_quotes(text: &str, sep: char, quote: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    for c in text.chars() {
        if c == quote {
            in_quote = !in_quote;
            current.push(c);
        } else if c == sep && !in_quote {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

/// Split a comma separated list of column names, ignoring commas inside double quotes
pub fn split_cols(names: &str) -> Vec<String> {
    split_outside_quotes(names, ',', '"')
}

/// Split a comma separated list of values, ignoring commas inside single quotes
pub fn split_vals(values: &str) -> Vec<String> {
    split_outside_quotes(values, ',', '\'')
}

/// Split filter text into clauses on `;`, outside single or double quotes
pub(crate) fn split_clauses(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in text.chars() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                current.push(c);
            }
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                current.push(c);
            }
            None if c == ';' => parts.push(std::mem::take(&mut current)),
            None => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Whether a column name can be written without quotes
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Double-quote a column name unless it is a plain identifier.
/// Names spelled like a filter word operator are always quoted.
pub fn quote_column_name(name: &str) -> String {
    if is_plain_identifier(name) && !is_operator_word(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Remove surrounding double quotes from a column name, unescaping doubled quotes
pub fn strip_column_quotes(name: &str) -> String {
    let name = name.trim();
    if name.len() >= 2 && name.starts_with('"') && name.ends_with('"') {
        name[1..name.len() - 1].replace("\"\"", "\"")
    } else {
        name.to_string()
    }
}

/// Remove surrounding single quotes from a literal
pub fn strip_single_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Replace characters outside the printable ASCII range with `¿`
pub fn printable(text: &str) -> String {
    text.chars()
        .map(|c| if ('\x1F'..='\x7F').contains(&c) { c } else { '\u{BF}' })
        .collect()
}
