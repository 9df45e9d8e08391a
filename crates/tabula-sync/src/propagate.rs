//! Selection and highlight synchronisation between related tables

use crate::registry::TableRegistry;
use tabula_core::{EngineConfig, Result, Value};
use tabula_table::text::quote_column_name;
use tabula_table::{SelectionSet, TableModel, find_loaded_index};

/// Two tables whose rows correspond through identity columns, such as a raw
/// table and a phase-folded table derived from it.
///
/// A value of `derived_column` in the derived table is the logical index of
/// the corresponding source row, which the source also carries in
/// `source_column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityLink {
    pub source_tbl: String,
    pub source_column: String,
    pub derived_tbl: String,
    pub derived_column: String,
}

impl IdentityLink {
    pub fn new(
        source_tbl: impl Into<String>,
        source_column: impl Into<String>,
        derived_tbl: impl Into<String>,
        derived_column: impl Into<String>,
    ) -> Self {
        Self {
            source_tbl: source_tbl.into(),
            source_column: source_column.into(),
            derived_tbl: derived_tbl.into(),
            derived_column: derived_column.into(),
        }
    }

    pub fn involves(&self, tbl_id: &str) -> bool {
        self.source_tbl == tbl_id || self.derived_tbl == tbl_id
    }

    /// `(other table, identity column in tbl_id, identity column in other)`
    pub fn counterpart(&self, tbl_id: &str) -> Option<(&str, &str, &str)> {
        if tbl_id == self.source_tbl {
            Some((&self.derived_tbl, &self.source_column, &self.derived_column))
        } else if tbl_id == self.derived_tbl {
            Some((&self.source_tbl, &self.derived_column, &self.source_column))
        } else {
            None
        }
    }
}

/// Selection state to carry from a derived table to its source
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionUpdate {
    /// The derived table has no identity column and maps one-for-one
    Verbatim(SelectionSet),
    /// `(source logical index, selected)` for each loaded derived row
    Rows(Vec<(u64, bool)>),
}

/// Read the selection of every loaded row of `derived` keyed by its identity
pub fn selection_updates(derived: &TableModel, identity_column: &str) -> SelectionUpdate {
    let Some(col) = derived.column_index(identity_column) else {
        return SelectionUpdate::Verbatim(derived.selection.clone());
    };
    let start = derived.page_start();
    let rows = derived
        .rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let identity = identity_of(row.get(col)?)?;
            Some((identity, derived.selection.contains_logical(start + i as u64)))
        })
        .collect();
    SelectionUpdate::Rows(rows)
}

/// Apply an update to `target`, returning the number of rows it touched
pub fn apply_selection_update(target: &mut SelectionSet, update: SelectionUpdate) -> u64 {
    match update {
        SelectionUpdate::Verbatim(selection) => {
            let (row_count, offset) = (target.row_count(), target.offset());
            *target = selection;
            target.resize(row_count);
            target.set_offset(offset);
            row_count
        }
        SelectionUpdate::Rows(rows) => {
            let mut touched = 0;
            for (idx, selected) in rows {
                if idx >= target.row_count() {
                    tracing::debug!(
                        idx,
                        row_count = target.row_count(),
                        "identity outside the source table"
                    );
                    continue;
                }
                target.set_row(idx as i64 - target.offset(), selected);
                touched += 1;
            }
            touched
        }
    }
}

/// Copy the selection of `derived`'s loaded rows onto `source`.
///
/// Work is proportional to the rows loaded in `derived`, never to the size
/// of `source`.
pub fn propagate_selection(
    derived: &TableModel,
    identity_column: &str,
    source: &mut SelectionSet,
) -> u64 {
    apply_selection_update(source, selection_updates(derived, identity_column))
}

/// The reverse of [`propagate_selection`]: refresh the loaded rows of
/// `derived` from `source`
pub fn pull_selection(
    derived: &mut TableModel,
    identity_column: &str,
    source: &SelectionSet,
) -> u64 {
    let Some(col) = derived.column_index(identity_column) else {
        return apply_selection_update(
            &mut derived.selection,
            SelectionUpdate::Verbatim(source.clone()),
        );
    };
    let start = derived.page_start();
    let updates: Vec<(u64, bool)> = derived
        .rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let identity = identity_of(row.get(col)?)?;
            (identity < source.row_count())
                .then(|| (start + i as u64, source.contains_logical(identity)))
        })
        .collect();
    apply_selection_update(&mut derived.selection, SelectionUpdate::Rows(updates))
}

fn identity_of(value: &Value) -> Option<u64> {
    u64::try_from(value.as_i64()?).ok()
}

/// Where a highlight in one linked table should move the other
#[derive(Debug, Clone, PartialEq)]
pub enum HighlightSync {
    /// The matching row is loaded in `tbl_id` at logical `index`
    Found { tbl_id: String, index: u64 },
    /// `tbl_id` is partially loaded; the row has to be looked up with `filter`
    Lookup { tbl_id: String, filter: String },
    Unresolved,
}

/// Find the row of the other linked table that matches the highlighted row
/// of `tbl_id`
pub fn highlight_target(
    registry: &TableRegistry,
    link: &IdentityLink,
    tbl_id: &str,
    config: &EngineConfig,
) -> Result<HighlightSync> {
    let Some((other_id, own_column, other_column)) = link.counterpart(tbl_id) else {
        return Ok(HighlightSync::Unresolved);
    };
    let table = registry.require(tbl_id)?;
    let Some(value) = table
        .cell_value(table.highlighted_row.max(0) as u64, own_column)
        .filter(|v| !v.is_absent())
    else {
        return Ok(HighlightSync::Unresolved);
    };
    let Some(other) = registry.get(other_id) else {
        return Ok(HighlightSync::Unresolved);
    };

    let literal = match value {
        Value::Text(s) => format!("'{s}'"),
        other => other.to_string(),
    };
    let filter = format!("{} = {}", quote_column_name(other_column), literal);

    if let Some(index) = find_loaded_index(other, &filter, config)? {
        return Ok(HighlightSync::Found {
            tbl_id: other_id.to_string(),
            index,
        });
    }
    if other.is_fully_loaded() {
        return Ok(HighlightSync::Unresolved);
    }
    Ok(HighlightSync::Lookup {
        tbl_id: other_id.to_string(),
        filter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabula_core::ColumnDescriptor;

    fn raw_table(rows: i64) -> TableModel {
        TableModel::new(
            "raw",
            vec![ColumnDescriptor::int("ROWID"), ColumnDescriptor::float("flux")],
            (0..rows)
                .map(|i| vec![Value::from(i), Value::from(i as f64 * 1.5)])
                .collect(),
        )
    }

    /// Rows of the raw table in a different order, tagged with RAW_ROWID
    fn folded_table(order: &[i64]) -> TableModel {
        TableModel::new(
            "folded",
            vec![ColumnDescriptor::int("RAW_ROWID"), ColumnDescriptor::float("phase")],
            order
                .iter()
                .enumerate()
                .map(|(i, &raw)| vec![Value::from(raw), Value::from(i as f64 / 10.0)])
                .collect(),
        )
    }

    fn link() -> IdentityLink {
        IdentityLink::new("raw", "ROWID", "folded", "RAW_ROWID")
    }

    #[test]
    fn test_propagate_through_identity() {
        let mut folded = folded_table(&[4, 2, 0]);
        folded.selection.set_row(0, true);
        folded.selection.set_row(2, true);
        let mut source = SelectionSet::new(5);
        source.set_row(2, true);

        let touched = propagate_selection(&folded, "RAW_ROWID", &mut source);

        assert_eq!(touched, 3);
        assert_eq!(source.all_selected_indices(), vec![0, 4]);
    }

    #[test]
    fn test_propagate_only_touches_loaded_rows() {
        let mut page = folded_table(&[3, 1]);
        page.request.start_idx = 10;
        page.total_rows = 20;
        page.selection = SelectionSet::new(20);
        page.selection.set_all(true);
        let mut source = SelectionSet::new(1_000_000);

        let touched = propagate_selection(&page, "RAW_ROWID", &mut source);

        assert_eq!(touched, 2);
        assert_eq!(source.all_selected_indices(), vec![1, 3]);
    }

    #[test]
    fn test_propagate_without_identity_is_verbatim() {
        let mut derived = raw_table(4);
        derived.selection.set_all(true);
        derived.selection.set_row(1, false);
        let mut source = SelectionSet::new(4);

        propagate_selection(&derived, "RAW_ROWID", &mut source);
        assert_eq!(source.all_selected_indices(), vec![0, 2, 3]);
    }

    #[test]
    fn test_out_of_range_identity_is_skipped() {
        let mut folded = folded_table(&[9, 1]);
        folded.selection.set_all(true);
        let mut source = SelectionSet::new(5);

        assert_eq!(propagate_selection(&folded, "RAW_ROWID", &mut source), 1);
        assert_eq!(source.all_selected_indices(), vec![1]);
    }

    #[test]
    fn test_pull_selection() {
        let mut folded = folded_table(&[4, 2, 0]);
        let mut source = SelectionSet::new(5);
        source.set_row(0, true);
        source.set_row(4, true);

        pull_selection(&mut folded, "RAW_ROWID", &source);
        assert_eq!(folded.selection.all_selected_indices(), vec![0, 2]);
    }

    #[test]
    fn test_counterpart() {
        let link = link();
        assert_eq!(link.counterpart("raw"), Some(("folded", "ROWID", "RAW_ROWID")));
        assert_eq!(link.counterpart("folded"), Some(("raw", "RAW_ROWID", "ROWID")));
        assert_eq!(link.counterpart("other"), None);
        assert!(link.involves("raw"));
    }

    #[test]
    fn test_highlight_found_in_loaded_rows() {
        let config = EngineConfig::default();
        let mut registry = TableRegistry::new();
        let mut folded = folded_table(&[4, 2, 0]);
        folded.set_highlighted_row(1);
        registry.insert(raw_table(5));
        registry.insert(folded);

        let target = highlight_target(&registry, &link(), "folded", &config).unwrap();
        assert_eq!(
            target,
            HighlightSync::Found {
                tbl_id: "raw".into(),
                index: 2
            }
        );

        registry.get_mut("raw").unwrap().set_highlighted_row(4);
        let back = highlight_target(&registry, &link(), "raw", &config).unwrap();
        assert_eq!(
            back,
            HighlightSync::Found {
                tbl_id: "folded".into(),
                index: 0
            }
        );
    }

    #[test]
    fn test_highlight_needs_lookup_on_partial_table() {
        let config = EngineConfig::default();
        let mut registry = TableRegistry::new();
        let mut raw = raw_table(3);
        raw.total_rows = 50;
        registry.insert(raw);
        let mut folded = folded_table(&[40]);
        folded.set_highlighted_row(0);
        registry.insert(folded);

        let target = highlight_target(&registry, &link(), "folded", &config).unwrap();
        assert_eq!(
            target,
            HighlightSync::Lookup {
                tbl_id: "raw".into(),
                filter: "ROWID = 40".into()
            }
        );
    }

    #[test]
    fn test_highlight_unresolved() {
        let config = EngineConfig::default();
        let mut registry = TableRegistry::new();
        registry.insert(raw_table(3));
        registry.insert(folded_table(&[7]));

        let target = highlight_target(&registry, &link(), "folded", &config).unwrap();
        assert_eq!(target, HighlightSync::Unresolved);
        assert!(highlight_target(&registry, &link(), "missing", &config)
            .is_ok_and(|t| t == HighlightSync::Unresolved));
    }
}
