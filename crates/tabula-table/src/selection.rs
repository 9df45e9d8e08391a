//! Row selection over a logical row space

use roaring::RoaringTreemap;
use serde::{Deserialize, Serialize};

/// Which polarity the exception set has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectMode {
    /// Every row is selected except the exceptions
    All,
    /// No row is selected except the exceptions
    #[default]
    None,
}

/// Selected rows out of `row_count`, stored as a polarity plus exceptions.
///
/// Memory is bounded by the smaller of the selected and unselected sets
/// because `set_all` flips the polarity instead of enumerating rows.
/// Every index passed in is shifted by `offset` first, so a selection keyed
/// to logical rows can be driven with page-local indices.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectionSet {
    mode: SelectMode,
    exceptions: RoaringTreemap,
    row_count: u64,
    #[serde(default)]
    offset: i64,
}

impl SelectionSet {
    /// An empty selection over `row_count` rows
    pub fn new(row_count: u64) -> Self {
        Self {
            mode: SelectMode::None,
            exceptions: RoaringTreemap::new(),
            row_count,
            offset: 0,
        }
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn set_offset(&mut self, offset: i64) {
        self.offset = offset;
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn mode(&self) -> SelectMode {
        self.mode
    }

    pub fn exceptions(&self) -> &RoaringTreemap {
        &self.exceptions
    }

    /// Select or deselect every row
    pub fn set_all(&mut self, selected: bool) {
        self.mode = if selected {
            SelectMode::All
        } else {
            SelectMode::None
        };
        self.exceptions.clear();
    }

    /// Select or deselect one row
    pub fn set_row(&mut self, index: i64, selected: bool) {
        let Some(idx) = self.resolve(index) else {
            return;
        };
        match (self.mode, selected) {
            (SelectMode::All, true) | (SelectMode::None, false) => {
                self.exceptions.remove(idx);
            }
            (SelectMode::All, false) => {
                self.exceptions.insert(idx);
            }
            (SelectMode::None, true) => {
                self.exceptions.insert(idx);
                if self.exceptions.len() == self.row_count {
                    self.set_all(true);
                }
            }
        }
    }

    pub fn is_selected(&self, index: i64) -> bool {
        match self.resolve(index) {
            Some(idx) => self.contains_logical(idx),
            None => false,
        }
    }

    /// Membership for an already-resolved logical index, ignoring `offset`
    pub fn contains_logical(&self, idx: u64) -> bool {
        if idx >= self.row_count {
            return false;
        }
        match self.mode {
            SelectMode::All => !self.exceptions.contains(idx),
            SelectMode::None => self.exceptions.contains(idx),
        }
    }

    pub fn selected_count(&self) -> u64 {
        match self.mode {
            SelectMode::All => self.row_count - self.exceptions.len(),
            SelectMode::None => self.exceptions.len(),
        }
    }

    /// True only when the polarity is select-all with no exceptions
    pub fn is_fully_selected(&self) -> bool {
        self.mode == SelectMode::All && self.exceptions.is_empty()
    }

    /// Materialize the selected logical indices in ascending order.
    ///
    /// In select-all mode this walks the whole row space, so only call it
    /// when `row_count` is bounded.
    pub fn all_selected_indices(&self) -> Vec<u64> {
        match self.mode {
            SelectMode::None => self.exceptions.iter().collect(),
            SelectMode::All => (0..self.row_count)
                .filter(|idx| !self.exceptions.contains(*idx))
                .collect(),
        }
    }

    /// Change the row space, dropping exceptions that fall outside it
    pub fn resize(&mut self, row_count: u64) {
        if row_count < self.row_count {
            self.exceptions.remove_range(row_count..);
        }
        self.row_count = row_count;
    }

    /// Build a selection for a derived row space.
    ///
    /// `source_indices[i]` is the logical index in `self` that derived row `i`
    /// came from. The result keeps this selection's polarity so a
    /// mostly-selected source stays cheap to represent.
    pub fn remapped<I>(&self, source_indices: I, row_count: u64) -> SelectionSet
    where
        I: IntoIterator<Item = u64>,
    {
        let mut remapped = SelectionSet::new(row_count);
        remapped.mode = self.mode;
        for (i, src) in source_indices.into_iter().enumerate() {
            let selected = self.contains_logical(src);
            let exception = match self.mode {
                SelectMode::All => !selected,
                SelectMode::None => selected,
            };
            if exception {
                remapped.exceptions.insert(i as u64);
            }
        }
        remapped
    }

    fn resolve(&self, index: i64) -> Option<u64> {
        let Some(idx) = index.checked_add(self.offset) else {
            tracing::warn!(index, offset = self.offset, "selection index overflows");
            return None;
        };
        let in_range = idx >= 0 && (idx as u64) < self.row_count;
        debug_assert!(
            in_range,
            "selection index {} (offset {}) out of range for {} rows",
            index,
            self.offset,
            self.row_count
        );
        if !in_range {
            tracing::warn!(
                index,
                offset = self.offset,
                row_count = self.row_count,
                "selection index out of range"
            );
            return None;
        }
        Some(idx as u64)
    }
}
