//! Tables by id

use indexmap::IndexMap;
use tabula_core::{Result, TabulaError};
use tabula_table::TableModel;
use uuid::Uuid;

/// Every table the engine knows about, in registration order.
///
/// Operations that need to look at another table receive the registry
/// explicitly instead of reaching for global state.
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: IndexMap<String, TableModel>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tbl_id: &str) -> Option<&TableModel> {
        self.tables.get(tbl_id)
    }

    pub fn get_mut(&mut self, tbl_id: &str) -> Option<&mut TableModel> {
        self.tables.get_mut(tbl_id)
    }

    /// Like `get`, but a missing table is an error
    pub fn require(&self, tbl_id: &str) -> Result<&TableModel> {
        self.get(tbl_id)
            .ok_or_else(|| TabulaError::TableNotFound(tbl_id.to_string()))
    }

    /// Register or replace a table, returning the one it replaced
    pub fn insert(&mut self, table: TableModel) -> Option<TableModel> {
        self.tables.insert(table.tbl_id.clone(), table)
    }

    pub fn remove(&mut self, tbl_id: &str) -> Option<TableModel> {
        self.tables.shift_remove(tbl_id)
    }

    pub fn contains(&self, tbl_id: &str) -> bool {
        self.tables.contains_key(tbl_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// A table id that is not registered yet
    pub fn unique_tbl_id(&self) -> String {
        loop {
            let id = format!("tbl_id-{}", Uuid::new_v4().simple());
            if !self.contains(&id) {
                return id;
            }
        }
    }
}
