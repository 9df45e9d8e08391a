//! Structural merge of nested records with shared unchanged subtrees
//!
//! Observers detect "did this part change" with `Arc::ptr_eq` instead of a
//! deep comparison, so a merge must hand back the very same `Arc` for every
//! subtree whose content did not change.

use indexmap::IndexMap;
use std::sync::Arc;
use tabula_core::Value;

/// A nested plain record: leaves, keyed records and ordered lists
#[derive(Debug, Clone, PartialEq)]
pub enum Tree {
    Record(IndexMap<String, Arc<Tree>>),
    List(Vec<Arc<Tree>>),
    Leaf(Value),
}

impl Default for Tree {
    fn default() -> Self {
        Tree::Record(IndexMap::new())
    }
}

impl Tree {
    pub fn leaf(value: impl Into<Value>) -> Arc<Tree> {
        Arc::new(Tree::Leaf(value.into()))
    }

    pub fn record<K: Into<String>>(entries: impl IntoIterator<Item = (K, Arc<Tree>)>) -> Arc<Tree> {
        Arc::new(Tree::Record(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn list(items: impl IntoIterator<Item = Arc<Tree>>) -> Arc<Tree> {
        Arc::new(Tree::List(items.into_iter().collect()))
    }

    /// Child of a record by key
    pub fn get(&self, key: &str) -> Option<&Arc<Tree>> {
        match self {
            Tree::Record(map) => map.get(key),
            _ => None,
        }
    }

    /// Leaf value at a dotted path of record keys
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut node = self;
        for key in path.split('.') {
            node = node.get(key)?;
        }
        match node {
            Tree::Leaf(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Tree::Leaf(v) => Some(v),
            _ => None,
        }
    }

    /// Top-level leaf entries of a record, in order
    pub fn leaf_entries(&self) -> Vec<(&str, &Value)> {
        match self {
            Tree::Record(map) => map
                .iter()
                .filter_map(|(k, v)| v.as_value().map(|v| (k.as_str(), v)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<serde_json::Value> for Tree {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Object(map) => Tree::Record(
                map.into_iter()
                    .map(|(k, v)| (k, Arc::new(Tree::from(v))))
                    .collect(),
            ),
            serde_json::Value::Array(items) => {
                Tree::List(items.into_iter().map(|v| Arc::new(Tree::from(v))).collect())
            }
            leaf => Tree::Leaf(Value::from(leaf)),
        }
    }
}

/// Merge `source` into `target`.
///
/// Records merge key by key and keep target keys absent from `source`;
/// lists merge index by index in order. Any node whose merged content equals
/// the target's is returned as the target's own `Arc`. Changed nodes are
/// shallow copies that share every unchanged child.
pub fn structural_merge(target: Option<&Arc<Tree>>, source: &Arc<Tree>) -> Arc<Tree> {
    let Some(target) = target else {
        return source.clone();
    };
    if Arc::ptr_eq(target, source) {
        return target.clone();
    }

    match (target.as_ref(), source.as_ref()) {
        (Tree::Record(t), Tree::Record(s)) => {
            let mut changes: Vec<(&String, Arc<Tree>)> = Vec::new();
            for (key, src) in s {
                let current = t.get(key);
                let merged = structural_merge(current, src);
                if current.is_none_or(|c| !Arc::ptr_eq(c, &merged)) {
                    changes.push((key, merged));
                }
            }
            if changes.is_empty() {
                return target.clone();
            }
            let mut next = t.clone();
            for (key, value) in changes {
                next.insert(key.clone(), value);
            }
            Arc::new(Tree::Record(next))
        }
        (Tree::List(t), Tree::List(s)) => {
            let mut changes: Vec<(usize, Arc<Tree>)> = Vec::new();
            for (idx, src) in s.iter().enumerate() {
                let current = t.get(idx);
                let merged = structural_merge(current, src);
                if current.is_none_or(|c| !Arc::ptr_eq(c, &merged)) {
                    changes.push((idx, merged));
                }
            }
            if changes.is_empty() {
                return target.clone();
            }
            let mut next = t.clone();
            for (idx, value) in changes {
                if idx < next.len() {
                    next[idx] = value;
                } else {
                    next.push(value);
                }
            }
            Arc::new(Tree::List(next))
        }
        (t, s) if t == s => target.clone(),
        _ => source.clone(),
    }
}
