//! Persistence contract for save nodes.
//!
//! The engine never owns storage. Callers hand it the result of `get_all` and
//! write back whatever it admits.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::{RecordId, SaveNode, TreeId};

/// Errors reported by a persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(RecordId),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A key-value record store for save nodes, keyed by record id.
///
/// Only per-call atomicity is assumed.
pub trait SaveStore {
    fn get_all(&self) -> Result<Vec<SaveNode>, StoreError>;

    /// Insert or replace a record.
    fn put(&mut self, node: SaveNode) -> Result<(), StoreError>;

    fn put_many(&mut self, nodes: Vec<SaveNode>) -> Result<(), StoreError> {
        for node in nodes {
            self.put(node)?;
        }
        Ok(())
    }

    fn delete(&mut self, record_id: &RecordId) -> Result<(), StoreError>;

    fn delete_many(&mut self, record_ids: &[RecordId]) -> Result<(), StoreError> {
        for id in record_ids {
            self.delete(id)?;
        }
        Ok(())
    }

    /// Remove every node of a worldline. Returns how many were removed.
    fn delete_tree(&mut self, tree_id: &TreeId) -> Result<usize, StoreError> {
        let ids: Vec<RecordId> = self
            .get_all()?
            .into_iter()
            .filter(|n| &n.tree_id == tree_id)
            .map(|n| n.record_id)
            .collect();
        self.delete_many(&ids)?;
        Ok(ids.len())
    }
}

/// In-memory store, ordered by record id.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: BTreeMap<RecordId, SaveNode>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, record_id: &RecordId) -> Option<&SaveNode> {
        self.records.get(record_id)
    }

    pub fn get_mut(&mut self, record_id: &RecordId) -> Option<&mut SaveNode> {
        self.records.get_mut(record_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SaveStore for MemoryStore {
    fn get_all(&self) -> Result<Vec<SaveNode>, StoreError> {
        Ok(self.records.values().cloned().collect())
    }

    fn put(&mut self, node: SaveNode) -> Result<(), StoreError> {
        self.records.insert(node.record_id.clone(), node);
        Ok(())
    }

    fn delete(&mut self, record_id: &RecordId) -> Result<(), StoreError> {
        self.records
            .remove(record_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(record_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get_all() {
        let mut store = MemoryStore::new();
        store
            .put_many(vec![
                SaveNode::with_record_id("a", "t"),
                SaveNode::with_record_id("b", "t"),
            ])
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get_all().unwrap().len(), 2);
    }

    #[test]
    fn test_put_replaces_same_record() {
        let mut store = MemoryStore::new();
        store.put(SaveNode::with_record_id("a", "t")).unwrap();
        store
            .put(SaveNode::with_record_id("a", "t").with_label("renamed"))
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(&RecordId::new("a")).unwrap().label.as_deref(),
            Some("renamed")
        );
    }

    #[test]
    fn test_delete_missing_record() {
        let mut store = MemoryStore::new();
        let err = store.delete(&RecordId::new("nope")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_delete_tree_removes_every_node() {
        let mut store = MemoryStore::new();
        store
            .put_many(vec![
                SaveNode::with_record_id("a", "doomed"),
                SaveNode::with_record_id("b", "doomed"),
                SaveNode::with_record_id("c", "kept"),
            ])
            .unwrap();

        let removed = store.delete_tree(&TreeId::new("doomed")).unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(&RecordId::new("c")).is_some());
    }
}
