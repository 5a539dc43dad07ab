//! The snapshot store collaborator.
//!
//! The store persists one row per document and offers a single mutation
//! primitive, [`SnapshotStore::compare_and_swap`]. Nothing else writes a
//! document's version or snapshot.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use deckscribe_protocol::{DocumentId, Version};
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    pub version: Version,
    pub snapshot: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The snapshot was stored under this new version.
    Swapped(Version),
    /// Another writer got there first; nothing was written.
    Conflict { current: Version },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document {0} not found")]
    NotFound(DocumentId),
    #[error("a document named {0:?} already exists")]
    NameTaken(String),
    #[error("storage backend: {0}")]
    Backend(String),
}

/// A transactional key/row store for document snapshots.
pub trait SnapshotStore: Send + Sync + 'static {
    /// Creates a document at [`Version::INITIAL`].
    fn insert(&self, name: &str, snapshot: Value) -> Result<Document, StoreError>;

    fn load(&self, id: DocumentId) -> Result<Option<Document>, StoreError>;

    fn version(&self, id: DocumentId) -> Result<Option<Version>, StoreError>;

    /// Stores `snapshot` as `expected + 1` if the row is still at `expected`.
    ///
    /// Concurrent callers with the same `expected` are serialized: exactly
    /// one sees `Swapped`.
    fn compare_and_swap(
        &self,
        id: DocumentId,
        expected: Version,
        snapshot: Value,
    ) -> Result<CasOutcome, StoreError>;

    /// Renames a document. Does not touch its version.
    fn rename(&self, id: DocumentId, name: &str) -> Result<(), StoreError>;
}

// ── In-memory backend ─────────────────────────────────────────────────────

#[derive(Default)]
struct Table {
    rows: HashMap<DocumentId, Document>,
    next_id: u64,
}

impl Table {
    fn name_taken(&self, name: &str, except: Option<DocumentId>) -> bool {
        self.rows.values().any(|doc| doc.name == name && Some(doc.id) != except)
    }
}

/// [`SnapshotStore`] kept in process memory. Every mutation runs under the
/// table's write lock.
#[derive(Default)]
pub struct MemoryStore {
    table: RwLock<Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn insert(&self, name: &str, snapshot: Value) -> Result<Document, StoreError> {
        let mut table = self.table.write();
        if table.name_taken(name, None) {
            return Err(StoreError::NameTaken(name.to_string()));
        }
        table.next_id += 1;
        let now = Utc::now();
        let doc = Document {
            id: DocumentId(table.next_id),
            name: name.to_string(),
            version: Version::INITIAL,
            snapshot,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(doc.id, doc.clone());
        Ok(doc)
    }

    fn load(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        Ok(self.table.read().rows.get(&id).cloned())
    }

    fn version(&self, id: DocumentId) -> Result<Option<Version>, StoreError> {
        Ok(self.table.read().rows.get(&id).map(|doc| doc.version))
    }

    fn compare_and_swap(
        &self,
        id: DocumentId,
        expected: Version,
        snapshot: Value,
    ) -> Result<CasOutcome, StoreError> {
        let mut table = self.table.write();
        let row = table.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if row.version != expected {
            return Ok(CasOutcome::Conflict { current: row.version });
        }
        row.version = expected.next();
        row.snapshot = snapshot;
        row.updated_at = Utc::now();
        Ok(CasOutcome::Swapped(row.version))
    }

    fn rename(&self, id: DocumentId, name: &str) -> Result<(), StoreError> {
        let mut table = self.table.write();
        if table.name_taken(name, Some(id)) {
            return Err(StoreError::NameTaken(name.to_string()));
        }
        let row = table.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        row.name = name.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use serde_json::json;

    #[test]
    fn insert_starts_at_version_one() {
        let store = MemoryStore::new();
        let doc = store.insert("deck", json!({"name": "A"})).unwrap();
        assert_eq!(doc.version, Version(1));
        assert_eq!(store.version(doc.id).unwrap(), Some(Version(1)));
        assert_eq!(store.insert("deck", json!({})), Err(StoreError::NameTaken("deck".into())));
    }

    #[test]
    fn cas_rejects_stale_version() {
        let store = MemoryStore::new();
        let doc = store.insert("deck", json!({"name": "A"})).unwrap();

        let outcome = store.compare_and_swap(doc.id, Version(1), json!({"name": "B"})).unwrap();
        assert_eq!(outcome, CasOutcome::Swapped(Version(2)));

        let outcome = store.compare_and_swap(doc.id, Version(1), json!({"name": "C"})).unwrap();
        assert_eq!(outcome, CasOutcome::Conflict { current: Version(2) });
        assert_eq!(store.load(doc.id).unwrap().unwrap().snapshot, json!({"name": "B"}));
    }

    #[test]
    fn cas_on_missing_document() {
        let store = MemoryStore::new();
        let err = store.compare_and_swap(DocumentId(9), Version(1), json!({})).unwrap_err();
        assert_eq!(err, StoreError::NotFound(DocumentId(9)));
    }

    #[test]
    fn concurrent_cas_has_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let id = store.insert("deck", json!({"n": 0})).unwrap().id;

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.compare_and_swap(id, Version(1), json!({"n": n})).unwrap())
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let winners = outcomes.iter().filter(|o| matches!(o, CasOutcome::Swapped(_))).count();
        assert_eq!(winners, 1);
        assert_eq!(store.version(id).unwrap(), Some(Version(2)));
    }

    #[test]
    fn rename_keeps_names_unique() {
        let store = MemoryStore::new();
        let a = store.insert("a", json!({})).unwrap();
        store.insert("b", json!({})).unwrap();
        assert_eq!(store.rename(a.id, "b"), Err(StoreError::NameTaken("b".into())));
        store.rename(a.id, "a").unwrap();
        store.rename(a.id, "c").unwrap();
        assert_eq!(store.load(a.id).unwrap().unwrap().name, "c");
        assert_eq!(store.load(a.id).unwrap().unwrap().version, Version(1));
    }
}
