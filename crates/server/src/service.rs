//! The versioned document store.
//!
//! Every mutation follows the same discipline: load the row, compare its
//! version with the caller's, build the new snapshot, then commit it with a
//! compare-and-swap against that same version. Only after the swap
//! succeeded is the new version published to the notifier.

use std::sync::Arc;

use deckscribe_json_patch::{apply_patch, ApplyOptions, Patch};
use deckscribe_protocol::{DocumentId, Version, VersionedSnapshot};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::ServiceError;
use crate::notifier::Notifier;
use crate::store::{CasOutcome, Document, SnapshotStore};

/// Snapshot given to newly created decks.
pub fn default_deck_snapshot() -> Value {
    json!({
        "cardDPI": 300,
        "cardWidth": 2.5,
        "cardHeight": 3.5,
        "scriptText": "",
        "imagePrefix": "/",
        "files": {},
        "dataFilePath": "",
        "googleSheetsUrl": "",
        "googleSheetsSheet": "",
        "googleSheetsDestination": ""
    })
}

pub struct DocumentService {
    store: Arc<dyn SnapshotStore>,
    notifier: Arc<Notifier>,
}

impl DocumentService {
    pub fn new(store: Arc<dyn SnapshotStore>, notifier: Arc<Notifier>) -> Self {
        Self { store, notifier }
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    fn load(&self, id: DocumentId) -> Result<Document, ServiceError> {
        self.store.load(id)?.ok_or(ServiceError::NotFound(id))
    }

    pub fn create(&self, name: &str) -> Result<DocumentId, ServiceError> {
        self.create_with(name, default_deck_snapshot())
    }

    pub fn create_with(&self, name: &str, snapshot: Value) -> Result<DocumentId, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::BadRequest("name must not be empty".into()));
        }
        let doc = self.store.insert(name, snapshot)?;
        info!(document_id = %doc.id, name, "document created");
        Ok(doc.id)
    }

    pub fn exists(&self, id: DocumentId) -> Result<bool, ServiceError> {
        Ok(self.store.version(id)?.is_some())
    }

    pub fn read(&self, id: DocumentId) -> Result<VersionedSnapshot, ServiceError> {
        let doc = self.load(id)?;
        Ok(VersionedSnapshot::new(doc.version, doc.snapshot))
    }

    pub fn version(&self, id: DocumentId) -> Result<Version, ServiceError> {
        self.store.version(id)?.ok_or(ServiceError::NotFound(id))
    }

    pub fn name(&self, id: DocumentId) -> Result<String, ServiceError> {
        Ok(self.load(id)?.name)
    }

    pub fn rename(&self, id: DocumentId, name: &str) -> Result<(), ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::BadRequest("name must not be empty".into()));
        }
        self.store.rename(id, name)?;
        Ok(())
    }

    /// Applies `patch` to the document if it is still at `expected`.
    pub fn apply_patch(
        &self,
        id: DocumentId,
        expected: Version,
        patch: &Patch,
    ) -> Result<VersionedSnapshot, ServiceError> {
        let doc = self.load(id)?;
        check_version(id, expected, doc.version)?;

        let mut snapshot = doc.snapshot;
        if let Err(err) = apply_patch(&mut snapshot, patch, &ApplyOptions::strict()) {
            warn!(document_id = %id, %expected, error = %err, "patch does not apply to current snapshot");
            return Err(err.into());
        }

        let version = self.commit(id, expected, snapshot.clone())?;
        Ok(VersionedSnapshot::new(version, snapshot))
    }

    /// Overwrites the snapshot if the document is still at `expected`.
    pub fn replace(&self, id: DocumentId, expected: Version, snapshot: Value) -> Result<Version, ServiceError> {
        let current = self.version(id)?;
        check_version(id, expected, current)?;
        self.commit(id, expected, snapshot)
    }

    fn commit(&self, id: DocumentId, expected: Version, snapshot: Value) -> Result<Version, ServiceError> {
        match self.store.compare_and_swap(id, expected, snapshot)? {
            CasOutcome::Swapped(version) => {
                info!(document_id = %id, %version, "document committed");
                self.notifier.publish(id, version);
                Ok(version)
            }
            CasOutcome::Conflict { current } => {
                debug!(document_id = %id, %expected, %current, "lost commit race");
                Err(ServiceError::VersionConflict { expected, current })
            }
        }
    }
}

fn check_version(id: DocumentId, expected: Version, current: Version) -> Result<(), ServiceError> {
    if expected == current {
        return Ok(());
    }
    debug!(document_id = %id, %expected, %current, "version conflict");
    Err(ServiceError::VersionConflict { expected, current })
}
