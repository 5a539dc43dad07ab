#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deckscribe_client::{ApiError, DocumentApi, SyncHandle, SyncStatus};
use deckscribe_json_patch::Patch;
use deckscribe_protocol::{DocumentId, HubMessage, Version, VersionedSnapshot};
use deckscribe_server::{DocumentService, MemoryStore, Notifier, ServiceError};
use serde_json::Value;
use tokio::task::JoinHandle;

pub fn service() -> Arc<DocumentService> {
    Arc::new(DocumentService::new(Arc::new(MemoryStore::new()), Arc::new(Notifier::new())))
}

/// [`DocumentApi`] calling a [`DocumentService`] in process, with call
/// counters.
pub struct LocalApi {
    service: Arc<DocumentService>,
    pub reads: AtomicUsize,
    pub patches: AtomicUsize,
    fail_next_patch: AtomicBool,
    fail_next_read: AtomicBool,
}

impl LocalApi {
    pub fn new(service: &Arc<DocumentService>) -> Arc<Self> {
        Arc::new(Self {
            service: Arc::clone(service),
            reads: AtomicUsize::new(0),
            patches: AtomicUsize::new(0),
            fail_next_patch: AtomicBool::new(false),
            fail_next_read: AtomicBool::new(false),
        })
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn patches(&self) -> usize {
        self.patches.load(Ordering::SeqCst)
    }

    /// Makes the next `apply_patch` fail as if the network dropped.
    pub fn fail_next_patch(&self) {
        self.fail_next_patch.store(true, Ordering::SeqCst);
    }

    /// Makes the next `read` fail as if the network dropped.
    pub fn fail_next_read(&self) {
        self.fail_next_read.store(true, Ordering::SeqCst);
    }
}

fn to_api_error(err: ServiceError) -> ApiError {
    match err {
        ServiceError::NotFound(_) => ApiError::NotFound,
        ServiceError::VersionConflict { .. } => ApiError::VersionConflict,
        ServiceError::PatchApply(e) => ApiError::PatchApply(e.to_string()),
        other => ApiError::Transport(other.to_string()),
    }
}

#[async_trait]
impl DocumentApi for LocalApi {
    async fn read(&self, id: DocumentId) -> Result<VersionedSnapshot, ApiError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_read.swap(false, Ordering::SeqCst) {
            return Err(ApiError::Transport("connection reset".into()));
        }
        self.service.read(id).map_err(to_api_error)
    }

    async fn apply_patch(
        &self,
        id: DocumentId,
        expected: Version,
        patch: &Patch,
    ) -> Result<VersionedSnapshot, ApiError> {
        self.patches.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_patch.swap(false, Ordering::SeqCst) {
            return Err(ApiError::Transport("connection reset".into()));
        }
        self.service.apply_patch(id, expected, patch).map_err(to_api_error)
    }

    async fn replace(&self, id: DocumentId, expected: Version, snapshot: &Value) -> Result<Version, ApiError> {
        self.service.replace(id, expected, snapshot.clone()).map_err(to_api_error)
    }
}

/// Forwards the notifier's hints for `id` to `handle`, the way the
/// subscription session does over a socket.
pub fn forward_hints(service: &DocumentService, id: DocumentId, handle: SyncHandle) -> JoinHandle<()> {
    let mut subscription = service.notifier().subscribe(id);
    tokio::spawn(async move {
        while let Some(HubMessage::Refetch { version, .. }) = subscription.recv().await {
            handle.refetch_hint(version);
        }
    })
}

pub async fn wait_for(handle: &SyncHandle, mut pred: impl FnMut(&SyncStatus) -> bool) -> SyncStatus {
    let mut status = handle.status();
    let result = tokio::time::timeout(Duration::from_secs(30), status.wait_for(|s| pred(s))).await;
    let status = result.expect("timed out waiting for sync status").expect("engine stopped").clone();
    status
}
