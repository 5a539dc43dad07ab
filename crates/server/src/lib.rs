//! Server side of deck synchronization.
//!
//! - [`store`]: the snapshot store collaborator and its in-memory backend.
//! - [`service`]: the versioned document store (read, compare-and-apply).
//! - [`notifier`]: per-document refetch-hint fan-out.
//! - [`http`] and [`ws`]: the axum endpoints.

pub mod config;
pub mod error;
pub mod http;
pub mod notifier;
pub mod service;
pub mod store;
pub mod ws;

use std::sync::Arc;

pub use config::ServerConfig;
pub use error::ServiceError;
pub use notifier::{Notifier, Subscription};
pub use service::DocumentService;
pub use store::{MemoryStore, SnapshotStore};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DocumentService>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(service: Arc<DocumentService>, config: ServerConfig) -> Self {
        Self { service, config: Arc::new(config) }
    }

    /// State backed by a fresh [`MemoryStore`].
    pub fn in_memory(config: ServerConfig) -> Self {
        let service = DocumentService::new(Arc::new(MemoryStore::new()), Arc::new(Notifier::new()));
        Self::new(Arc::new(service), config)
    }
}
