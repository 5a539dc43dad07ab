//! Client side of deck synchronization.
//!
//! A [`SyncEngine`] keeps a local working copy of one document and sends
//! the local change as a JSON Patch after a quiet period. A
//! [`SubscriptionSession`] listens for refetch hints and forwards them to
//! the engine.
//!
//! ```no_run
//! use std::sync::Arc;
//! use deckscribe_client::{ClientConfig, HttpApi, SubscriptionSession, SyncEngine};
//! use deckscribe_protocol::DocumentId;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("http://127.0.0.1:5080");
//! let api = Arc::new(HttpApi::new(config.clone())?);
//! let handle = SyncEngine::spawn(api, DocumentId(1), &config);
//! let session = SubscriptionSession::spawn(&config, DocumentId(1), handle.clone());
//!
//! handle.set_field("scriptText", serde_json::json!("card()")).await?;
//! # session.close().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod session;
pub mod state;

pub use api::{DocumentApi, HttpApi};
pub use config::ClientConfig;
pub use engine::{Phase, SyncEngine, SyncHandle, SyncStatus};
pub use error::{ApiError, SyncError};
pub use session::{SessionState, SubscriptionSession};
pub use state::{PendingSubmit, RebaseReport, ReceiveOutcome, SyncState};
