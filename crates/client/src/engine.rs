//! The client sync engine.
//!
//! One task owns the [`SyncState`] of a document and is the only place that
//! talks to the document endpoints for it. Everything else goes through a
//! [`SyncHandle`], whose commands are queued and handled one at a time. At
//! most one patch is in flight: hints and edits that arrive while a
//! submission is pending wait in the queue until it settles.
//!
//! ```text
//! Uninitialized --read--> Synced --edit--> DirtyPending --debounce--> Submitting
//!                           ^                                            |
//!                           +------------- ok ---------------------------+
//!                           +-- ConflictRefetching <-- 409 / 422 --------+
//! ```

use std::sync::Arc;

use deckscribe_protocol::{DocumentId, Version, VersionedSnapshot};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::api::DocumentApi;
use crate::config::ClientConfig;
use crate::error::{ApiError, SyncError};
use crate::state::{ReceiveOutcome, SyncState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Synced,
    DirtyPending,
    Submitting,
    ConflictRefetching,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    pub phase: Phase,
    pub version: Option<Version>,
    /// Last hard error. Cleared by the next successful read.
    pub error: Option<SyncError>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self { phase: Phase::Uninitialized, version: None, error: None }
    }
}

type Edit = Box<dyn FnOnce(&mut SyncState) -> Result<(), SyncError> + Send>;

enum Command {
    Edit(Edit, oneshot::Sender<Result<(), SyncError>>),
    RefetchHint(Version),
    Connected,
    Working(oneshot::Sender<Option<VersionedSnapshot>>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle to a running [`SyncEngine`].
#[derive(Clone)]
pub struct SyncHandle {
    document_id: DocumentId,
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SyncStatus>,
}

impl SyncHandle {
    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub fn status(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.commands.is_closed()
    }

    /// A refetch hint from the collaboration channel.
    pub fn refetch_hint(&self, version: Version) {
        let _ = self.commands.send(Command::RefetchHint(version));
    }

    /// The collaboration channel is (re)connected.
    pub fn connected(&self) {
        let _ = self.commands.send(Command::Connected);
    }

    async fn edit<F>(&self, edit: F) -> Result<(), SyncError>
    where
        F: FnOnce(&mut SyncState) -> Result<(), SyncError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Edit(Box::new(edit), tx))
            .map_err(|_| SyncError::Stopped)?;
        rx.await.map_err(|_| SyncError::Stopped)?
    }

    pub async fn set_field(&self, field: impl Into<String>, value: Value) -> Result<(), SyncError> {
        let field = field.into();
        self.edit(move |state| state.set_field(&field, value)).await
    }

    pub async fn set_path(&self, pointer: impl Into<String>, value: Value) -> Result<(), SyncError> {
        let pointer = pointer.into();
        self.edit(move |state| state.set_path(&pointer, value)).await
    }

    pub async fn set_working(&self, snapshot: Value) -> Result<(), SyncError> {
        self.edit(move |state| state.set_working(snapshot)).await
    }

    pub async fn update_entries(
        &self,
        field: impl Into<String>,
        entries: Vec<(String, Value)>,
    ) -> Result<(), SyncError> {
        let field = field.into();
        self.edit(move |state| state.update_entries(&field, entries)).await
    }

    /// The working snapshot and the version it is based on.
    pub async fn working(&self) -> Result<Option<VersionedSnapshot>, SyncError> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(Command::Working(tx)).map_err(|_| SyncError::Stopped)?;
        rx.await.map_err(|_| SyncError::Stopped)
    }

    /// Stops the engine and forgets the document. Pending edits that were
    /// not submitted yet are discarded.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

pub struct SyncEngine<A> {
    api: Arc<A>,
    document_id: DocumentId,
    config: ClientConfig,
    state: SyncState,
    deadline: Option<Instant>,
    /// When to retry a read that failed on the transport.
    refetch_at: Option<Instant>,
    read_failures: u32,
    /// The next read must replay local edits even at the same version,
    /// because the server rejected them as not applicable.
    force_rebase: bool,
    status: watch::Sender<SyncStatus>,
}

impl<A: DocumentApi> SyncEngine<A> {
    /// Starts the engine task on the current runtime. The document is read
    /// on the first [`SyncHandle::connected`] or refetch hint.
    pub fn spawn(api: Arc<A>, document_id: DocumentId, config: &ClientConfig) -> SyncHandle {
        let (commands, rx) = mpsc::unbounded_channel();
        let (status, status_rx) = watch::channel(SyncStatus::default());
        let engine = SyncEngine {
            api,
            document_id,
            config: config.clone(),
            state: SyncState::new(),
            deadline: None,
            refetch_at: None,
            read_failures: 0,
            force_rebase: false,
            status,
        };
        tokio::spawn(engine.run(rx));
        SyncHandle { document_id, commands, status: status_rx }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut ack = None;
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    None => break,
                    Some(Command::Shutdown(tx)) => {
                        ack = Some(tx);
                        break;
                    }
                    Some(command) => self.handle(command).await,
                },
                _ = wait_until(self.deadline) => {
                    self.deadline = None;
                    self.submit().await;
                }
                _ = wait_until(self.refetch_at) => {
                    self.refetch_at = None;
                    self.refresh().await;
                }
            }
        }

        drop(commands);
        self.state.clear();
        self.status.send_replace(SyncStatus::default());
        debug!(document_id = %self.document_id, "sync engine stopped");
        if let Some(tx) = ack {
            let _ = tx.send(());
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Edit(edit, reply) => {
                let result = edit(&mut self.state);
                if result.is_ok() {
                    self.arm_debounce();
                    self.settle();
                }
                let _ = reply.send(result);
            }
            Command::RefetchHint(version) => {
                if self.state.version().is_some_and(|tracked| version <= tracked) {
                    debug!(document_id = %self.document_id, %version, "refetch hint already applied");
                    return;
                }
                self.refresh().await;
            }
            Command::Connected => self.refresh().await,
            Command::Working(reply) => {
                let working = self
                    .state
                    .version()
                    .zip(self.state.working().cloned())
                    .map(|(version, snapshot)| VersionedSnapshot::new(version, snapshot));
                let _ = reply.send(working);
            }
            Command::Shutdown(_) => {}
        }
    }

    /// Restarts the quiet period after a local change.
    fn arm_debounce(&mut self) {
        self.deadline = Some(Instant::now() + self.config.debounce());
    }

    fn set_phase(&self, phase: Phase) {
        let version = self.state.version();
        self.status.send_modify(|status| {
            status.phase = phase;
            status.version = version;
        });
    }

    /// Publishes the resting phase implied by the state.
    fn settle(&self) {
        let phase = if !self.state.is_initialized() {
            Phase::Uninitialized
        } else if self.state.is_dirty() {
            Phase::DirtyPending
        } else {
            Phase::Synced
        };
        self.set_phase(phase);
    }

    fn fail(&mut self, error: SyncError) {
        warn!(document_id = %self.document_id, %error, "sync stopped making progress");
        self.deadline = None;
        self.refetch_at = None;
        self.status.send_modify(|status| status.error = Some(error));
        self.settle();
    }

    async fn read(&mut self) -> Option<VersionedSnapshot> {
        match self.api.read(self.document_id).await {
            Ok(remote) => {
                self.read_failures = 0;
                self.refetch_at = None;
                self.status.send_modify(|status| status.error = None);
                Some(remote)
            }
            Err(ApiError::NotFound) => {
                self.fail(SyncError::NotFound);
                None
            }
            Err(err) => {
                let delay = self.config.reconnect_delay(self.read_failures);
                self.read_failures = self.read_failures.saturating_add(1);
                self.refetch_at = Some(Instant::now() + delay);
                warn!(
                    document_id = %self.document_id,
                    error = %err,
                    retry_in_ms = delay.as_millis() as u64,
                    "read failed"
                );
                None
            }
        }
    }

    /// Reads the document and folds it into the state. A failed read is
    /// retried after a backoff delay.
    async fn refresh(&mut self) {
        let Some(remote) = self.read().await else {
            self.settle();
            return;
        };
        if std::mem::take(&mut self.force_rebase) {
            if let Err(err) = self.state.rebase_onto(remote) {
                warn!(document_id = %self.document_id, error = %err, "rebase failed");
            }
        } else if matches!(self.state.receive(remote), ReceiveOutcome::Adopted) {
            info!(document_id = %self.document_id, version = ?self.state.version(), "document loaded");
        }
        self.after_rebase();
    }

    fn after_rebase(&mut self) {
        if self.state.is_dirty() && self.deadline.is_none() {
            self.arm_debounce();
        }
        self.settle();
    }

    async fn submit(&mut self) {
        // the baseline is stale until the pending read succeeds
        if self.refetch_at.is_some() {
            self.refresh().await;
            return;
        }
        let pending = match self.state.begin_submit() {
            Ok(Some(pending)) => pending,
            Ok(None) | Err(_) => {
                self.settle();
                return;
            }
        };

        self.set_phase(Phase::Submitting);
        debug!(document_id = %self.document_id, expected = %pending.expected, ops = pending.patch.len(), "submitting patch");

        match self.api.apply_patch(self.document_id, pending.expected, &pending.patch).await {
            Ok(result) => {
                let version = result.version;
                if let Err(err) = self.state.confirm_submit(result) {
                    warn!(document_id = %self.document_id, error = %err, "could not confirm submission");
                }
                info!(document_id = %self.document_id, %version, "patch committed");
                self.after_rebase();
            }
            Err(ApiError::VersionConflict) => {
                debug!(document_id = %self.document_id, expected = %pending.expected, "version conflict, refetching");
                self.state.abort_submit();
                self.set_phase(Phase::ConflictRefetching);
                self.refresh().await;
            }
            Err(ApiError::PatchApply(reason)) => {
                warn!(document_id = %self.document_id, expected = %pending.expected, %reason, "patch rejected, rebasing");
                self.state.abort_submit();
                self.set_phase(Phase::ConflictRefetching);
                self.force_rebase = true;
                self.refresh().await;
            }
            Err(ApiError::Transport(reason)) => {
                warn!(document_id = %self.document_id, %reason, "submission failed, retrying");
                self.state.abort_submit();
                self.arm_debounce();
                self.settle();
            }
            Err(ApiError::NotFound) => {
                self.state.abort_submit();
                self.fail(SyncError::NotFound);
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
