//! Subscription to a document's refetch-hint channel.
//!
//! The session keeps one WebSocket open to `/collab?documentId={id}` and
//! reconnects with capped exponential backoff when it drops. Every time it
//! becomes connected it tells the engine, which reads the document: hints
//! sent while the socket was down are lost, and a read covers them.

use deckscribe_protocol::{DocumentId, HubMessage};
use futures::StreamExt;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::engine::SyncHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
}

pub struct SubscriptionSession {
    state: watch::Receiver<SessionState>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SubscriptionSession {
    pub fn spawn(config: &ClientConfig, document_id: DocumentId, handle: SyncHandle) -> Self {
        let (state_tx, state) = watch::channel(SessionState::Connecting);
        let (stop_tx, stop) = oneshot::channel();
        let task = tokio::spawn(run(config.clone(), document_id, handle, state_tx, stop));
        Self { state, stop: Some(stop_tx), task }
    }

    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Closes the channel and waits for the connection task to finish.
    pub async fn close(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = (&mut self.task).await;
    }
}

enum Ended {
    /// Stop was requested or the engine is gone.
    Stopped,
    /// The socket dropped; try again.
    Lost,
    /// The server does not know the document.
    Gone,
}

async fn run(
    config: ClientConfig,
    document_id: DocumentId,
    handle: SyncHandle,
    state: watch::Sender<SessionState>,
    mut stop: oneshot::Receiver<()>,
) {
    let url = config.ws_url(document_id);
    let mut attempt: u32 = 0;

    loop {
        let ended = tokio::select! {
            _ = &mut stop => Ended::Stopped,
            ended = connect_and_listen(&url, document_id, &handle, &state, &mut attempt) => ended,
        };
        match ended {
            Ended::Stopped | Ended::Gone => break,
            Ended::Lost if handle.is_stopped() => break,
            Ended::Lost => {}
        }

        state.send_replace(SessionState::Reconnecting);
        let delay = config.reconnect_delay(attempt);
        attempt = attempt.saturating_add(1);
        debug!(%document_id, ?delay, attempt, "reconnecting collab channel");
        tokio::select! {
            _ = &mut stop => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    state.send_replace(SessionState::Disconnected);
    info!(%document_id, "collab channel closed");
}

async fn connect_and_listen(
    url: &str,
    document_id: DocumentId,
    handle: &SyncHandle,
    state: &watch::Sender<SessionState>,
    attempt: &mut u32,
) -> Ended {
    let mut socket = match connect_async(url).await {
        Ok((socket, _)) => socket,
        Err(tungstenite::Error::Http(response)) if response.status().as_u16() == 404 => {
            warn!(%document_id, "collab channel refused: unknown document");
            return Ended::Gone;
        }
        Err(err) => {
            warn!(%document_id, error = %err, "collab channel connect failed");
            return Ended::Lost;
        }
    };

    *attempt = 0;
    state.send_replace(SessionState::Connected);
    info!(%document_id, "collab channel connected");
    handle.connected();

    while let Some(message) = socket.next().await {
        match message {
            Ok(Message::Text(text)) => match HubMessage::from_text(&text) {
                Some(HubMessage::Refetch { document_id: id, version }) if id == document_id => {
                    handle.refetch_hint(version);
                }
                Some(HubMessage::Refetch { document_id: id, .. }) => {
                    debug!(%document_id, other = %id, "ignoring hint for another document");
                }
                None => debug!(%document_id, text = %text.as_str(), "ignoring unknown collab message"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(%document_id, error = %err, "collab channel error");
                break;
            }
        }
        if handle.is_stopped() {
            let _ = socket.close(None).await;
            return Ended::Stopped;
        }
    }
    Ended::Lost
}
