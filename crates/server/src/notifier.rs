//! Per-document refetch-hint fan-out.
//!
//! The notifier only knows which live connections observe which document.
//! It holds no document state and can be cleared at any time; clients
//! recover through their own reconnect-and-read path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use deckscribe_protocol::{DocumentId, HubMessage, Version};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

pub type ConnectionId = u64;

type Topic = HashMap<ConnectionId, mpsc::UnboundedSender<HubMessage>>;

#[derive(Default)]
pub struct Notifier {
    topics: RwLock<HashMap<DocumentId, Topic>>,
    next_connection: AtomicU64,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection for `document_id`. The returned handle
    /// unregisters itself when dropped.
    pub fn subscribe(self: &Arc<Self>, document_id: DocumentId) -> Subscription {
        let connection_id = self.next_connection.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.topics.write().entry(document_id).or_default().insert(connection_id, tx);
        debug!(%document_id, connection_id, "subscribed");
        Subscription { notifier: Arc::clone(self), document_id, connection_id, rx }
    }

    fn unsubscribe(&self, document_id: DocumentId, connection_id: ConnectionId) {
        let mut topics = self.topics.write();
        if let Some(topic) = topics.get_mut(&document_id) {
            topic.remove(&connection_id);
            if topic.is_empty() {
                topics.remove(&document_id);
            }
        }
        debug!(%document_id, connection_id, "unsubscribed");
    }

    /// Sends `Refetch(document_id, version)` to every subscriber of the
    /// document, the connection that caused the change included.
    ///
    /// Returns how many connections the hint was queued for. Connections
    /// whose receiver is gone are pruned.
    pub fn publish(&self, document_id: DocumentId, version: Version) -> usize {
        let message = HubMessage::Refetch { document_id, version };
        let mut dead = Vec::new();
        let mut delivered = 0;
        {
            let topics = self.topics.read();
            let Some(topic) = topics.get(&document_id) else {
                return 0;
            };
            for (connection_id, tx) in topic {
                if tx.send(message.clone()).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(*connection_id);
                }
            }
        }
        for connection_id in dead {
            self.unsubscribe(document_id, connection_id);
        }
        debug!(%document_id, %version, delivered, "published refetch hint");
        delivered
    }

    pub fn subscriber_count(&self, document_id: DocumentId) -> usize {
        self.topics.read().get(&document_id).map_or(0, HashMap::len)
    }

    /// Drops every subscription, as a server restart would.
    pub fn clear(&self) {
        self.topics.write().clear();
    }
}

/// Membership of one connection in one document's topic.
pub struct Subscription {
    notifier: Arc<Notifier>,
    document_id: DocumentId,
    connection_id: ConnectionId,
    rx: mpsc::UnboundedReceiver<HubMessage>,
}

impl Subscription {
    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Waits for the next hint. `None` once the notifier dropped this
    /// connection (for example after [`Notifier::clear`]).
    pub async fn recv(&mut self) -> Option<HubMessage> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<HubMessage> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.notifier.unsubscribe(self.document_id, self.connection_id);
    }
}
