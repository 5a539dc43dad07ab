//! The refetch-hint channel.
//!
//! A client opens `GET /collab?documentId={id}` and receives a text frame
//! `{"type":"refetch","documentId":id,"version":v}` after every commit to
//! that document. Frames from the client are ignored apart from close.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use deckscribe_protocol::{routes, DocumentId};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ServiceError;
use crate::notifier::Subscription;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CollabQuery {
    #[serde(rename = "documentId")]
    document_id: Option<String>,
}

impl CollabQuery {
    fn document_id(&self) -> Result<DocumentId, ServiceError> {
        let raw = self
            .document_id
            .as_deref()
            .ok_or_else(|| ServiceError::BadRequest(format!("missing `{}` parameter", routes::DOCUMENT_ID_PARAM)))?;
        raw.parse()
            .map_err(|_| ServiceError::BadRequest(format!("invalid document id {raw:?}")))
    }
}

/// Rejects the upgrade unless the query names an existing document, then
/// registers the connection before the handshake completes so no commit
/// made after a successful connect can be missed.
pub async fn collab(
    State(state): State<AppState>,
    Query(query): Query<CollabQuery>,
    upgrade: WebSocketUpgrade,
) -> Result<Response, ServiceError> {
    let document_id = query.document_id()?;
    if !state.service.exists(document_id)? {
        return Err(ServiceError::NotFound(document_id));
    }
    let subscription = state.service.notifier().subscribe(document_id);
    let heartbeat = state.config.heartbeat_interval();
    Ok(upgrade.on_upgrade(move |socket| serve_connection(socket, subscription, heartbeat)))
}

async fn serve_connection(socket: WebSocket, mut subscription: Subscription, heartbeat: Duration) {
    let document_id = subscription.document_id();
    let connection_id = subscription.connection_id();
    info!(%document_id, connection_id, "collab connection opened");

    let (mut sink, mut stream) = socket.split();
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + heartbeat, heartbeat);

    loop {
        tokio::select! {
            hint = subscription.recv() => {
                let Some(hint) = hint else { break };
                if sink.send(Message::Text(hint.to_text().into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                None | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(%document_id, connection_id, error = %err, "collab socket error");
                    break;
                }
            },
            _ = ticker.tick() => {
                if sink.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }

    info!(%document_id, connection_id, "collab connection closed");
}
