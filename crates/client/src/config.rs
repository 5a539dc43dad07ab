use std::time::Duration;

use deckscribe_protocol::{routes, DocumentId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server origin, e.g. `http://127.0.0.1:5080`.
    pub base_url: String,
    /// Quiet period after the last local edit before a patch is sent.
    pub debounce_ms: u64,
    pub reconnect_min_ms: u64,
    pub reconnect_max_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5080".to_string(),
            debounce_ms: 1000,
            reconnect_min_ms: 250,
            reconnect_max_ms: 10_000,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Delay before reconnect attempt `attempt` (0-based): doubles from
    /// `reconnect_min_ms` up to `reconnect_max_ms`.
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
        let ms = self.reconnect_min_ms.saturating_mul(factor).min(self.reconnect_max_ms);
        Duration::from_millis(ms)
    }

    fn origin(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn document_url(&self, id: DocumentId) -> String {
        format!("{}{}", self.origin(), routes::document(id))
    }

    /// Collaboration channel URL, with the scheme switched to `ws`/`wss`.
    pub fn ws_url(&self, id: DocumentId) -> String {
        let origin = self.origin();
        let origin = if let Some(rest) = origin.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = origin.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            origin.to_string()
        };
        format!("{origin}{}?{}={id}", routes::COLLAB, routes::DOCUMENT_ID_PARAM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls() {
        let config = ClientConfig::new("https://decks.example.com/");
        assert_eq!(config.document_url(DocumentId(3)), "https://decks.example.com/document/3");
        assert_eq!(config.ws_url(DocumentId(3)), "wss://decks.example.com/collab?documentId=3");
        assert_eq!(
            ClientConfig::new("http://localhost:5080").ws_url(DocumentId(1)),
            "ws://localhost:5080/collab?documentId=1"
        );
    }

    #[test]
    fn reconnect_backoff_is_capped() {
        let config = ClientConfig { reconnect_min_ms: 100, reconnect_max_ms: 1000, ..ClientConfig::default() };
        assert_eq!(config.reconnect_delay(0), Duration::from_millis(100));
        assert_eq!(config.reconnect_delay(1), Duration::from_millis(200));
        assert_eq!(config.reconnect_delay(3), Duration::from_millis(800));
        assert_eq!(config.reconnect_delay(4), Duration::from_millis(1000));
        assert_eq!(config.reconnect_delay(200), Duration::from_millis(1000));
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"debounce_ms": 50}"#).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(50));
        assert_eq!(config.base_url, ClientConfig::default().base_url);
    }
}
