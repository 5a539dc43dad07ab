//! Wire types shared by the sync server and its clients.
//!
//! - [`DocumentId`] and [`Version`] identify a document state.
//! - [`VersionedSnapshot`] is the body of reads, patch responses and full
//!   replaces.
//! - [`HubMessage`] travels over the real-time channel.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod routes;

// ── Identifiers ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(DocumentId)
    }
}

/// Optimistic-concurrency token. Starts at 1 and grows by one per commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub u64);

impl Version {
    pub const INITIAL: Version = Version(1);

    pub fn next(self) -> Version {
        Version(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Version {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Version)
    }
}

// ── Bodies ────────────────────────────────────────────────────────────────

/// A snapshot together with the version it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedSnapshot {
    pub version: Version,
    pub snapshot: Value,
}

impl VersionedSnapshot {
    pub fn new(version: Version, snapshot: Value) -> Self {
        Self { version, snapshot }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: Version,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDocument {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    pub id: DocumentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameDocument {
    pub name: String,
}

// ── Real-time channel ─────────────────────────────────────────────────────

/// Server to client message on the collaboration channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HubMessage {
    /// A newer version of `document_id` exists. Best-effort hint.
    #[serde(rename_all = "camelCase")]
    Refetch { document_id: DocumentId, version: Version },
}

impl HubMessage {
    pub fn to_text(&self) -> String {
        // a two-field struct of integers always serializes
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_text(text: &str) -> Option<HubMessage> {
        serde_json::from_str(text).ok()
    }
}
