//! HTTP and channel route names.

pub const DOCUMENT: &str = "/document";

/// Real-time channel endpoint.
pub const COLLAB: &str = "/collab";

/// Required query parameter naming the document a channel observes.
pub const DOCUMENT_ID_PARAM: &str = "documentId";

/// Query parameter carrying the expected version of a patch.
pub const VERSION_PARAM: &str = "version";

/// Body of a `409 Conflict` response.
pub const VERSION_MISMATCH: &str = "Version mismatch";

pub fn document(id: crate::DocumentId) -> String {
    format!("{DOCUMENT}/{id}")
}
