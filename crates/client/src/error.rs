use thiserror::Error;

/// Failure of a single call to the document endpoints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("document not found")]
    NotFound,
    /// `409`: the patch was computed against a stale version.
    #[error("version mismatch")]
    VersionConflict,
    /// `422`: the version matched but the patch does not apply.
    #[error("patch rejected: {0}")]
    PatchApply(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("document has not been loaded yet")]
    Uninitialized,
    #[error("cannot edit {path}: {reason}")]
    InvalidEdit { path: String, reason: String },
    #[error("document no longer exists on the server")]
    NotFound,
    #[error("sync engine has stopped")]
    Stopped,
}
