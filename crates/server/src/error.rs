use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use deckscribe_json_patch::PatchApplyError;
use deckscribe_protocol::routes::VERSION_MISMATCH;
use deckscribe_protocol::{DocumentId, Version};
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("document {0} not found")]
    NotFound(DocumentId),
    /// The caller's patch or snapshot was computed against a stale version.
    #[error("version mismatch: expected {expected}, current {current}")]
    VersionConflict { expected: Version, current: Version },
    /// The patch does not apply to the stored snapshot even though the
    /// version matched.
    #[error("patch does not apply: {0}")]
    PatchApply(#[from] PatchApplyError),
    #[error("Deck with that name already exists.")]
    NameTaken(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            StoreError::NameTaken(name) => ServiceError::NameTaken(name),
            other => ServiceError::Store(other),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND.into_response(),
            ServiceError::VersionConflict { .. } => (StatusCode::CONFLICT, VERSION_MISMATCH).into_response(),
            ServiceError::PatchApply(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()).into_response(),
            ServiceError::NameTaken(_) | ServiceError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            ServiceError::Store(err) => {
                error!(error = %err, "snapshot store failure");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
