//! HTTP endpoints.
//!
//! ```text
//! POST  /document                    create a deck
//! GET   /document/{id}               {version, snapshot}
//! PATCH /document/{id}?version=n     apply a JSON Patch against version n
//! PUT   /document/{id}               replace the snapshot
//! GET   /document/{id}/version
//! GET   /document/{id}/name
//! PUT   /document/{id}/name
//! GET   /collab?documentId=id        refetch-hint channel (see `ws`)
//! ```

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use deckscribe_json_patch::Patch;
use deckscribe_protocol::{
    routes, CreateDocument, Created, DocumentId, RenameDocument, Version, VersionResponse, VersionedSnapshot,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::ServiceError;
use crate::{ws, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(routes::DOCUMENT, post(create_document))
        .route("/document/{id}", get(read_document).patch(patch_document).put(replace_document))
        .route("/document/{id}/version", get(read_version))
        .route("/document/{id}/name", get(read_name).put(rename_document))
        .route(routes::COLLAB, get(ws::collab))
        .layer(middleware::from_fn(trace_request))
        .with_state(state)
}

async fn trace_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();
    let response = next.run(request).await;
    debug!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

#[derive(Debug, Deserialize)]
struct PatchQuery {
    version: Option<String>,
}

/// Bodies are decoded by hand so that a malformed body is a 400 and never
/// shares 422 with a patch that does not apply.
fn decode_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ServiceError> {
    serde_json::from_slice(body).map_err(|err| ServiceError::BadRequest(err.to_string()))
}

fn parse_version(raw: Option<&str>) -> Result<Version, ServiceError> {
    let raw = raw.ok_or_else(|| ServiceError::BadRequest(format!("missing `{}` parameter", routes::VERSION_PARAM)))?;
    raw.parse()
        .map_err(|_| ServiceError::BadRequest(format!("invalid version {raw:?}")))
}

async fn create_document(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Created>), ServiceError> {
    let CreateDocument { name } = decode_body(&body)?;
    let id = state.service.create(&name)?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

async fn read_document(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> Result<Json<VersionedSnapshot>, ServiceError> {
    Ok(Json(state.service.read(id)?))
}

async fn patch_document(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
    Query(query): Query<PatchQuery>,
    body: Bytes,
) -> Result<Json<VersionedSnapshot>, ServiceError> {
    let expected = parse_version(query.version.as_deref())?;
    let patch: Patch = decode_body(&body)?;
    Ok(Json(state.service.apply_patch(id, expected, &patch)?))
}

async fn replace_document(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
    body: Bytes,
) -> Result<Json<VersionResponse>, ServiceError> {
    let VersionedSnapshot { version, snapshot } = decode_body(&body)?;
    let version = state.service.replace(id, version, snapshot)?;
    Ok(Json(VersionResponse { version }))
}

async fn read_version(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> Result<Json<VersionResponse>, ServiceError> {
    Ok(Json(VersionResponse { version: state.service.version(id)? }))
}

async fn read_name(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> Result<Json<RenameDocument>, ServiceError> {
    Ok(Json(RenameDocument { name: state.service.name(id)? }))
}

async fn rename_document(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
    body: Bytes,
) -> Result<StatusCode, ServiceError> {
    let RenameDocument { name } = decode_body(&body)?;
    state.service.rename(id, &name)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parameter() {
        assert_eq!(parse_version(Some("3")).unwrap(), Version(3));
        assert!(matches!(parse_version(None), Err(ServiceError::BadRequest(_))));
        assert!(matches!(parse_version(Some("three")), Err(ServiceError::BadRequest(_))));
    }

    #[test]
    fn malformed_patch_is_a_bad_request() {
        let body = Bytes::from_static(br#"[{"op":"jump","path":"/a"}]"#);
        match decode_body::<Patch>(&body) {
            Err(ServiceError::BadRequest(msg)) => assert!(msg.contains("index = 0"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
