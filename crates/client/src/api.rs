//! Document endpoints as seen by the client.

use std::time::Duration;

use async_trait::async_trait;
use deckscribe_json_patch::Patch;
use deckscribe_protocol::{routes, DocumentId, Version, VersionResponse, VersionedSnapshot};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ApiError;

#[async_trait]
pub trait DocumentApi: Send + Sync + 'static {
    async fn read(&self, id: DocumentId) -> Result<VersionedSnapshot, ApiError>;

    /// Applies `patch` if the document is still at `expected`.
    async fn apply_patch(
        &self,
        id: DocumentId,
        expected: Version,
        patch: &Patch,
    ) -> Result<VersionedSnapshot, ApiError>;

    async fn replace(&self, id: DocumentId, expected: Version, snapshot: &Value) -> Result<Version, ApiError>;
}

/// [`DocumentApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpApi {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!(%status, %body, "document endpoint refused request");
    Err(match status {
        StatusCode::NOT_FOUND => ApiError::NotFound,
        StatusCode::CONFLICT => ApiError::VersionConflict,
        StatusCode::UNPROCESSABLE_ENTITY => ApiError::PatchApply(body),
        other => ApiError::Transport(format!("unexpected status {other}: {body}")),
    })
}

#[async_trait]
impl DocumentApi for HttpApi {
    async fn read(&self, id: DocumentId) -> Result<VersionedSnapshot, ApiError> {
        let response = self.client.get(self.config.document_url(id)).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn apply_patch(
        &self,
        id: DocumentId,
        expected: Version,
        patch: &Patch,
    ) -> Result<VersionedSnapshot, ApiError> {
        let response = self
            .client
            .patch(self.config.document_url(id))
            .query(&[(routes::VERSION_PARAM, expected.0)])
            .json(patch)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn replace(&self, id: DocumentId, expected: Version, snapshot: &Value) -> Result<Version, ApiError> {
        let body = VersionedSnapshot::new(expected, snapshot.clone());
        let response = self.client.put(self.config.document_url(id)).json(&body).send().await?;
        let VersionResponse { version } = check(response).await?.json().await?;
        Ok(version)
    }
}
