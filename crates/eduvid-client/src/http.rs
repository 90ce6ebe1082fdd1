//! HTTP client for the API server.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eduvid_models::{download_path, GenerateRequest, GenerateResponse, StatusResponse};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::PollConfig;
use crate::error::{ClientError, ClientResult};
use crate::poller::JobApi;

/// Error body returned by the server.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &PollConfig) -> ClientResult<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Submit a generation request.
    pub async fn generate(&self, request: &GenerateRequest) -> ClientResult<GenerateResponse> {
        let response = self
            .http
            .post(self.url("/api/generate"))
            .json(request)
            .send()
            .await?;
        decode(check(response, None).await?).await
    }

    /// Fetch the status of a job.
    pub async fn status(&self, job_id: &str) -> ClientResult<StatusResponse> {
        let response = self
            .http
            .get(self.url(&format!("/api/status/{job_id}")))
            .send()
            .await?;
        decode(check(response, Some(job_id)).await?).await
    }

    /// Download the final video of a completed job to `dest`.
    pub async fn download(&self, job_id: &str, dest: &Path) -> ClientResult<PathBuf> {
        let mut response = check(
            self.http.get(self.url(&download_path(job_id))).send().await?,
            Some(job_id),
        )
        .await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        debug!(job_id, bytes = written, path = %dest.display(), "Downloaded video");
        Ok(dest.to_path_buf())
    }
}

#[async_trait]
impl JobApi for ApiClient {
    async fn submit(&self, request: &GenerateRequest) -> ClientResult<GenerateResponse> {
        self.generate(request).await
    }

    async fn status(&self, job_id: &str) -> ClientResult<StatusResponse> {
        ApiClient::status(self, job_id).await
    }
}

/// Map non-success responses to errors. A 404 for a job becomes `NotFound`.
async fn check(response: Response, job_id: Option<&str>) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = job_id {
            return Err(ClientError::NotFound(id.to_string()));
        }
    }

    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.detail.or(b.error))
        .unwrap_or(text);

    Err(ClientError::UnexpectedStatus {
        status: status.as_u16(),
        detail,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}
