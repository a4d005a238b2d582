//! `reqwest` implementation of [`RemoteApi`].

use super::types::{
    CreateJobRequest, DocumentInfo, DocumentList, ErrorBody, JobStatus, JobTicket,
    StoredDocument, UploadedDocument,
};
use super::RemoteApi;
use crate::config::ClientConfig;
use crate::error::SessionError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// HTTP client for the lesson backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    download_timeout: Duration,
}

impl ApiClient {
    /// Build a client from a validated configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SessionError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            config: config.clone(),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, SessionError> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(url, &e))?;
        check_status(url, response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SessionError> {
        let response = self.send(self.http.get(url), url).await?;
        decode(url, response).await
    }

    async fn get_bytes(&self, url: &str) -> Result<Bytes, SessionError> {
        let request = self.http.get(url).timeout(self.download_timeout);
        let response = self.send(request, url).await?;
        response.bytes().await.map_err(|e| transport_error(url, &e))
    }
}

#[async_trait]
impl RemoteApi for ApiClient {
    async fn upload_document(
        &self,
        name: &str,
        bytes: Bytes,
    ) -> Result<UploadedDocument, SessionError> {
        let url = self.url("pdfs");
        info!("Uploading '{}' ({} bytes)", name, bytes.len());

        let part = reqwest::multipart::Part::bytes(bytes.to_vec())
            .file_name(name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| SessionError::Internal(format!("multipart: {e}")))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let request = self
            .http
            .post(&url)
            .multipart(form)
            .timeout(self.download_timeout);
        let response = self.send(request, &url).await?;
        decode(&url, response).await
    }

    async fn list_documents(&self) -> Result<Vec<StoredDocument>, SessionError> {
        let list: DocumentList = self.get_json(&self.url("pdfs")).await?;
        debug!("Backend lists {} documents", list.pdfs.len());
        Ok(list.pdfs)
    }

    async fn document_info(&self, document_id: &str) -> Result<DocumentInfo, SessionError> {
        self.get_json(&self.url(&format!("pdfs/{document_id}")))
            .await
    }

    async fn fetch_document(&self, document_id: &str) -> Result<Bytes, SessionError> {
        let url = self.config.content_url(document_id);
        debug!("Fetching document bytes from {}", url);
        self.get_bytes(&url).await
    }

    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobTicket, SessionError> {
        let url = self.url("jobs");
        info!(
            "Creating job for {} pages {}-{}",
            request.pdf_id, request.from_page, request.to_page
        );
        let response = self.send(self.http.post(&url).json(request), &url).await?;
        decode(&url, response).await
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, SessionError> {
        self.get_json(&self.url(&format!("jobs/{job_id}"))).await
    }

    async fn download_result(&self, job_id: &str) -> Result<Bytes, SessionError> {
        self.get_bytes(&self.url(&format!("jobs/{job_id}/download")))
            .await
    }
}

/// Map a connection-level `reqwest` failure.
fn transport_error(url: &str, e: &reqwest::Error) -> SessionError {
    if e.is_decode() {
        SessionError::InvalidResponse {
            url: url.to_string(),
            detail: e.to_string(),
        }
    } else {
        SessionError::TransportUnreachable {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

async fn check_status(url: &str, response: Response) -> Result<Response, SessionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(url, status.as_u16(), &body))
}

async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, SessionError> {
    let body = response.bytes().await.map_err(|e| transport_error(url, &e))?;
    serde_json::from_slice(&body).map_err(|e| SessionError::InvalidResponse {
        url: url.to_string(),
        detail: e.to_string(),
    })
}

/// Map a non-success HTTP status onto the error taxonomy.
///
/// The backend reports problems as `{"detail": ...}`; the detail is carried
/// into `BadRequest` and `Conflict` so the user sees the server's wording.
/// 422 is the backend's schema-validation status and counts as a bad request.
pub(crate) fn status_error(url: &str, status: u16, body: &str) -> SessionError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .map(|d| match d {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });

    match status {
        404 => SessionError::NotFound {
            url: url.to_string(),
        },
        400 | 422 => SessionError::BadRequest {
            detail: detail.unwrap_or_else(|| format!("Bad request ({status})")),
        },
        409 => SessionError::Conflict {
            detail: detail.unwrap_or_else(|| "Conflict (409)".to_string()),
        },
        500..=599 => SessionError::ServerError { status },
        _ => SessionError::UnexpectedStatus { status },
    }
}
