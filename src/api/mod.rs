//! Remote API: the lesson backend as seen by the session pipeline.
//!
//! [`RemoteApi`] is the seam between the state machines in this crate and the
//! network. The session fetches document bytes through it, the poll engine
//! creates jobs and checks their status through it. [`ApiClient`] is the
//! `reqwest` implementation; tests substitute scripted fakes.
//!
//! ## Endpoints
//!
//! ```text
//! POST {base}/pdfs                 multipart upload   → {pdf_id, pdf_key}
//! GET  {base}/pdfs                 listing            → {pdfs: [...]}
//! GET  {base}/pdfs/{id}            page count         → {pdf_id, num_pages}
//! GET  {content template}          raw PDF bytes
//! POST {base}/jobs                 {pdf_id, from_page, to_page} → ticket
//! GET  {base}/jobs/{id}            status
//! GET  {base}/jobs/{id}/download   artifact (409 until the job succeeded)
//! ```

mod client;
mod types;

pub use client::ApiClient;
pub use types::{
    CreateJobRequest, DocumentInfo, JobState, JobStatus, JobTicket, StoredDocument,
    UploadedDocument,
};

use crate::error::SessionError;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Operations the session pipeline needs from the backend.
///
/// Every method maps transport failures into the [`SessionError`] taxonomy
/// (`TransportUnreachable`, `NotFound`, `BadRequest`, `Conflict`,
/// `ServerError`).
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Upload document bytes; the backend assigns a new id.
    async fn upload_document(&self, name: &str, bytes: Bytes)
        -> Result<UploadedDocument, SessionError>;

    /// List stored documents. Order is not significant.
    async fn list_documents(&self) -> Result<Vec<StoredDocument>, SessionError>;

    /// Server-side page count of a stored document.
    async fn document_info(&self, document_id: &str) -> Result<DocumentInfo, SessionError>;

    /// Raw bytes of a stored document.
    async fn fetch_document(&self, document_id: &str) -> Result<Bytes, SessionError>;

    /// Create a job over an inclusive, 1-based page range.
    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobTicket, SessionError>;

    /// One status check.
    async fn job_status(&self, job_id: &str) -> Result<JobStatus, SessionError>;

    /// The finished artifact. Only valid once the job succeeded.
    async fn download_result(&self, job_id: &str) -> Result<Bytes, SessionError>;
}

/// File name used when a result is saved into a directory.
pub fn default_result_name(job_id: &str) -> String {
    format!("lesson-{job_id}.zip")
}

/// Download a job's artifact and write it to `dest`.
///
/// If `dest` is an existing directory the file is named
/// [`default_result_name`]. The write goes to a temp file next to the target
/// and is then renamed into place, so a failed download never leaves a
/// truncated artifact behind.
pub async fn save_result(
    api: &dyn RemoteApi,
    job_id: &str,
    dest: &Path,
) -> Result<PathBuf, SessionError> {
    let bytes = api.download_result(job_id).await?;

    let is_dir = tokio::fs::metadata(dest)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    let path = if is_dir {
        dest.join(default_result_name(job_id))
    } else {
        dest.to_path_buf()
    };
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    tokio::fs::create_dir_all(&parent)
        .await
        .map_err(|e| SessionError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    let target = path.clone();
    let written = tokio::task::spawn_blocking(move || -> Result<PathBuf, SessionError> {
        let write_err = |e: std::io::Error| SessionError::OutputWriteFailed {
            path: target.clone(),
            source: e,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.persist(&target).map_err(|e| write_err(e.error))?;
        Ok(target.clone())
    })
    .await
    .map_err(|e| SessionError::Internal(format!("Write task panicked: {e}")))??;

    info!("Saved result of job {} to {}", job_id, written.display());
    Ok(written)
}
