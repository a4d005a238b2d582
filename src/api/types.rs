//! Wire types for the lesson backend's JSON API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Response to a document upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub pdf_id: String,
    pub pdf_key: String,
}

/// One entry of the stored-document listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub pdf_id: String,
    pub pdf_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DocumentList {
    #[serde(default)]
    pub pdfs: Vec<StoredDocument>,
}

/// Server-side page count of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub pdf_id: String,
    pub num_pages: u32,
}

/// Body of a job-creation request. Pages are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub pdf_id: String,
    pub from_page: u32,
    pub to_page: u32,
}

/// Response to a job-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTicket {
    pub job_id: String,
    pub status_url: String,
    pub download_url: String,
}

/// Lifecycle of a backend job as seen by the client.
///
/// The backend reports task-queue states (`PENDING`, `STARTED`, `SUCCESS`,
/// `FAILURE`, …); they are folded into four states here. Unrecognised states
/// count as [`JobState::Pending`] so an unknown value never ends a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    /// Succeeded and Failed admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Running => "RUNNING",
            JobState::Succeeded => "SUCCESS",
            JobState::Failed => "FAILURE",
        }
    }
}

impl From<&str> for JobState {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "STARTED" | "RETRY" | "PROGRESS" | "RUNNING" => JobState::Running,
            "SUCCESS" | "SUCCEEDED" => JobState::Succeeded,
            "FAILURE" | "FAILED" | "REVOKED" => JobState::Failed,
            _ => JobState::Pending,
        }
    }
}

impl From<String> for JobState {
    fn from(s: String) -> Self {
        JobState::from(s.as_str())
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status check's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: String,
    pub state: JobState,
    /// Opaque result map, present once the job succeeded.
    #[serde(default)]
    pub result: Option<serde_json::Map<String, serde_json::Value>>,
    /// Failure description, present once the job failed.
    #[serde(default)]
    pub error: Option<String>,
}

impl JobStatus {
    pub fn new(job_id: impl Into<String>, state: JobState) -> Self {
        Self {
            job_id: job_id.into(),
            state,
            result: None,
            error: None,
        }
    }
}

/// FastAPI-style error body: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_states_fold_into_four() {
        assert_eq!(JobState::from("PENDING"), JobState::Pending);
        assert_eq!(JobState::from("STARTED"), JobState::Running);
        assert_eq!(JobState::from("retry"), JobState::Running);
        assert_eq!(JobState::from("SUCCESS"), JobState::Succeeded);
        assert_eq!(JobState::from("Succeeded"), JobState::Succeeded);
        assert_eq!(JobState::from("FAILURE"), JobState::Failed);
        assert_eq!(JobState::from("REVOKED"), JobState::Failed);
        assert_eq!(JobState::from("SOMETHING_NEW"), JobState::Pending);
    }

    #[test]
    fn terminal_states() {
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
    }

    #[test]
    fn status_deserialises_from_backend_json() {
        let json = r#"{"job_id":"j1","state":"SUCCESS","result":{"bundle_key":"jobs/j1/bundle.zip"},"error":null}"#;
        let status: JobStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.state, JobState::Succeeded);
        assert_eq!(
            status.result.unwrap()["bundle_key"],
            serde_json::json!("jobs/j1/bundle.zip")
        );
        assert!(status.error.is_none());
    }

    #[test]
    fn status_tolerates_missing_optional_fields() {
        let status: JobStatus = serde_json::from_str(r#"{"job_id":"j2","state":"PENDING"}"#).unwrap();
        assert_eq!(status, JobStatus::new("j2", JobState::Pending));
    }
}
