//! Fakes shared by the unit tests.
//!
//! Fake documents are plain byte strings such as `%PDF-fake pages=3 delay=500`:
//! [`FakeBackend`] reads the page count and open delay back out of them, so a
//! test controls each load's timing through the source it selects.

use crate::api::{
    CreateJobRequest, DocumentInfo, JobState, JobStatus, JobTicket, RemoteApi, StoredDocument,
    UploadedDocument,
};
use crate::document::{
    DocumentBackend, DocumentHandle, DocumentSource, RasterOptions, RenderedPage,
};
use crate::error::SessionError;
use crate::observer::{SessionObserver, StaleStage};
use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub(crate) fn fake_pdf(pages: u32) -> Bytes {
    Bytes::from(format!("%PDF-fake pages={pages}"))
}

pub(crate) fn fake_pdf_slow(pages: u32, delay_ms: u64) -> Bytes {
    Bytes::from(format!("%PDF-fake pages={pages} delay={delay_ms}"))
}

fn field(text: &str, key: &str) -> Option<u64> {
    text.split_whitespace()
        .find_map(|part| part.strip_prefix(key)?.strip_prefix('='))
        .and_then(|v| v.parse().ok())
}

// ── Backend ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct FakeBackend {
    render_delays: Arc<Mutex<HashMap<u32, Duration>>>,
    rasterized: Arc<Mutex<Vec<u32>>>,
    opens: AtomicUsize,
}

impl FakeBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn set_render_delay(&self, page: u32, delay: Duration) {
        self.render_delays.lock().unwrap().insert(page, delay);
    }

    /// Pages passed to `rasterize`, in call order.
    pub(crate) fn rasterized(&self) -> Vec<u32> {
        self.rasterized.lock().unwrap().clone()
    }

    pub(crate) fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentBackend for FakeBackend {
    async fn open(&self, bytes: Bytes) -> Result<Arc<dyn DocumentHandle>, SessionError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let text = String::from_utf8_lossy(&bytes).into_owned();
        if !text.starts_with("%PDF") {
            return Err(SessionError::DocumentLoadFailed {
                origin: "document".into(),
                reason: "not a PDF".into(),
            });
        }
        if let Some(ms) = field(&text, "delay") {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        Ok(Arc::new(FakeHandle {
            pages: field(&text, "pages").unwrap_or(1) as u32,
            render_delays: self.render_delays.clone(),
            rasterized: self.rasterized.clone(),
        }))
    }
}

struct FakeHandle {
    pages: u32,
    render_delays: Arc<Mutex<HashMap<u32, Duration>>>,
    rasterized: Arc<Mutex<Vec<u32>>>,
}

#[async_trait]
impl DocumentHandle for FakeHandle {
    fn page_count(&self) -> u32 {
        self.pages
    }

    async fn rasterize(
        &self,
        page: u32,
        _options: &RasterOptions,
    ) -> Result<RenderedPage, SessionError> {
        self.rasterized.lock().unwrap().push(page);
        let delay = self.render_delays.lock().unwrap().get(&page).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(RenderedPage {
            page,
            image: DynamicImage::new_rgb8(2, 2),
        })
    }
}

// ── Observer ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Observed {
    LoadStarted(u64),
    Loaded(u64, u32),
    LoadFailed(u64),
    Rendered(u64, u32),
    RenderFailed(u64, u32),
    Stale(u64, StaleStage),
}

#[derive(Default)]
pub(crate) struct RecordingObserver {
    events: Mutex<Vec<Observed>>,
}

impl RecordingObserver {
    pub(crate) fn events(&self) -> Vec<Observed> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: Observed) {
        self.events.lock().unwrap().push(event);
    }
}

impl SessionObserver for RecordingObserver {
    fn on_load_started(&self, generation: u64, _source: &DocumentSource) {
        self.push(Observed::LoadStarted(generation));
    }

    fn on_document_loaded(&self, generation: u64, page_count: u32) {
        self.push(Observed::Loaded(generation, page_count));
    }

    fn on_load_failed(&self, generation: u64, _source: &DocumentSource, _error: &SessionError) {
        self.push(Observed::LoadFailed(generation));
    }

    fn on_page_rendered(&self, generation: u64, page: u32) {
        self.push(Observed::Rendered(generation, page));
    }

    fn on_render_failed(&self, generation: u64, page: u32, _error: &SessionError) {
        self.push(Observed::RenderFailed(generation, page));
    }

    fn on_stale_discarded(&self, generation: u64, stage: StaleStage) {
        self.push(Observed::Stale(generation, stage));
    }
}

// ── Remote API ───────────────────────────────────────────────────────────

/// Job statuses are served from a queue; once it is empty every check
/// reports `Pending`.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    statuses: Mutex<VecDeque<Result<JobStatus, SessionError>>>,
    checks: Mutex<Vec<Instant>>,
    documents: Mutex<HashMap<String, Bytes>>,
    uploads: Mutex<Vec<String>>,
    jobs: Mutex<Vec<CreateJobRequest>>,
    create_delay: Mutex<Duration>,
    status_delay: Mutex<Duration>,
}

impl ScriptedApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn add_document(&self, id: &str, bytes: Bytes) {
        self.documents.lock().unwrap().insert(id.to_string(), bytes);
    }

    pub(crate) fn push_state(&self, state: JobState) {
        self.statuses
            .lock()
            .unwrap()
            .push_back(Ok(JobStatus::new("scripted", state)));
    }

    pub(crate) fn push_error(&self, error: SessionError) {
        self.statuses.lock().unwrap().push_back(Err(error));
    }

    pub(crate) fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = delay;
    }

    /// Every `job_status` call takes this long to answer.
    pub(crate) fn set_status_delay(&self, delay: Duration) {
        *self.status_delay.lock().unwrap() = delay;
    }

    /// Instants at which `job_status` was called.
    pub(crate) fn check_times(&self) -> Vec<Instant> {
        self.checks.lock().unwrap().clone()
    }

    pub(crate) fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub(crate) fn jobs(&self) -> Vec<CreateJobRequest> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteApi for ScriptedApi {
    async fn upload_document(
        &self,
        name: &str,
        _bytes: Bytes,
    ) -> Result<UploadedDocument, SessionError> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(name.to_string());
        let pdf_id = format!("up-{}", uploads.len());
        Ok(UploadedDocument {
            pdf_key: format!("pdfs/{pdf_id}.pdf"),
            pdf_id,
        })
    }

    async fn list_documents(&self) -> Result<Vec<StoredDocument>, SessionError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .keys()
            .map(|id| StoredDocument {
                pdf_id: id.clone(),
                pdf_key: format!("pdfs/{id}.pdf"),
            })
            .collect())
    }

    async fn document_info(&self, document_id: &str) -> Result<DocumentInfo, SessionError> {
        let bytes = self.fetch_document(document_id).await?;
        let pages = field(&String::from_utf8_lossy(&bytes), "pages").unwrap_or(1) as u32;
        Ok(DocumentInfo {
            pdf_id: document_id.to_string(),
            num_pages: pages,
        })
    }

    async fn fetch_document(&self, document_id: &str) -> Result<Bytes, SessionError> {
        self.documents
            .lock()
            .unwrap()
            .get(document_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound {
                url: format!("/pdfs/{document_id}/content"),
            })
    }

    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobTicket, SessionError> {
        let delay = *self.create_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut jobs = self.jobs.lock().unwrap();
        jobs.push(request.clone());
        let job_id = format!("job-{}", jobs.len());
        Ok(JobTicket {
            status_url: format!("/jobs/{job_id}"),
            download_url: format!("/jobs/{job_id}/download"),
            job_id,
        })
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, SessionError> {
        self.checks.lock().unwrap().push(Instant::now());
        let delay = *self.status_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.statuses.lock().unwrap().pop_front() {
            Some(Ok(mut status)) => {
                status.job_id = job_id.to_string();
                Ok(status)
            }
            Some(Err(e)) => Err(e),
            None => Ok(JobStatus::new(job_id, JobState::Pending)),
        }
    }

    async fn download_result(&self, _job_id: &str) -> Result<Bytes, SessionError> {
        Ok(Bytes::from_static(b"PK\x03\x04fake lesson"))
    }
}
