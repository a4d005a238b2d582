//! Session controller: wires user intents to the session and the poll engine.
//!
//! ```text
//! on_source_selected ──▶ DocumentSession::load        (cancels active poll)
//! on_range_submitted ──▶ validate ─▶ upload/resolve id ─▶ submit ─▶ start_polling
//! on_teardown        ──▶ cancel poll, close session
//! ```

use crate::api::{save_result, ApiClient, JobState, JobStatus, JobTicket, RemoteApi};
use crate::config::ClientConfig;
use crate::document::{
    DocumentSession, DocumentSource, Generation, PageSurface, PdfiumBackend, RasterOptions,
};
use crate::error::SessionError;
use crate::observer::SharedObserver;
use crate::poll::{JobPoll, JobPollEngine, PollHandle, PollOptions};
use crate::range::{self, PageRange};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

#[derive(Default)]
struct ControllerState {
    range: PageRange,
    poll: Option<PollHandle>,
    /// Backend id of the current generation's uploaded `File` source.
    uploaded: Option<(Generation, String)>,
}

/// Front door of the library for an interactive client.
pub struct SessionController {
    session: DocumentSession,
    engine: JobPollEngine,
    api: Arc<dyn RemoteApi>,
    poll_defaults: PollOptions,
    state: Mutex<ControllerState>,
}

impl SessionController {
    /// Build a controller talking HTTP to `config.base_url` and rendering
    /// with pdfium.
    pub fn new(
        config: &ClientConfig,
        surface: Box<dyn PageSurface>,
        observer: SharedObserver,
    ) -> Result<Self, SessionError> {
        let api: Arc<dyn RemoteApi> = Arc::new(ApiClient::new(config)?);
        let backend = Arc::new(PdfiumBackend::new(config.pdfium_lib_path.clone()));
        let raster = RasterOptions {
            max_pixels: config.max_rendered_pixels,
        };
        let session = DocumentSession::new(backend, api.clone(), surface, observer, raster);
        Ok(Self::with_parts(session, api, config.poll_options()))
    }

    /// Assemble a controller from existing parts. `api` should be the same
    /// API the session fetches documents through.
    pub fn with_parts(
        session: DocumentSession,
        api: Arc<dyn RemoteApi>,
        poll_defaults: PollOptions,
    ) -> Self {
        Self {
            session,
            engine: JobPollEngine::new(api.clone()),
            api,
            poll_defaults,
            state: Mutex::new(ControllerState::default()),
        }
    }

    pub fn session(&self) -> &DocumentSession {
        &self.session
    }

    pub fn api(&self) -> &Arc<dyn RemoteApi> {
        &self.api
    }

    /// Handle of the poll started by the last accepted submission, if any.
    pub fn active_poll(&self) -> Option<PollHandle> {
        self.lock_state().poll.clone()
    }

    /// Select a new document. Clears the draft range, forgets any upload of
    /// the previous source and cancels the active poll.
    ///
    /// The controller lock is held until the session has moved to the new
    /// generation, so a submission racing with this call either has its poll
    /// cancelled here or sees the new generation and is superseded.
    pub fn on_source_selected(&self, source: DocumentSource) -> Generation {
        let mut st = self.lock_state();
        if let Some(poll) = st.poll.take() {
            poll.cancel();
        }
        st.range = PageRange::default();
        st.uploaded = None;
        self.session.load(source)
    }

    pub fn set_range(&self, range: PageRange) {
        self.lock_state().range = range;
    }

    pub fn range(&self) -> PageRange {
        self.lock_state().range
    }

    /// Message to show under the range inputs, if any.
    pub fn validation(&self) -> Option<String> {
        range::message(&self.range(), self.session.snapshot().page_count)
    }

    /// Whether the draft range could be submitted right now.
    pub fn can_submit(&self) -> bool {
        range::check_submission(&self.range(), self.session.snapshot().page_count).is_ok()
    }

    /// Submit `range` for the loaded document and start polling the job.
    ///
    /// Nothing reaches the network unless a document is loaded and the range
    /// validates. A `File` source is uploaded on its first submission and the
    /// backend id reused afterwards.
    pub async fn on_range_submitted(&self, range: PageRange) -> Result<JobRun, SessionError> {
        self.set_range(range);

        let snap = self.session.snapshot();
        if snap.page_count == 0 {
            return Err(SessionError::NoDocumentLoaded);
        }
        let valid = range::check_submission(&range, snap.page_count)?;
        let source = snap.source.ok_or(SessionError::NoDocumentLoaded)?;
        let generation = snap.generation;

        let document_id = self.resolve_document_id(generation, &source).await?;
        self.ensure_current(generation)?;

        let ticket = self
            .engine
            .submit(&document_id, valid.from, valid.to)
            .await?;

        let poll = {
            let mut st = self.lock_state();
            if self.session.generation() != generation {
                debug!("Job {} created for a superseded document", ticket.job_id);
                return Err(SessionError::Superseded { generation });
            }
            let poll = self
                .engine
                .start_polling(&ticket.job_id, self.poll_defaults);
            if let Some(previous) = st.poll.replace(poll.handle()) {
                previous.cancel();
            }
            poll
        };

        Ok(JobRun { ticket, poll })
    }

    /// Cancel the active poll and release the document.
    pub fn on_teardown(&self) {
        let mut st = self.lock_state();
        if let Some(poll) = st.poll.take() {
            poll.cancel();
        }
        self.session.close();
        drop(st);
        info!("Session torn down");
    }

    /// Download a finished job's artifact; see [`save_result`].
    pub async fn download_result(
        &self,
        job_id: &str,
        dest: &Path,
    ) -> Result<PathBuf, SessionError> {
        save_result(self.api.as_ref(), job_id, dest).await
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_current(&self, generation: Generation) -> Result<(), SessionError> {
        if self.session.generation() == generation {
            Ok(())
        } else {
            Err(SessionError::Superseded { generation })
        }
    }

    async fn resolve_document_id(
        &self,
        generation: Generation,
        source: &DocumentSource,
    ) -> Result<String, SessionError> {
        let (name, bytes) = match source {
            DocumentSource::Remote { id } => return Ok(id.clone()),
            DocumentSource::File { name, bytes } => (name, bytes),
        };

        let cached = self
            .lock_state()
            .uploaded
            .as_ref()
            .filter(|(g, _)| *g == generation)
            .map(|(_, id)| id.clone());
        if let Some(id) = cached {
            debug!("Reusing uploaded document {}", id);
            return Ok(id);
        }

        let uploaded = self.api.upload_document(name, bytes.clone()).await?;
        info!("Uploaded '{}' as {}", name, uploaded.pdf_id);
        if self.session.generation() == generation {
            self.lock_state().uploaded = Some((generation, uploaded.pdf_id.clone()));
        }
        Ok(uploaded.pdf_id)
    }
}

/// One progress notification from [`JobRun::finish`].
#[derive(Debug)]
pub enum PollEvent<'a> {
    Status(&'a JobStatus),
    /// A check failed but polling continues.
    TransientError(&'a SessionError),
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded(JobStatus),
    Failed(JobStatus),
}

impl JobOutcome {
    pub fn status(&self) -> &JobStatus {
        match self {
            JobOutcome::Succeeded(s) | JobOutcome::Failed(s) => s,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded(_))
    }
}

/// A submitted job and its poll.
pub struct JobRun {
    pub ticket: JobTicket,
    pub poll: JobPoll,
}

impl JobRun {
    pub fn handle(&self) -> PollHandle {
        self.poll.handle()
    }

    /// Drive the poll to the end, reporting every check to `on_event`.
    ///
    /// Returns the terminal outcome, or the error that stopped polling
    /// (`NotFound`, `PollExhausted`, `PollCancelled`).
    pub async fn finish<F>(self, mut on_event: F) -> Result<JobOutcome, SessionError>
    where
        F: FnMut(PollEvent<'_>),
    {
        let JobRun { ticket, mut poll } = self;
        while let Some(item) = poll.next().await {
            match item {
                Ok(status) => {
                    on_event(PollEvent::Status(&status));
                    match status.state {
                        JobState::Succeeded => return Ok(JobOutcome::Succeeded(status)),
                        JobState::Failed => return Ok(JobOutcome::Failed(status)),
                        JobState::Pending | JobState::Running => {}
                    }
                }
                Err(e) if e.stops_polling() || matches!(e, SessionError::PollExhausted { .. }) => {
                    return Err(e)
                }
                Err(e) => on_event(PollEvent::TransientError(&e)),
            }
        }
        Err(SessionError::PollCancelled {
            job_id: ticket.job_id,
        })
    }
}
