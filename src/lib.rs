//! # pdf-lesson-client
//!
//! Client-side pipeline for a PDF-to-lesson backend: open a PDF from a local
//! file or a stored document id, page through it, pick a page range, submit it
//! as a job and poll the job until it finishes.
//!
//! ## Why this crate?
//!
//! Every step of that flow is asynchronous and the user can change their mind
//! at any point: pick another document while the first is still downloading,
//! flip pages faster than they render, navigate away while a job is running.
//! This crate makes those races harmless. Each accepted document gets a
//! *generation*; every background result is checked against it before it may
//! touch state, and polls are bounded and cancellable.
//!
//! ## Pipeline Overview
//!
//! ```text
//! DocumentSource (file | remote id)
//!  │
//!  ├─ 1. Load     fetch bytes, open via pdfium (spawn_blocking)   generation-guarded
//!  ├─ 2. Preview  rasterise current page → PageSurface            (generation, seq)-guarded
//!  ├─ 3. Range    validate [from, to] against the page count      local only
//!  ├─ 4. Submit   upload if needed, POST /jobs                    → JobTicket
//!  └─ 5. Poll     GET /jobs/{id} every 2 s, ≤ 300 checks          → JobOutcome
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_lesson_client::{
//!     ClientConfig, DocumentSource, FrameSlot, NoopObserver, PageRange, PollEvent,
//!     SessionController,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("http://localhost:8000/api")
//!         .build()?;
//!     let frame = FrameSlot::new();
//!     let controller =
//!         SessionController::new(&config, Box::new(frame.clone()), Arc::new(NoopObserver))?;
//!
//!     controller.on_source_selected(DocumentSource::from_path("slides.pdf").await?);
//!     let mut updates = controller.session().subscribe();
//!     updates.wait_for(|s| s.page_count > 0).await?;
//!
//!     let run = controller.on_range_submitted(PageRange::new(1, 5)).await?;
//!     let job_id = run.ticket.job_id.clone();
//!     let outcome = run
//!         .finish(|event| {
//!             if let PollEvent::Status(s) = event {
//!                 eprintln!("job is {}", s.state);
//!             }
//!         })
//!         .await?;
//!
//!     if outcome.is_success() {
//!         controller.download_result(&job_id, std::path::Path::new(".")).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `lessonctl` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-lesson-client = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod observer;
pub mod poll;
pub mod range;

#[cfg(test)]
mod test_utils;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::{
    save_result, ApiClient, CreateJobRequest, DocumentInfo, JobState, JobStatus, JobTicket,
    RemoteApi, StoredDocument, UploadedDocument,
};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use controller::{JobOutcome, JobRun, PollEvent, SessionController};
pub use document::{
    DocumentBackend, DocumentHandle, DocumentSession, DocumentSource, FrameSlot, Generation,
    PageSurface, PdfiumBackend, PngFileSurface, RasterOptions, RenderRequest, RenderedPage,
    SessionSnapshot,
};
pub use error::{RangeError, SessionError};
pub use observer::{NoopObserver, SessionObserver, SharedObserver, StaleStage};
pub use poll::{JobPoll, JobPollEngine, PollHandle, PollOptions};
pub use range::{FieldError, FieldErrors, PageRange, ValidRange};
