//! Observer hook for document-session events.
//!
//! Inject an [`Arc<dyn SessionObserver>`] into
//! [`crate::document::DocumentSession`] (or the controller) to receive events
//! as documents load and pages render. State itself is published through
//! [`crate::document::DocumentSession::subscribe`]; the observer carries the
//! events that a state snapshot cannot express, such as *which* source failed
//! and why, or that a stale result was thrown away.
//!
//! A load or render result is only reported once it passed the generation
//! guard; results that fail it are reported through
//! [`SessionObserver::on_stale_discarded`]. Notifications are sent outside the
//! session lock, so a `on_document_loaded(g)` may still arrive after
//! `on_load_started(g + 1)`. Observers that care about ordering should ignore
//! events older than the newest generation they have seen.
//!
//! # Example
//!
//! ```rust
//! use pdf_lesson_client::SessionObserver;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! #[derive(Default)]
//! struct RenderCounter {
//!     rendered: AtomicUsize,
//! }
//!
//! impl SessionObserver for RenderCounter {
//!     fn on_page_rendered(&self, _generation: u64, page: u32) {
//!         self.rendered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page} on screen");
//!     }
//! }
//! ```

use crate::document::DocumentSource;
use crate::error::SessionError;
use std::sync::Arc;

/// Which step of an asynchronous chain produced a result that was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleStage {
    /// A document load finished after a newer source was selected.
    Load,
    /// A page render finished after a newer render or document superseded it.
    Render,
}

/// Called by the document session as it loads documents and renders pages.
///
/// Implementations must be `Send + Sync`: loads and renders run as separate
/// Tokio tasks. All methods have default no-op implementations so callers
/// only override what they care about.
pub trait SessionObserver: Send + Sync {
    /// A new source was accepted and its load started.
    fn on_load_started(&self, generation: u64, source: &DocumentSource) {
        let _ = (generation, source);
    }

    /// The current generation's document opened successfully.
    fn on_document_loaded(&self, generation: u64, page_count: u32) {
        let _ = (generation, page_count);
    }

    /// The current generation's document could not be loaded.
    fn on_load_failed(&self, generation: u64, source: &DocumentSource, error: &SessionError) {
        let _ = (generation, source, error);
    }

    /// A page was written to the output surface.
    fn on_page_rendered(&self, generation: u64, page: u32) {
        let _ = (generation, page);
    }

    /// Rasterising or presenting the current page failed.
    fn on_render_failed(&self, generation: u64, page: u32, error: &SessionError) {
        let _ = (generation, page, error);
    }

    /// A result from an outdated chain was dropped without touching state.
    fn on_stale_discarded(&self, generation: u64, stage: StaleStage) {
        let _ = (generation, stage);
    }
}

/// A no-op implementation for callers that don't need events.
///
/// This is the default when no observer is configured.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Convenience alias for the shared observer type.
pub type SharedObserver = Arc<dyn SessionObserver>;
