//! The document session state machine.
//!
//! ## Generations
//!
//! Every accepted source bumps a monotonically increasing generation counter.
//! Loads and renders run as detached Tokio tasks and carry the generation they
//! were started under; at every resumption point they re-check it under the
//! state lock and drop their result if a newer source (or a close) has moved
//! the counter on. Nothing is ever aborted: stale work simply finds it no
//! longer owns the session.
//!
//! Renders additionally carry a sequence number, bumped whenever the cursor
//! moves. A slow render of page 2 that resolves after page 3 was requested is
//! therefore discarded even though the generation still matches.
//!
//! ## Locking
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`. The surface has its own mutex; a finished render takes the
//! surface lock first and only then checks `(generation, sequence)`, so the
//! check and the write are atomic with respect to other renders. Presenting
//! runs on the blocking pool since surfaces may do file I/O.
//!
//! Observer notifications are sent after the state lock is released. An
//! observer can therefore hear about generation `g` after
//! `on_load_started(g + 1)`; compare generations if ordering matters.

use super::backend::{DocumentBackend, DocumentHandle, RasterOptions};
use super::source::DocumentSource;
use super::surface::PageSurface;
use crate::api::RemoteApi;
use crate::error::SessionError;
use crate::observer::{SharedObserver, StaleStage};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

/// Identifies one accepted source. Bumped on every `load` and on `close`.
pub type Generation = u64;

/// A render of `page` for `generation`, valid while `sequence` is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    pub generation: Generation,
    pub page: u32,
    pub sequence: u64,
}

/// Point-in-time view of the session, published on every state change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub generation: Generation,
    pub source: Option<DocumentSource>,
    /// A load for `generation` is in flight.
    pub loading: bool,
    /// 0 until the current generation's document is open.
    pub page_count: u32,
    pub current_page: u32,
    /// Most recent load or render failure of the current generation.
    pub last_error: Option<String>,
}

struct State {
    generation: Generation,
    source: Option<DocumentSource>,
    handle: Option<Arc<dyn DocumentHandle>>,
    page_count: u32,
    current_page: u32,
    render_seq: u64,
    loading: bool,
    last_error: Option<String>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            generation: 0,
            source: None,
            handle: None,
            page_count: 0,
            current_page: 1,
            render_seq: 0,
            loading: false,
            last_error: None,
        }
    }
}

impl State {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            generation: self.generation,
            source: self.source.clone(),
            loading: self.loading,
            page_count: self.page_count,
            current_page: self.current_page,
            last_error: self.last_error.clone(),
        }
    }

    fn next_render(&mut self) -> RenderRequest {
        self.render_seq += 1;
        RenderRequest {
            generation: self.generation,
            page: self.current_page,
            sequence: self.render_seq,
        }
    }
}

struct Inner {
    backend: Arc<dyn DocumentBackend>,
    api: Arc<dyn RemoteApi>,
    surface: Mutex<Box<dyn PageSurface>>,
    observer: SharedObserver,
    raster: RasterOptions,
    state: Mutex<State>,
    snapshot: watch::Sender<SessionSnapshot>,
}

/// Owns "which document is loaded and which page is current".
///
/// Cheap to clone; clones share the same session. `load`, `next_page` and
/// `prev_page` spawn Tokio tasks and must be called from within a runtime.
#[derive(Clone)]
pub struct DocumentSession {
    inner: Arc<Inner>,
}

impl DocumentSession {
    pub fn new(
        backend: Arc<dyn DocumentBackend>,
        api: Arc<dyn RemoteApi>,
        surface: Box<dyn PageSurface>,
        observer: SharedObserver,
        raster: RasterOptions,
    ) -> Self {
        let state = State::default();
        let (snapshot, _) = watch::channel(state.snapshot());
        Self {
            inner: Arc::new(Inner {
                backend,
                api,
                surface: Mutex::new(surface),
                observer,
                raster,
                state: Mutex::new(state),
                snapshot,
            }),
        }
    }

    /// Accept a new source and start loading it in the background.
    ///
    /// Returns the generation the load runs under. Any previous document is
    /// released immediately and any in-flight load or render for it becomes
    /// stale. Progress is observable through [`Self::subscribe`] and the
    /// observer.
    pub fn load(&self, source: DocumentSource) -> Generation {
        let generation = {
            let mut st = self.lock_state();
            st.generation += 1;
            st.source = Some(source.clone());
            st.handle = None;
            st.page_count = 0;
            st.current_page = 1;
            st.loading = true;
            st.last_error = None;
            self.publish(&st);
            st.generation
        };

        info!("Loading {} (generation {})", source.label(), generation);
        self.inner.observer.on_load_started(generation, &source);

        let session = self.clone();
        tokio::spawn(async move {
            session.run_load(generation, source).await;
        });
        generation
    }

    /// Move to the next page. Returns false, and renders nothing, if there is
    /// no document or the cursor is already on the last page.
    pub fn next_page(&self) -> bool {
        self.step(1)
    }

    /// Move to the previous page. Returns false, and renders nothing, if
    /// there is no document or the cursor is already on page 1.
    pub fn prev_page(&self) -> bool {
        self.step(-1)
    }

    /// The render that would currently be allowed to reach the surface.
    pub fn current_render_target(&self) -> Option<RenderRequest> {
        let st = self.lock_state();
        st.handle.as_ref()?;
        Some(RenderRequest {
            generation: st.generation,
            page: st.current_page,
            sequence: st.render_seq,
        })
    }

    /// Release the document and invalidate all in-flight work.
    pub fn close(&self) {
        let mut st = self.lock_state();
        st.generation += 1;
        st.source = None;
        st.handle = None;
        st.page_count = 0;
        st.current_page = 1;
        st.loading = false;
        st.last_error = None;
        self.publish(&st);
        debug!("Session closed (generation {})", st.generation);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Receive a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// The current snapshot followed by every later one, as a `Stream`.
    pub fn snapshots(&self) -> WatchStream<SessionSnapshot> {
        WatchStream::new(self.subscribe())
    }

    pub fn generation(&self) -> Generation {
        self.lock_state().generation
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &State) {
        self.inner.snapshot.send_replace(state.snapshot());
    }

    fn step(&self, delta: i64) -> bool {
        let (handle, request) = {
            let mut st = self.lock_state();
            let Some(handle) = st.handle.clone() else {
                return false;
            };
            let target = i64::from(st.current_page) + delta;
            if target < 1 || target > i64::from(st.page_count) {
                return false;
            }
            st.current_page = target as u32;
            let request = st.next_render();
            self.publish(&st);
            (handle, request)
        };

        let session = self.clone();
        tokio::spawn(async move {
            session.render(handle, request).await;
        });
        true
    }

    async fn run_load(&self, generation: Generation, source: DocumentSource) {
        let result = self.open_source(&source).await;

        let outcome = {
            let mut st = self.lock_state();
            if st.generation != generation {
                None
            } else {
                st.loading = false;
                let outcome = match result {
                    Ok(handle) => {
                        st.page_count = handle.page_count();
                        st.current_page = 1;
                        st.handle = Some(handle.clone());
                        Ok((handle, st.next_render()))
                    }
                    Err(e) => {
                        st.last_error = Some(e.to_string());
                        Err(e)
                    }
                };
                self.publish(&st);
                Some(outcome)
            }
        };

        match outcome {
            None => {
                debug!("Discarding stale load of generation {}", generation);
                self.inner
                    .observer
                    .on_stale_discarded(generation, StaleStage::Load);
            }
            Some(Ok((handle, request))) => {
                let page_count = handle.page_count();
                info!("Generation {} loaded: {} pages", generation, page_count);
                self.inner.observer.on_document_loaded(generation, page_count);
                self.render(handle, request).await;
            }
            Some(Err(e)) => {
                warn!("Load of {} failed: {}", source.label(), e);
                self.inner.observer.on_load_failed(generation, &source, &e);
            }
        }
    }

    async fn open_source(
        &self,
        source: &DocumentSource,
    ) -> Result<Arc<dyn DocumentHandle>, SessionError> {
        let bytes = match source {
            DocumentSource::File { bytes, .. } => bytes.clone(),
            DocumentSource::Remote { id } => self
                .inner
                .api
                .fetch_document(id)
                .await
                .map_err(|e| attribute(source, e))?,
        };

        let handle = self
            .inner
            .backend
            .open(bytes)
            .await
            .map_err(|e| attribute(source, e))?;

        if handle.page_count() == 0 {
            return Err(SessionError::DocumentLoadFailed {
                origin: source.label(),
                reason: "document has no pages".to_string(),
            });
        }
        Ok(handle)
    }

    async fn render(&self, handle: Arc<dyn DocumentHandle>, request: RenderRequest) {
        let result = handle.rasterize(request.page, &self.inner.raster).await;
        drop(handle);

        // Surfaces may encode and write files, so present on the blocking pool.
        let session = self.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let mut surface = session
                .inner
                .surface
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !session.is_current(&request) {
                None
            } else {
                Some(result.and_then(|page| surface.present(&page)))
            }
        })
        .await
        .unwrap_or_else(|e| {
            Some(Err(SessionError::Internal(format!(
                "Present task panicked: {e}"
            ))))
        });

        let observer = &self.inner.observer;
        match outcome {
            None => {
                debug!(
                    "Discarding stale render of page {} (generation {}, seq {})",
                    request.page, request.generation, request.sequence
                );
                observer.on_stale_discarded(request.generation, StaleStage::Render);
            }
            Some(Ok(())) => {
                debug!("Page {} on surface", request.page);
                observer.on_page_rendered(request.generation, request.page);
            }
            Some(Err(e)) => {
                warn!("Rendering page {} failed: {}", request.page, e);
                {
                    let mut st = self.lock_state();
                    if st.generation == request.generation {
                        st.last_error = Some(e.to_string());
                        self.publish(&st);
                    }
                }
                observer.on_render_failed(request.generation, request.page, &e);
            }
        }
    }

    fn is_current(&self, request: &RenderRequest) -> bool {
        let st = self.lock_state();
        st.generation == request.generation && st.render_seq == request.sequence
    }
}

/// Attach the source to a load error so the user can tell which load failed.
fn attribute(source: &DocumentSource, error: SessionError) -> SessionError {
    match error {
        SessionError::DocumentLoadFailed { reason, .. } => SessionError::DocumentLoadFailed {
            origin: source.label(),
            reason,
        },
        SessionError::PasswordRequired { .. } => SessionError::PasswordRequired {
            origin: source.label(),
        },
        e @ SessionError::PdfiumBindingFailed(_) => e,
        other => SessionError::DocumentLoadFailed {
            origin: source.label(),
            reason: other.to_string(),
        },
    }
}
