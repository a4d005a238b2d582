//! Helpers shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;
use pdf_lesson_client::{
    ApiClient, ClientConfig, DocumentBackend, DocumentHandle, DocumentSession, FrameSlot,
    NoopObserver, RasterOptions, RenderedPage, SessionError, SessionSnapshot,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Document bytes understood by [`FakeBackend`].
pub fn fake_pdf(pages: u32) -> Bytes {
    Bytes::from(format!("%PDF-fake pages={pages}"))
}

/// Opens [`fake_pdf`] bytes without pdfium; every page renders as a 2x2 image.
pub struct FakeBackend;

#[async_trait]
impl DocumentBackend for FakeBackend {
    async fn open(&self, bytes: Bytes) -> Result<Arc<dyn DocumentHandle>, SessionError> {
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let pages: u32 = text
            .strip_prefix("%PDF-fake pages=")
            .and_then(|n| n.trim().parse().ok())
            .ok_or_else(|| SessionError::DocumentLoadFailed {
                origin: "document".into(),
                reason: "not a fake PDF".into(),
            })?;
        Ok(Arc::new(FakeHandle { pages }))
    }
}

struct FakeHandle {
    pages: u32,
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
        Ok(RenderedPage {
            page,
            image: DynamicImage::new_rgb8(2, 2),
        })
    }
}

/// Route library logs to the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config pointing at a mockito server, polling fast enough for real-time tests.
/// Also installs test logging.
pub fn config_for(server: &mockito::ServerGuard) -> ClientConfig {
    init_tracing();
    ClientConfig::builder()
        .base_url(format!("{}/api", server.url()))
        .poll_interval_ms(20)
        .max_poll_attempts(50)
        .request_timeout_secs(5)
        .build()
        .unwrap()
}

/// A session that talks HTTP to `config` but renders with [`FakeBackend`].
pub fn session_for(config: &ClientConfig, frame: &FrameSlot) -> (DocumentSession, Arc<ApiClient>) {
    let api = Arc::new(ApiClient::new(config).unwrap());
    let session = DocumentSession::new(
        Arc::new(FakeBackend),
        api.clone(),
        Box::new(frame.clone()),
        Arc::new(NoopObserver),
        RasterOptions::default(),
    );
    (session, api)
}

/// Wait (up to five seconds) for a snapshot matching `pred`.
pub async fn wait_for_snapshot(
    session: &DocumentSession,
    pred: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut rx = session.subscribe();
    let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("timed out waiting for session state")
        .expect("session dropped")
        .clone();
    snapshot
}
