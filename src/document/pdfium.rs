//! pdfium-render implementation of the rendering capability.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is CPU-bound
//! and not async-aware. Every call runs on Tokio's blocking pool so the
//! session's load and render chains never stall a worker thread.
//!
//! ## Why re-open per page?
//!
//! A `PdfDocument` borrows the `Pdfium` bindings it was loaded from, so it
//! cannot be stored next to them in a `Send + 'static` handle. The handle
//! keeps the (reference-counted) bytes instead and re-opens them on the
//! blocking thread for each rasterisation. Opening an in-memory PDF costs a
//! few milliseconds, far below the render itself.

use super::backend::{DocumentBackend, DocumentHandle, RasterOptions, RenderedPage};
use crate::error::SessionError;
use async_trait::async_trait;
use bytes::Bytes;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Opens documents with pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    lib_path: Option<PathBuf>,
}

impl PdfiumBackend {
    /// `lib_path` is the pdfium shared library or a directory containing it.
    /// If None, `./` and then the system library path are tried.
    pub fn new(lib_path: Option<PathBuf>) -> Self {
        Self { lib_path }
    }
}

#[async_trait]
impl DocumentBackend for PdfiumBackend {
    async fn open(&self, bytes: Bytes) -> Result<Arc<dyn DocumentHandle>, SessionError> {
        check_magic(&bytes)?;

        let lib_path = self.lib_path.clone();
        let for_open = bytes.clone();
        let page_count = tokio::task::spawn_blocking(move || {
            let pdfium = bind_pdfium(lib_path.as_deref())?;
            let document = load(&pdfium, &for_open)?;
            Ok::<u32, SessionError>(u32::from(document.pages().len()))
        })
        .await
        .map_err(|e| SessionError::Internal(format!("Open task panicked: {e}")))??;

        info!("PDF opened: {} pages", page_count);

        Ok(Arc::new(PdfiumDocument {
            bytes,
            page_count,
            lib_path: self.lib_path.clone(),
        }))
    }
}

/// An opened document: its bytes plus the page count read at open time.
struct PdfiumDocument {
    bytes: Bytes,
    page_count: u32,
    lib_path: Option<PathBuf>,
}

#[async_trait]
impl DocumentHandle for PdfiumDocument {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    async fn rasterize(
        &self,
        page: u32,
        options: &RasterOptions,
    ) -> Result<RenderedPage, SessionError> {
        if page == 0 || page > self.page_count {
            return Err(SessionError::RasterisationFailed {
                page,
                detail: format!("out of range (document has {} pages)", self.page_count),
            });
        }

        let bytes = self.bytes.clone();
        let lib_path = self.lib_path.clone();
        let max_pixels = options.max_pixels;

        tokio::task::spawn_blocking(move || {
            render_page_blocking(&bytes, lib_path.as_deref(), page, max_pixels)
        })
        .await
        .map_err(|e| SessionError::Internal(format!("Render task panicked: {e}")))?
    }
}

/// Blocking implementation of single-page rendering.
fn render_page_blocking(
    bytes: &[u8],
    lib_path: Option<&Path>,
    page: u32,
    max_pixels: u32,
) -> Result<RenderedPage, SessionError> {
    let pdfium = bind_pdfium(lib_path)?;
    let document = load(&pdfium, bytes)?;

    let raster_err = |e: PdfiumError| SessionError::RasterisationFailed {
        page,
        detail: format!("{:?}", e),
    };

    let index = u16::try_from(page - 1).map_err(|_| SessionError::RasterisationFailed {
        page,
        detail: "page index exceeds pdfium's range".to_string(),
    })?;
    let pdf_page = document.pages().get(index).map_err(raster_err)?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let bitmap = pdf_page
        .render_with_config(&render_config)
        .map_err(raster_err)?;
    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page,
        image.width(),
        image.height()
    );

    Ok(RenderedPage { page, image })
}

fn load<'a>(pdfium: &'a Pdfium, bytes: &'a [u8]) -> Result<PdfDocument<'a>, SessionError> {
    pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            SessionError::PasswordRequired {
                origin: "document".to_string(),
            }
        } else {
            SessionError::DocumentLoadFailed {
                origin: "document".to_string(),
                reason: err_str,
            }
        }
    })
}

/// Bind to pdfium: the configured path first, else `./`, else the system library.
fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, SessionError> {
    let bindings = match lib_path {
        Some(path) if path.is_file() => Pdfium::bind_to_library(path),
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| SessionError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Reject anything that does not start with the `%PDF` magic bytes before
/// pdfium ever sees it.
fn check_magic(bytes: &[u8]) -> Result<(), SessionError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(SessionError::DocumentLoadFailed {
            origin: "document".to_string(),
            reason: format!("not a PDF (first bytes: {:?})", magic),
        });
    }
    Ok(())
}
