//! Capability traits over the document rendering library.
//!
//! The session never touches pdfium directly. It opens bytes through a
//! [`DocumentBackend`] and rasterises pages through the returned
//! [`DocumentHandle`]; dropping the last `Arc` to a handle releases whatever
//! the library allocated for it.

use crate::error::SessionError;
use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;
use std::sync::Arc;

/// Rasterisation limits applied to every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterOptions {
    /// Longest rendered edge in pixels.
    pub max_pixels: u32,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self { max_pixels: 2000 }
    }
}

/// A rasterised page, ready to be written to a surface.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 1-based page number.
    pub page: u32,
    pub image: DynamicImage,
}

/// Opens raw document bytes.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn open(&self, bytes: Bytes) -> Result<Arc<dyn DocumentHandle>, SessionError>;
}

/// An opened document.
#[async_trait]
pub trait DocumentHandle: Send + Sync {
    /// Number of pages; always at least 1 for a handle the session keeps.
    fn page_count(&self) -> u32;

    /// Rasterise one page (1-based) off-screen.
    async fn rasterize(
        &self,
        page: u32,
        options: &RasterOptions,
    ) -> Result<RenderedPage, SessionError>;
}
