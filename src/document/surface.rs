//! Output surfaces for rendered pages.
//!
//! A surface is the single place a rendered page ends up. The session writes
//! to it only after the render's generation and sequence checks pass, so a
//! surface never sees a page from a superseded render.

use super::backend::RenderedPage;
use crate::error::SessionError;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Receives the page that is currently on screen.
pub trait PageSurface: Send {
    fn present(&mut self, page: &RenderedPage) -> Result<(), SessionError>;
}

/// In-memory surface holding the most recently presented page.
///
/// Clones share the same slot, so one clone can be handed to the session and
/// another kept by the caller to read the frame back.
#[derive(Debug, Clone, Default)]
pub struct FrameSlot {
    frame: Arc<Mutex<Option<RenderedPage>>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The page currently on the surface, if any.
    pub fn latest(&self) -> Option<RenderedPage> {
        self.frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Page number currently on the surface.
    pub fn page(&self) -> Option<u32> {
        self.frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|p| p.page)
    }
}

impl PageSurface for FrameSlot {
    fn present(&mut self, page: &RenderedPage) -> Result<(), SessionError> {
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner) = Some(page.clone());
        Ok(())
    }
}

/// Writes each presented page to a PNG file, overwriting the previous one.
#[derive(Debug, Clone)]
pub struct PngFileSurface {
    path: PathBuf,
}

impl PngFileSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageSurface for PngFileSurface {
    fn present(&mut self, page: &RenderedPage) -> Result<(), SessionError> {
        page.image
            .save_with_format(&self.path, image::ImageFormat::Png)
            .map_err(|e| match e {
                image::ImageError::IoError(source) => SessionError::OutputWriteFailed {
                    path: self.path.clone(),
                    source,
                },
                other => SessionError::Internal(format!("PNG encoding failed: {other}")),
            })?;
        debug!("Wrote page {} to {}", page.page, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    fn page(n: u32) -> RenderedPage {
        RenderedPage {
            page: n,
            image: DynamicImage::new_rgb8(4, 6),
        }
    }

    #[test]
    fn frame_slot_clones_share_the_frame() {
        let slot = FrameSlot::new();
        let mut writer = slot.clone();
        assert_eq!(slot.page(), None);

        writer.present(&page(3)).unwrap();
        assert_eq!(slot.page(), Some(3));
        assert_eq!(slot.latest().unwrap().image.height(), 6);
    }

    #[test]
    fn png_surface_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut surface = PngFileSurface::new(dir.path().join("page.png"));
        surface.present(&page(1)).unwrap();

        let written = image::open(surface.path()).unwrap();
        assert_eq!((written.width(), written.height()), (4, 6));
    }

    #[test]
    fn png_surface_reports_unwritable_path() {
        let mut surface = PngFileSurface::new("/definitely/not/a/dir/page.png");
        let err = surface.present(&page(1)).unwrap_err();
        assert!(
            matches!(err, SessionError::OutputWriteFailed { .. }),
            "got: {err:?}"
        );
    }
}
