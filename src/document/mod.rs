//! Document session: load a PDF from some source and page through it.
//!
//! ## Data Flow
//!
//! ```text
//! DocumentSource ──▶ bytes ──▶ DocumentBackend::open ──▶ DocumentHandle
//! (file | remote id)  (fetch)     (pdfium, blocking)          │
//!                                                             ▼
//!                          PageSurface ◀── guard ◀── rasterize(current page)
//! ```
//!
//! 1. [`source`]:  where the bytes come from
//! 2. [`backend`]: capability traits over the rendering library
//! 3. [`pdfium`]:  the pdfium-render implementation of those traits
//! 4. [`surface`]: where rendered pages are written
//! 5. [`session`]: the generation-guarded state machine tying them together

pub mod backend;
pub mod pdfium;
pub mod session;
pub mod source;
pub mod surface;

pub use backend::{DocumentBackend, DocumentHandle, RasterOptions, RenderedPage};
pub use pdfium::PdfiumBackend;
pub use session::{DocumentSession, Generation, RenderRequest, SessionSnapshot};
pub use source::DocumentSource;
pub use surface::{FrameSlot, PageSurface, PngFileSurface};
