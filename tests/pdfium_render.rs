//! Rendering tests against a real pdfium library.
//!
//! Gated behind `E2E_ENABLED` because they need libpdfium on the machine.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test pdfium_render

use bytes::Bytes;
use pdf_lesson_client::{
    ApiClient, ClientConfig, DocumentBackend, DocumentSession, DocumentSource, FrameSlot,
    NoopObserver, PdfiumBackend, RasterOptions, SessionError,
};
use std::sync::Arc;

mod common;

macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run pdfium tests");
            return;
        }
    };
}

fn backend() -> PdfiumBackend {
    PdfiumBackend::new(std::env::var_os("PDFIUM_LIB_PATH").map(Into::into))
}

/// Build a minimal PDF with `pages` blank A4-ish pages and a correct xref table.
fn blank_pdf(pages: u32) -> Bytes {
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            (0..pages)
                .map(|i| format!("{} 0 R", i + 3))
                .collect::<Vec<_>>()
                .join(" "),
            pages
        ),
    ];
    for _ in 0..pages {
        objects.push("<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] >>".to_string());
    }

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }
    let xref = out.len();
    out.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for off in offsets {
        out.push_str(&format!("{off:010} 00000 n \n"));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref
    ));
    Bytes::from(out)
}

#[tokio::test]
async fn opens_and_rasterises_within_pixel_cap() {
    e2e_skip_unless_enabled!();
    let handle = backend().open(blank_pdf(3)).await.unwrap();
    assert_eq!(handle.page_count(), 3);

    let page = handle
        .rasterize(2, &RasterOptions { max_pixels: 400 })
        .await
        .unwrap();
    assert_eq!(page.page, 2);
    assert!(page.image.width() <= 400 && page.image.height() <= 400);
}

#[tokio::test]
async fn page_outside_document_is_rasterisation_error() {
    e2e_skip_unless_enabled!();
    let handle = backend().open(blank_pdf(1)).await.unwrap();
    let err = handle
        .rasterize(2, &RasterOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::RasterisationFailed { page: 2, .. }));
}

#[tokio::test]
async fn truncated_pdf_fails_to_open() {
    e2e_skip_unless_enabled!();
    let result = backend()
        .open(Bytes::from_static(b"%PDF-1.4\n1 0 obj\n<<"))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn session_renders_first_page() {
    e2e_skip_unless_enabled!();
    let frame = FrameSlot::new();
    let session = DocumentSession::new(
        Arc::new(backend()),
        Arc::new(ApiClient::new(&ClientConfig::default()).unwrap()),
        Box::new(frame.clone()),
        Arc::new(NoopObserver),
        RasterOptions { max_pixels: 300 },
    );

    session.load(DocumentSource::file("blank.pdf", blank_pdf(2)));
    common::wait_for_snapshot(&session, |s| s.page_count == 2).await;

    // The first render lands shortly after the load completes.
    for _ in 0..100 {
        if frame.page().is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    let rendered = frame.latest().expect("page 1 was never rendered");
    assert_eq!(rendered.page, 1);
    assert!(rendered.image.height() <= 300);
}
