//! Where a document's bytes come from.

use crate::error::SessionError;
use bytes::Bytes;
use std::fmt;
use std::path::Path;

/// The origin of a document for one load attempt.
///
/// Immutable once handed to [`crate::document::DocumentSession::load`];
/// cloning is cheap because the bytes are reference-counted.
#[derive(Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Bytes supplied locally, e.g. a file picked for upload.
    File { name: String, bytes: Bytes },
    /// A document already stored on the backend.
    Remote { id: String },
}

impl DocumentSource {
    pub fn file(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        DocumentSource::File {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn remote(id: impl Into<String>) -> Self {
        DocumentSource::Remote { id: id.into() }
    }

    /// Read a local file into a `File` source.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SessionError::DocumentLoadFailed {
                origin: format!("'{}'", path.display()),
                reason: e.to_string(),
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        Ok(Self::file(name, bytes))
    }

    /// The stored document id, if this source already lives on the backend.
    pub fn remote_id(&self) -> Option<&str> {
        match self {
            DocumentSource::Remote { id } => Some(id),
            DocumentSource::File { .. } => None,
        }
    }

    /// Short human-readable description for logs and error messages.
    pub fn label(&self) -> String {
        match self {
            DocumentSource::File { name, bytes } => {
                format!("file '{}' ({} bytes)", name, bytes.len())
            }
            DocumentSource::Remote { id } => format!("remote '{id}'"),
        }
    }
}

// Never dump document bytes into logs.
impl fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::File { name, bytes } => f
                .debug_struct("File")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
            DocumentSource::Remote { id } => f.debug_struct("Remote").field("id", id).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        assert_eq!(DocumentSource::remote("abc").label(), "remote 'abc'");
        assert_eq!(
            DocumentSource::file("a.pdf", vec![0u8; 12]).label(),
            "file 'a.pdf' (12 bytes)"
        );
    }

    #[test]
    fn debug_hides_bytes() {
        let dbg = format!("{:?}", DocumentSource::file("a.pdf", vec![7u8; 3]));
        assert!(dbg.contains("len: 3"), "got: {dbg}");
        assert!(!dbg.contains("[7"), "got: {dbg}");
    }

    #[tokio::test]
    async fn from_path_reads_bytes_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let src = DocumentSource::from_path(&path).await.unwrap();
        assert_eq!(src, DocumentSource::file("notes.pdf", b"%PDF-1.4".to_vec()));
        assert_eq!(src.remote_id(), None);
    }

    #[tokio::test]
    async fn from_path_missing_file_is_load_failure() {
        let err = DocumentSource::from_path("/definitely/not/here.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::DocumentLoadFailed { .. }));
    }
}
