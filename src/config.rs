//! Configuration for the lesson backend client and the document session.
//!
//! All behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. One struct covers the HTTP endpoints, the poll
//! cadence and the rendering caps so a single value can be shared by the
//! session, the poll engine and the CLI.

use crate::error::SessionError;
use crate::poll::PollOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Placeholder replaced by the document id in [`ClientConfig::content_url_template`].
pub const ID_PLACEHOLDER: &str = "{id}";

/// Placeholder replaced by [`ClientConfig::base_url`] in the content template.
pub const BASE_PLACEHOLDER: &str = "{base}";

/// Configuration for a client session.
///
/// # Example
/// ```rust
/// use pdf_lesson_client::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("http://lessons.internal:8000/api")
///     .poll_interval_ms(1000)
///     .max_poll_attempts(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.poll_options().max_attempts, 60);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API root, without trailing slash. Default: `http://localhost:8000/api`.
    pub base_url: String,

    /// Where the raw bytes of a stored document live.
    ///
    /// `{base}` expands to [`Self::base_url`], `{id}` to the document id.
    /// Default: `{base}/pdfs/{id}/content`.
    pub content_url_template: String,

    /// Timeout for JSON API calls in seconds. Default: 30.
    pub request_timeout_secs: u64,

    /// Timeout for document and artifact downloads in seconds. Default: 120.
    ///
    /// Lesson bundles can be tens of megabytes, so downloads get a separate,
    /// longer budget than the status checks that run every few seconds.
    pub download_timeout_secs: u64,

    /// Delay between job status checks in milliseconds. Default: 2000.
    pub poll_interval_ms: u64,

    /// Maximum number of status checks before giving up. Default: 300.
    ///
    /// With the default interval this is ten minutes, which covers the
    /// longest lesson builds seen in practice.
    pub max_poll_attempts: u32,

    /// Longest edge of a rendered preview page in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// pdfium shared library, or a directory containing it.
    /// If None, `./` and then the system library path are tried.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            content_url_template: "{base}/pdfs/{id}/content".to_string(),
            request_timeout_secs: 30,
            download_timeout_secs: 120,
            poll_interval_ms: 2000,
            max_poll_attempts: 300,
            max_rendered_pixels: 2000,
            pdfium_lib_path: None,
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the content URL of a stored document.
    pub fn content_url(&self, document_id: &str) -> String {
        self.content_url_template
            .replace(BASE_PLACEHOLDER, &self.base_url)
            .replace(ID_PLACEHOLDER, document_id)
    }

    /// The poll cadence and budget used by [`crate::controller::SessionController`].
    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn content_url_template(mut self, template: impl Into<String>) -> Self {
        self.config.content_url_template = template.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn max_poll_attempts(mut self, n: u32) -> Self {
        self.config.max_poll_attempts = n;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, SessionError> {
        let c = &self.config;
        if reqwest::Url::parse(&c.base_url).is_err() {
            return Err(SessionError::InvalidConfig(format!(
                "base URL is not a valid URL: '{}'",
                c.base_url
            )));
        }
        if !c.content_url_template.contains(ID_PLACEHOLDER) {
            return Err(SessionError::InvalidConfig(format!(
                "content URL template must contain {ID_PLACEHOLDER}, got '{}'",
                c.content_url_template
            )));
        }
        if c.poll_interval_ms == 0 {
            return Err(SessionError::InvalidConfig(
                "Poll interval must be ≥ 1ms".into(),
            ));
        }
        if c.max_poll_attempts == 0 {
            return Err(SessionError::InvalidConfig(
                "Max poll attempts must be ≥ 1".into(),
            ));
        }
        if c.request_timeout_secs == 0 || c.download_timeout_secs == 0 {
            return Err(SessionError::InvalidConfig(
                "Timeouts must be ≥ 1s".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_contract() {
        let c = ClientConfig::default();
        assert_eq!(c.poll_interval_ms, 2000);
        assert_eq!(c.max_poll_attempts, 300);
        assert_eq!(
            c.content_url("abc"),
            "http://localhost:8000/api/pdfs/abc/content"
        );
    }

    #[test]
    fn builder_trims_trailing_slash() {
        let c = ClientConfig::builder()
            .base_url("http://example.com/api/")
            .build()
            .unwrap();
        assert_eq!(c.base_url, "http://example.com/api");
    }

    #[test]
    fn custom_content_template() {
        let c = ClientConfig::builder()
            .content_url_template("https://cdn.example.com/pdfs/{id}.pdf")
            .build()
            .unwrap();
        assert_eq!(c.content_url("x1"), "https://cdn.example.com/pdfs/x1.pdf");
    }

    #[test]
    fn rejects_zero_interval_and_budget() {
        assert!(ClientConfig::builder().poll_interval_ms(0).build().is_err());
        assert!(ClientConfig::builder().max_poll_attempts(0).build().is_err());
    }

    #[test]
    fn rejects_bad_url_and_template() {
        assert!(ClientConfig::builder().base_url("not a url").build().is_err());
        assert!(ClientConfig::builder()
            .content_url_template("{base}/pdfs/content")
            .build()
            .is_err());
    }

    #[test]
    fn poll_options_follow_config() {
        let c = ClientConfig::builder()
            .poll_interval_ms(500)
            .max_poll_attempts(4)
            .build()
            .unwrap();
        let opts = c.poll_options();
        assert_eq!(opts.interval, Duration::from_millis(500));
        assert_eq!(opts.max_attempts, 4);
    }
}
