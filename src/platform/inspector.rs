//! Media inspector abstraction

use crate::core::media_info::MediaInfo;
use crate::core::request::DownloadPlan;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Failure reported by an inspector, carried verbatim to the caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InspectorError(pub String);

impl InspectorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// External capability that lists a page's streams and materializes them.
///
/// Implementations must be safe to call concurrently.
#[async_trait]
pub trait MediaInspector: Send + Sync {
    /// Name of the inspector (for logging)
    fn name(&self) -> &'static str;

    /// Read metadata and the stream list without downloading anything
    async fn inspect(&self, url: &str) -> Result<MediaInfo, InspectorError>;

    /// Download according to `plan`, writing to `output_template`.
    ///
    /// The template contains an `%(ext)s` placeholder that the inspector
    /// replaces with the real extension.
    async fn download(
        &self,
        url: &str,
        plan: &DownloadPlan,
        output_template: &Path,
    ) -> Result<MediaInfo, InspectorError>;
}
