//! # grabr - media fetch engine over yt-dlp
//!
//! Lists the qualities a media page offers and fetches one of them, or the
//! audio track as MP3, into an isolated scratch slot.
//!
//! ## Features
//!
//! - Normalized, de-duplicated rendition lists ranked by resolution
//! - Validated yt-dlp format expressions
//! - Per-request work slots that are removed on every exit path
//! - Streaming or persisting the delivered file
//!
//! ## Example
//!
//! ```rust,no_run
//! use grabr::{DownloadRequest, Fetcher, YtDlpInspector};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = Fetcher::new(Arc::new(YtDlpInspector::new()));
//!
//!     let report = fetcher.probe("VIDEO_URL").await?;
//!     let best = report.options.first().map(|o| o.format_id.clone());
//!
//!     let delivery = fetcher
//!         .fetch(&DownloadRequest::video("VIDEO_URL", best))
//!         .await?;
//!     let saved = delivery.persist("./downloads").await?;
//!     println!("Saved: {}", saved.display());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod download;
pub mod error;
pub mod platform;
pub mod utils;

// Re-export main types
pub use self::core::{
    normalize, DownloadRequest, FetchOptions, Fetcher, MediaInfo, Mode, ProbeReport,
    RawStreamDescriptor, RenditionOption, Renditions, TargetFormat,
};
pub use download::{Delivery, DeliveryStream, WorkArea, WorkSlot};
pub use error::GrabError;
pub use platform::{InspectorError, MediaInspector, YtDlpInspector};

/// Result type alias for grabr operations
pub type Result<T> = std::result::Result<T, GrabError>;
