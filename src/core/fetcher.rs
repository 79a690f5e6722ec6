//! Fetch orchestration.
//!
//! [`Fetcher::probe`] lists the renditions a page offers without touching the
//! filesystem. [`Fetcher::fetch`] materializes one request into its own work
//! slot and hands back a [`Delivery`]. Every failure after slot allocation
//! drops the slot, which removes it from disk.

use crate::core::rendition::{normalize, RenditionOption};
use crate::core::request::DownloadRequest;
use crate::download::{Delivery, WorkArea};
use crate::error::GrabError;
use crate::platform::MediaInspector;
use crate::utils::{to_safe_filename, validate_source_url};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Fetcher configuration
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Scratch root that work slots are created under
    pub work_root: PathBuf,
    /// Upper bound for one download; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            work_root: WorkArea::default_root(),
            timeout: None,
        }
    }
}

/// What a page offers, as shown to the user before fetching
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub options: Vec<RenditionOption>,
    pub audio_available: bool,
    pub title: String,
    pub thumbnail: String,
    pub webpage_url: String,
}

/// Drives an inspector through probe and fetch requests
pub struct Fetcher {
    options: FetchOptions,
    inspector: Arc<dyn MediaInspector>,
    work_area: WorkArea,
}

impl Fetcher {
    /// Create a fetcher with default options
    pub fn new(inspector: Arc<dyn MediaInspector>) -> Self {
        let options = FetchOptions::default();
        let work_area = WorkArea::new(&options.work_root);
        Self {
            options,
            inspector,
            work_area,
        }
    }

    /// Set the scratch root
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.options.work_root = root.into();
        self.work_area = WorkArea::new(&self.options.work_root);
        self
    }

    /// Bound each download by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    pub fn work_area(&self) -> &WorkArea {
        &self.work_area
    }

    /// List the renditions available at `url`
    pub async fn probe(&self, url: &str) -> Result<ProbeReport, GrabError> {
        validate_source_url(url)?;
        let url = url.trim();
        info!("Probing {} via {}", url, self.inspector.name());

        let media = self
            .inspector
            .inspect(url)
            .await
            .map_err(|e| GrabError::ProbeFailed(e.0))?;

        let renditions = normalize(&media.formats);
        debug!(
            "Normalized {} raw streams into {} options (audio: {})",
            media.formats.len(),
            renditions.options.len(),
            renditions.audio_available
        );

        let webpage_url = media
            .webpage_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(url)
            .to_string();

        Ok(ProbeReport {
            options: renditions.options,
            audio_available: renditions.audio_available,
            title: media.display_title(),
            thumbnail: media.best_thumbnail(),
            webpage_url,
        })
    }

    /// Download and convert one request into a fresh work slot
    pub async fn fetch(&self, request: &DownloadRequest) -> Result<Delivery, GrabError> {
        let plan = request.plan()?;
        let source_url = request.source_url.trim();
        let extension = plan.target.extension();

        let slot = self.work_area.allocate().await?;
        debug!("Slot {} allocated", slot.slot_id());
        info!(
            "Fetching {} as {} with format {}",
            source_url, extension, plan.format
        );

        let template = slot.output_template();
        let download = self
            .inspector
            .download(source_url, &plan, &template);

        debug!("Slot {} fetching", slot.slot_id());
        let outcome = match self.options.timeout {
            Some(limit) => match tokio::time::timeout(limit, download).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        "Slot {} timed out after {}",
                        slot.slot_id(),
                        humantime::format_duration(limit)
                    );
                    return Err(GrabError::FetchFailed("timeout".to_string()));
                }
            },
            None => download.await,
        };

        let media = match outcome {
            Ok(media) => media,
            Err(e) => {
                debug!("Slot {} failed: {}", slot.slot_id(), e);
                return Err(GrabError::FetchFailed(e.0));
            }
        };

        let path = match slot.resolve_output(extension) {
            Ok(path) => path,
            Err(e) => {
                error!("{}", e);
                return Err(e);
            }
        };

        let suggested_filename = to_safe_filename(media.source_title(), extension);
        debug!("Slot {} succeeded with {:?}", slot.slot_id(), path);
        info!("Fetched {}", suggested_filename);

        Ok(Delivery::new(
            slot,
            path,
            plan.target.mime_type(),
            suggested_filename,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::media_info::{MediaInfo, RawStreamDescriptor, Thumbnail};
    use crate::core::request::DownloadPlan;
    use crate::error::ErrorKind;
    use crate::platform::InspectorError;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;
    use tokio_test::{assert_err, assert_ok};

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    /// Scripted inspector; writes the source URL into the output file
    #[derive(Default)]
    struct FakeInspector {
        media: MediaInfo,
        inspect_error: Option<String>,
        download_error: Option<String>,
        writes_ext: Option<&'static str>,
        delay: Duration,
        downloads: AtomicUsize,
        last_format: Mutex<Option<String>>,
    }

    impl FakeInspector {
        fn writing(ext: &'static str, title: &str) -> Self {
            Self {
                media: MediaInfo {
                    title: Some(title.to_string()),
                    ..MediaInfo::default()
                },
                writes_ext: Some(ext),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl MediaInspector for FakeInspector {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn inspect(&self, _url: &str) -> Result<MediaInfo, InspectorError> {
            match &self.inspect_error {
                Some(message) => Err(InspectorError::new(message.clone())),
                None => Ok(self.media.clone()),
            }
        }

        async fn download(
            &self,
            url: &str,
            plan: &DownloadPlan,
            output_template: &Path,
        ) -> Result<MediaInfo, InspectorError> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            *self.last_format.lock().unwrap() = Some(plan.format.to_string());

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some(message) = &self.download_error {
                return Err(InspectorError::new(message.clone()));
            }
            if let Some(ext) = self.writes_ext {
                let path = output_template.to_string_lossy().replace("%(ext)s", ext);
                tokio::fs::write(path, url.as_bytes()).await.unwrap();
            }
            Ok(self.media.clone())
        }
    }

    fn fetcher(inspector: FakeInspector, root: &Path) -> (Fetcher, Arc<FakeInspector>) {
        let inspector = Arc::new(inspector);
        let fetcher = Fetcher::new(inspector.clone()).with_work_root(root);
        (fetcher, inspector)
    }

    fn slot_count(root: &Path) -> usize {
        std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_fetcher_options() {
        let fetcher = Fetcher::new(Arc::new(FakeInspector::default()));
        assert_eq!(fetcher.options().timeout, None);
        assert_eq!(fetcher.work_area().root(), WorkArea::default_root());

        let fetcher = fetcher
            .with_work_root("/tmp/grabr-test")
            .with_timeout(Duration::from_secs(90));
        assert_eq!(fetcher.options().timeout, Some(Duration::from_secs(90)));
        assert_eq!(fetcher.work_area().root(), Path::new("/tmp/grabr-test"));
    }

    #[tokio::test]
    async fn test_probe_report() {
        let root = tempdir().unwrap();
        let inspector = FakeInspector {
            media: MediaInfo {
                formats: vec![
                    RawStreamDescriptor::new("137+140", "mp4")
                        .with_codecs("avc1", "mp4a")
                        .with_height(1080)
                        .with_tbr(4500.0),
                    RawStreamDescriptor::new("22", "mp4")
                        .with_codecs("avc1", "mp4a")
                        .with_height(1080)
                        .with_tbr(2000.0),
                    RawStreamDescriptor::new("140", "m4a")
                        .with_codecs("none", "mp4a")
                        .with_abr(128.0),
                ],
                title: Some("Clip".to_string()),
                description: Some("  ".to_string()),
                thumbnails: vec![
                    Thumbnail {
                        url: "https://i.test/small.jpg".to_string(),
                        height: Some(90),
                        width: None,
                    },
                    Thumbnail {
                        url: "https://i.test/large.jpg".to_string(),
                        height: Some(720),
                        width: None,
                    },
                ],
                ..MediaInfo::default()
            },
            ..FakeInspector::default()
        };
        let (fetcher, _) = fetcher(inspector, &root.path().join("scratch"));

        let report = assert_ok!(fetcher.probe(URL).await);
        assert_eq!(report.options.len(), 1);
        assert_eq!(report.options[0].format_id, "22");
        assert!(report.options[0].is_progressive);
        assert!(report.audio_available);
        assert_eq!(report.title, "Clip");
        assert_eq!(report.thumbnail, "https://i.test/large.jpg");
        assert_eq!(report.webpage_url, URL);
        assert!(!root.path().join("scratch").exists());
    }

    #[tokio::test]
    async fn test_probe_prefers_canonical_page_url() {
        let root = tempdir().unwrap();
        let inspector = FakeInspector {
            media: MediaInfo {
                webpage_url: Some("https://www.youtube.com/watch?v=canonical".to_string()),
                ..MediaInfo::default()
            },
            ..FakeInspector::default()
        };
        let (fetcher, _) = fetcher(inspector, root.path());

        let report = assert_ok!(fetcher.probe("https://youtu.be/canonical").await);
        assert_eq!(report.webpage_url, "https://www.youtube.com/watch?v=canonical");
        assert_eq!(report.title, "video");
        assert_eq!(report.thumbnail, "");
        assert!(report.options.is_empty());
        assert!(!report.audio_available);
    }

    #[tokio::test]
    async fn test_probe_error_passes_message_through() {
        let root = tempdir().unwrap();
        let scratch = root.path().join("scratch");
        let inspector = FakeInspector {
            inspect_error: Some("ERROR: Unsupported URL: https://x.test/".to_string()),
            ..FakeInspector::default()
        };
        let (fetcher, _) = fetcher(inspector, &scratch);

        let err = assert_err!(fetcher.probe("https://x.test/").await);
        assert!(matches!(
            &err,
            GrabError::ProbeFailed(msg) if msg == "ERROR: Unsupported URL: https://x.test/"
        ));
        assert_eq!(err.payload().kind, ErrorKind::ProbeFailed);
        assert!(!scratch.exists());
    }

    #[tokio::test]
    async fn test_probe_rejects_invalid_url() {
        let root = tempdir().unwrap();
        let (fetcher, _) = fetcher(FakeInspector::default(), root.path());
        let err = assert_err!(fetcher.probe("not a url").await);
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_fetch_audio() {
        let root = tempdir().unwrap();
        let (fetcher, inspector) = fetcher(FakeInspector::writing("mp3", "My Song!"), root.path());

        let delivery = assert_ok!(fetcher.fetch(&DownloadRequest::audio(URL)).await);
        assert_eq!(delivery.mime_type(), "audio/mpeg");
        assert_eq!(delivery.suggested_filename(), "My Song.mp3");
        assert_eq!(std::fs::read(delivery.path()).unwrap(), URL.as_bytes());
        assert_eq!(
            inspector.last_format.lock().unwrap().as_deref(),
            Some("bestaudio/best")
        );

        delivery.release();
        assert_eq!(slot_count(root.path()), 0);
    }

    #[tokio::test]
    async fn test_fetch_video_defaults() {
        let root = tempdir().unwrap();
        let (fetcher, inspector) = fetcher(FakeInspector::writing("mp4", "   "), root.path());

        let delivery = assert_ok!(fetcher.fetch(&DownloadRequest::video(URL, None)).await);
        assert_eq!(delivery.mime_type(), "video/mp4");
        assert_eq!(delivery.suggested_filename(), "video.mp4");
        assert_eq!(
            inspector.last_format.lock().unwrap().as_deref(),
            Some("bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best")
        );
    }

    #[tokio::test]
    async fn test_concurrent_fetches_are_isolated() {
        let root = tempdir().unwrap();
        let (fetcher, _) = fetcher(FakeInspector::writing("mp4", "Clip"), root.path());

        let first = DownloadRequest::video("https://a.test/one", Some("22".to_string()));
        let second = DownloadRequest::video("https://b.test/two", None);
        let (a, b) = tokio::join!(fetcher.fetch(&first), fetcher.fetch(&second));
        let a = assert_ok!(a);
        let b = assert_ok!(b);

        assert_ne!(a.slot_id(), b.slot_id());
        assert_ne!(a.path().parent(), b.path().parent());
        assert_eq!(std::fs::read(a.path()).unwrap(), b"https://a.test/one");
        assert_eq!(std::fs::read(b.path()).unwrap(), b"https://b.test/two");

        let b_path = b.path().to_path_buf();
        drop(a);
        assert!(b_path.exists());
        assert_eq!(slot_count(root.path()), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_never_calls_inspector() {
        let root = tempdir().unwrap();
        let scratch = root.path().join("scratch");
        let (fetcher, inspector) = fetcher(FakeInspector::writing("mp4", "Clip"), &scratch);

        let request = DownloadRequest::video(URL, Some("137/140".to_string()));
        let err = assert_err!(fetcher.fetch(&request).await);
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(inspector.downloads.load(Ordering::SeqCst), 0);
        assert!(!scratch.exists());
    }

    #[tokio::test]
    async fn test_timeout_releases_slot() {
        let root = tempdir().unwrap();
        let inspector = FakeInspector {
            delay: Duration::from_secs(30),
            ..FakeInspector::writing("mp4", "Slow")
        };
        let (fetcher, _) = fetcher(inspector, root.path());
        let fetcher = fetcher.with_timeout(Duration::from_millis(50));

        let err = assert_err!(fetcher.fetch(&DownloadRequest::video(URL, None)).await);
        assert!(matches!(&err, GrabError::FetchFailed(msg) if msg == "timeout"));
        assert!(err.is_retryable());
        assert_eq!(slot_count(root.path()), 0);
    }

    #[tokio::test]
    async fn test_inspector_failure_releases_slot() {
        let root = tempdir().unwrap();
        let inspector = FakeInspector {
            download_error: Some("ERROR: Postprocessing: ffmpeg not found".to_string()),
            ..FakeInspector::default()
        };
        let (fetcher, _) = fetcher(inspector, root.path());

        let err = assert_err!(fetcher.fetch(&DownloadRequest::audio(URL)).await);
        assert_eq!(
            err.payload().message,
            "ERROR: Postprocessing: ffmpeg not found"
        );
        assert_eq!(slot_count(root.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_output_releases_slot() {
        let root = tempdir().unwrap();
        // Writes an intermediate m4a but never the mp3 the plan asks for
        let (fetcher, _) = fetcher(FakeInspector::writing("m4a", "Song"), root.path());

        let err = assert_err!(fetcher.fetch(&DownloadRequest::audio(URL)).await);
        assert!(matches!(
            &err,
            GrabError::OutputNotFound { extension, .. } if extension == "mp3"
        ));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(slot_count(root.path()), 0);
    }

    #[tokio::test]
    async fn test_cancelled_fetch_releases_slot() {
        let root = tempdir().unwrap();
        let inspector = FakeInspector {
            delay: Duration::from_secs(30),
            ..FakeInspector::writing("mp4", "Slow")
        };
        let (fetcher, _) = fetcher(inspector, root.path());
        let request = DownloadRequest::video(URL, None);

        let cancelled = tokio::time::timeout(Duration::from_millis(50), fetcher.fetch(&request)).await;
        assert!(cancelled.is_err());
        assert_eq!(slot_count(root.path()), 0);
    }
}
