//! Per-request scratch space for downloads.
//!
//! Every fetch gets its own slot directory named after a random UUID, so
//! overlapping requests never see or remove each other's files. A slot is
//! removed when it is released or dropped, whichever comes first.

use crate::error::GrabError;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

/// Attempts at finding an unused slot token before giving up
const MAX_ALLOCATION_ATTEMPTS: u32 = 3;

/// Placeholder the inspector replaces with the final extension
const EXT_PLACEHOLDER: &str = "%(ext)s";

/// Scratch root shared by all slots
#[derive(Debug, Clone)]
pub struct WorkArea {
    root: PathBuf,
}

impl WorkArea {
    /// Create a work area rooted at `root`; nothing is created on disk yet
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default root under the system temp directory
    pub fn default_root() -> PathBuf {
        std::env::temp_dir().join("grabr")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a fresh, empty slot
    pub async fn allocate(&self) -> Result<WorkSlot, GrabError> {
        tokio::fs::create_dir_all(&self.root).await?;

        for _ in 0..MAX_ALLOCATION_ATTEMPTS {
            let slot_id = Uuid::new_v4().simple().to_string();
            let dir = self.root.join(&slot_id);

            // create_dir fails on an existing path, which makes the claim atomic.
            match tokio::fs::create_dir(&dir).await {
                Ok(()) => {
                    debug!("Allocated work slot {} at {:?}", slot_id, dir);
                    return Ok(WorkSlot {
                        slot_id,
                        dir,
                        created_at: Utc::now(),
                        released: AtomicBool::new(false),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!("Work slot token {} already taken, drawing another", slot_id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(GrabError::IoError(std::io::Error::new(
            ErrorKind::AlreadyExists,
            "Could not allocate a unique work slot",
        )))
    }
}

impl Default for WorkArea {
    fn default() -> Self {
        Self::new(Self::default_root())
    }
}

/// One request's isolated scratch directory
#[derive(Debug)]
pub struct WorkSlot {
    slot_id: String,
    dir: PathBuf,
    created_at: DateTime<Utc>,
    released: AtomicBool,
}

impl WorkSlot {
    /// Unique token naming this slot
    pub fn slot_id(&self) -> &str {
        &self.slot_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Output-path template handed to the inspector
    pub fn output_template(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", self.slot_id, EXT_PLACEHOLDER))
    }

    /// File name the finished output is expected to have
    pub fn expected_output_name(&self, extension: &str) -> String {
        format!("{}.{}", self.slot_id, extension.trim_start_matches('.'))
    }

    /// Find the finished output file for `extension`.
    ///
    /// `<slot_id>.<ext>` wins when present. Otherwise any file carrying the
    /// slot prefix and the requested extension is accepted, first by name;
    /// format-suffixed intermediates like `<slot_id>.f137.mp4` only match here.
    pub fn resolve_output(&self, extension: &str) -> Result<PathBuf, GrabError> {
        let extension = extension.trim_start_matches('.');

        let exact = self.dir.join(self.expected_output_name(extension));
        if exact.is_file() {
            return Ok(exact);
        }

        let found = WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .find(|path| self.is_output_candidate(path, extension));

        found.ok_or_else(|| GrabError::OutputNotFound {
            slot_id: self.slot_id.clone(),
            extension: extension.to_string(),
        })
    }

    fn is_output_candidate(&self, path: &Path, extension: &str) -> bool {
        let name_matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| name.starts_with(&self.slot_id));
        let ext_matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case(extension));
        name_matches && ext_matches
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Remove the slot and everything in it.
    ///
    /// Safe to call any number of times. Failures are logged and swallowed so
    /// cleanup never replaces the outcome of the request.
    ///
    /// This blocks the calling thread for the duration of the removal. It is
    /// what `Drop` runs, so error and cancellation paths clean up
    /// synchronously; async callers on the normal path should prefer
    /// [`WorkSlot::close`].
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.log_removal(std::fs::remove_dir_all(&self.dir));
    }

    /// Remove the slot without blocking the runtime's worker thread
    pub async fn close(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.log_removal(tokio::fs::remove_dir_all(&self.dir).await);
    }

    fn log_removal(&self, result: std::io::Result<()>) {
        match result {
            Ok(()) => debug!("Released work slot {}", self.slot_id),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Work slot {} was already gone", self.slot_id)
            }
            Err(e) => warn!("Failed to clean up work slot {:?}: {}", self.dir, e),
        }
    }
}

impl Drop for WorkSlot {
    fn drop(&mut self) {
        self.release();
    }
}
