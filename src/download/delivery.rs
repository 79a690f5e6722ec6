//! Handing a finished file to the caller

use crate::download::work_area::WorkSlot;
use crate::error::GrabError;
use bytes::Bytes;
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// A finished download, ready to be sent.
///
/// The delivery owns its work slot: the file stays on disk until the delivery
/// (or the stream made from it) is dropped, persisted, or released.
#[derive(Debug)]
pub struct Delivery {
    slot: WorkSlot,
    path: PathBuf,
    mime_type: &'static str,
    suggested_filename: String,
}

impl Delivery {
    pub(crate) fn new(
        slot: WorkSlot,
        path: PathBuf,
        mime_type: &'static str,
        suggested_filename: String,
    ) -> Self {
        Self {
            slot,
            path,
            mime_type,
            suggested_filename,
        }
    }

    /// Location of the file inside the work slot
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// Name the user should see, e.g. "My Clip.mp4"
    pub fn suggested_filename(&self) -> &str {
        &self.suggested_filename
    }

    pub fn slot_id(&self) -> &str {
        self.slot.slot_id()
    }

    /// Value for a Content-Disposition header
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.suggested_filename)
    }

    /// Size of the delivered file in bytes
    pub async fn size(&self) -> Result<u64, GrabError> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }

    /// Stream the file contents; the slot is released when the stream drops
    pub async fn into_stream(self) -> Result<DeliveryStream, GrabError> {
        let file = File::open(&self.path).await?;
        debug!("Streaming {:?} as {}", self.path, self.mime_type);
        Ok(DeliveryStream {
            inner: ReaderStream::new(file),
            _slot: self.slot,
        })
    }

    /// Copy the file into `dir` under its suggested name, then release the slot
    pub async fn persist(self, dir: impl AsRef<Path>) -> Result<PathBuf, GrabError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;

        let destination = dir.join(&self.suggested_filename);
        tokio::fs::copy(&self.path, &destination).await?;
        info!("Saved {:?}", destination);

        self.slot.close().await;
        Ok(destination)
    }

    /// Give up the file without sending it
    pub fn release(self) {
        self.slot.release();
    }
}

/// Byte stream over a delivered file that keeps its slot alive
pub struct DeliveryStream {
    inner: ReaderStream<File>,
    _slot: WorkSlot,
}

impl Stream for DeliveryStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::work_area::WorkArea;
    use futures::StreamExt;
    use tempfile::tempdir;

    async fn delivery_with(contents: &[u8], root: &Path) -> Delivery {
        let slot = WorkArea::new(root).allocate().await.unwrap();
        let path = slot.dir().join(slot.expected_output_name("mp3"));
        std::fs::write(&path, contents).unwrap();
        Delivery::new(slot, path, "audio/mpeg", "My Song.mp3".to_string())
    }

    #[tokio::test]
    async fn test_accessors() {
        let root = tempdir().unwrap();
        let delivery = delivery_with(b"abc", root.path()).await;
        assert_eq!(delivery.mime_type(), "audio/mpeg");
        assert_eq!(delivery.suggested_filename(), "My Song.mp3");
        assert_eq!(
            delivery.content_disposition(),
            "attachment; filename=\"My Song.mp3\""
        );
        assert_eq!(delivery.size().await.unwrap(), 3);
        assert!(delivery.path().ends_with(format!("{}.mp3", delivery.slot_id())));
    }

    #[tokio::test]
    async fn test_stream_releases_slot_when_dropped() {
        let root = tempdir().unwrap();
        let delivery = delivery_with(b"streamed bytes", root.path()).await;
        let slot_dir = delivery.path().parent().unwrap().to_path_buf();

        let mut stream = delivery.into_stream().await.unwrap();
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(body, b"streamed bytes");
        assert!(slot_dir.exists());

        drop(stream);
        assert!(!slot_dir.exists());
    }

    #[tokio::test]
    async fn test_persist_copies_and_releases() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        let delivery = delivery_with(b"payload", root.path()).await;
        let slot_dir = delivery.path().parent().unwrap().to_path_buf();

        let saved = delivery.persist(out.path().join("music")).await.unwrap();
        assert_eq!(saved, out.path().join("music").join("My Song.mp3"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"payload");
        assert!(!slot_dir.exists());
    }

    #[tokio::test]
    async fn test_release_removes_file() {
        let root = tempdir().unwrap();
        let delivery = delivery_with(b"unused", root.path()).await;
        let path = delivery.path().to_path_buf();
        delivery.release();
        assert!(!path.exists());
    }
}
