//! Media metadata as reported by the inspector

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Codec sentinel meaning "this stream has no such component"
pub const NO_CODEC: &str = "none";

/// Page metadata plus the raw stream list for one URL
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Available streams, in inspector order
    #[serde(default)]
    pub formats: Vec<RawStreamDescriptor>,
    /// Page title
    #[serde(default)]
    pub title: Option<String>,
    /// Page-provided description
    #[serde(default)]
    pub description: Option<String>,
    /// Default single thumbnail
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// All known thumbnails
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
    /// Canonical page URL
    #[serde(default)]
    pub webpage_url: Option<String>,
}

impl MediaInfo {
    /// Title shown to the user: description, then title, then "video"
    pub fn display_title(&self) -> String {
        non_blank(&self.description)
            .or_else(|| non_blank(&self.title))
            .unwrap_or("video")
            .to_string()
    }

    /// Source title used for naming the delivered file
    pub fn source_title(&self) -> &str {
        non_blank(&self.title).unwrap_or("video")
    }

    /// Highest-resolution thumbnail, then the default one, then empty
    pub fn best_thumbnail(&self) -> String {
        let mut best: Option<&Thumbnail> = None;
        for thumb in &self.thumbnails {
            match best {
                Some(current) if thumb.height.unwrap_or(0) <= current.height.unwrap_or(0) => {}
                _ => best = Some(thumb),
            }
        }

        best.map(|t| t.url.clone())
            .or_else(|| self.thumbnail.clone())
            .unwrap_or_default()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// One thumbnail entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default, deserialize_with = "lenient_dimension")]
    pub height: Option<u32>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    pub width: Option<u32>,
}

/// One raw media stream as listed by the inspector.
///
/// Field names follow the inspector's JSON keys. Duplicates and missing
/// fields are normal. A field of the wrong JSON type reads as missing, so
/// one odd entry never spoils the whole list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStreamDescriptor {
    /// Opaque identifier understood by the inspector
    #[serde(default)]
    pub format_id: String,
    /// Container extension
    #[serde(rename = "ext", default)]
    pub container_ext: String,
    /// Video codec or "none"
    #[serde(rename = "vcodec", default = "no_codec", deserialize_with = "codec_or_none")]
    pub video_codec: String,
    /// Audio codec or "none"
    #[serde(rename = "acodec", default = "no_codec", deserialize_with = "codec_or_none")]
    pub audio_codec: String,
    /// Frame height in pixels
    #[serde(rename = "height", default, deserialize_with = "lenient_integer")]
    pub height_px: Option<i64>,
    /// Total bitrate (kbps)
    #[serde(rename = "tbr", default, deserialize_with = "lenient_number")]
    pub total_bitrate: Option<f64>,
    /// Audio bitrate (kbps)
    #[serde(rename = "abr", default, deserialize_with = "lenient_number")]
    pub audio_bitrate: Option<f64>,
}

fn no_codec() -> String {
    NO_CODEC.to_string()
}

fn codec_or_none<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let codec = Value::deserialize(deserializer)?;
    Ok(codec.as_str().map_or_else(no_codec, str::to_string))
}

/// Integers only; `1080.0` or `"1080"` read as unknown
fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_i64())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_f64())
}

fn lenient_dimension<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_u64().and_then(|v| u32::try_from(v).ok()))
}

impl RawStreamDescriptor {
    /// Create a descriptor with both codecs set to "none"
    pub fn new(format_id: impl Into<String>, container_ext: impl Into<String>) -> Self {
        Self {
            format_id: format_id.into(),
            container_ext: container_ext.into(),
            video_codec: no_codec(),
            audio_codec: no_codec(),
            height_px: None,
            total_bitrate: None,
            audio_bitrate: None,
        }
    }

    pub fn with_codecs(mut self, video: &str, audio: &str) -> Self {
        self.video_codec = video.to_string();
        self.audio_codec = audio.to_string();
        self
    }

    pub fn with_height(mut self, height: i64) -> Self {
        self.height_px = Some(height);
        self
    }

    pub fn with_tbr(mut self, tbr: f64) -> Self {
        self.total_bitrate = Some(tbr);
        self
    }

    pub fn with_abr(mut self, abr: f64) -> Self {
        self.audio_bitrate = Some(abr);
        self
    }

    /// Check if the stream carries video
    pub fn has_video(&self) -> bool {
        self.video_codec != NO_CODEC
    }

    /// Check if the stream carries audio
    pub fn has_audio(&self) -> bool {
        self.audio_codec != NO_CODEC
    }

    /// Check if the stream is audio-only
    pub fn is_audio_only(&self) -> bool {
        !self.has_video() && self.has_audio()
    }

    /// Check if the stream is video-only
    pub fn is_video_only(&self) -> bool {
        self.has_video() && !self.has_audio()
    }

    /// Height as a positive pixel count, if known
    pub fn positive_height(&self) -> Option<u32> {
        self.height_px
            .filter(|h| *h > 0)
            .and_then(|h| u32::try_from(h).ok())
    }
}
