//! Download requests and the plans built from them

use crate::core::selector::FormatExpr;
use crate::error::GrabError;
use crate::utils::{mime_from_ext, validate_source_url};
use serde::{Deserialize, Serialize};

/// Audio bitrate of extracted MP3 files, in kbps
pub const MP3_QUALITY_KBPS: u32 = 192;

/// What the caller wants delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Video,
    Audio,
}

/// One fetch request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub source_url: String,
    pub mode: Mode,
    #[serde(default)]
    pub format_id: Option<String>,
}

impl DownloadRequest {
    /// Video request, optionally for a specific rendition
    pub fn video(source_url: impl Into<String>, format_id: Option<String>) -> Self {
        Self {
            source_url: source_url.into(),
            mode: Mode::Video,
            format_id,
        }
    }

    /// MP3 audio request
    pub fn audio(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            mode: Mode::Audio,
            format_id: None,
        }
    }

    /// Format id with blank values treated as absent
    pub fn chosen_format(&self) -> Option<&str> {
        self.format_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Validate and turn the request into a download plan
    pub fn plan(&self) -> Result<DownloadPlan, GrabError> {
        validate_source_url(&self.source_url)?;

        match self.mode {
            Mode::Audio => Ok(DownloadPlan {
                format: FormatExpr::best_audio(),
                post_process: PostProcess::ExtractAudio {
                    codec: TargetFormat::Mp3,
                    quality_kbps: MP3_QUALITY_KBPS,
                },
                target: TargetFormat::Mp3,
            }),
            Mode::Video => {
                let format = match self.chosen_format() {
                    Some(id) => FormatExpr::chosen_video(id)?,
                    None => FormatExpr::default_video(),
                };
                Ok(DownloadPlan {
                    format,
                    post_process: PostProcess::ConvertVideo {
                        container: TargetFormat::Mp4,
                    },
                    target: TargetFormat::Mp4,
                })
            }
        }
    }
}

/// Final file type handed to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Mp4,
    Mp3,
}

impl TargetFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Mp4 => "mp4",
            TargetFormat::Mp3 => "mp3",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        mime_from_ext(self.extension())
    }
}

/// Transcoder directive attached to a download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcess {
    /// Extract the audio track at a constant bitrate
    ExtractAudio {
        codec: TargetFormat,
        quality_kbps: u32,
    },
    /// Merge/convert into the given container
    ConvertVideo { container: TargetFormat },
}

/// Everything the inspector needs to materialize one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub format: FormatExpr,
    pub post_process: PostProcess,
    pub target: TargetFormat,
}
