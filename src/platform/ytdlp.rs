//! Inspector backed by the yt-dlp command line tool

use crate::core::media_info::MediaInfo;
use crate::core::request::{DownloadPlan, PostProcess};
use crate::platform::inspector::{InspectorError, MediaInspector};
use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Runs yt-dlp as a child process and reads its JSON report.
///
/// The child is killed if the calling future is dropped, so cancelling a
/// fetch also stops the download.
#[derive(Debug, Clone)]
pub struct YtDlpInspector {
    program: PathBuf,
    launcher_args: Vec<OsString>,
    ffmpeg_location: Option<PathBuf>,
}

impl YtDlpInspector {
    /// Use `yt-dlp` from PATH
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            launcher_args: Vec::new(),
            ffmpeg_location: None,
        }
    }

    /// Use a specific yt-dlp executable
    pub fn with_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.program = path.into();
        self.launcher_args.clear();
        self
    }

    /// Start yt-dlp through another program, e.g. `python3 -m yt_dlp`
    pub fn with_launcher<I, S>(mut self, program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.program = program.into();
        self.launcher_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Tell yt-dlp where ffmpeg lives
    pub fn with_ffmpeg_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_location = Some(path.into());
        self
    }

    fn base_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.launcher_args.clone();
        args.extend(["--no-playlist", "--no-warnings", "--quiet"].map(OsString::from));
        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.clone().into_os_string());
        }
        args
    }

    /// Arguments for a metadata-only run
    pub fn inspect_args(&self, url: &str) -> Vec<OsString> {
        let mut args = self.base_args();
        args.extend(["--dump-single-json", "--skip-download", "--"].map(OsString::from));
        args.push(url.into());
        args
    }

    /// Arguments for a download run
    pub fn download_args(
        &self,
        url: &str,
        plan: &DownloadPlan,
        output_template: &Path,
    ) -> Vec<OsString> {
        let mut args = self.base_args();
        args.push("-f".into());
        args.push(plan.format.to_string().into());
        args.push("-o".into());
        args.push(output_template.as_os_str().to_os_string());
        args.extend(["--dump-single-json", "--no-simulate"].map(OsString::from));

        match plan.post_process {
            PostProcess::ExtractAudio {
                codec,
                quality_kbps,
            } => {
                args.extend(
                    [
                        "--extract-audio".to_string(),
                        "--audio-format".to_string(),
                        codec.extension().to_string(),
                        "--audio-quality".to_string(),
                        format!("{}K", quality_kbps),
                    ]
                    .map(OsString::from),
                );
            }
            PostProcess::ConvertVideo { container } => {
                args.extend(
                    [
                        "--merge-output-format",
                        container.extension(),
                        "--recode-video",
                        container.extension(),
                    ]
                    .map(OsString::from),
                );
            }
        }

        args.push("--".into());
        args.push(url.into());
        args
    }

    async fn run(&self, args: Vec<OsString>) -> Result<MediaInfo, InspectorError> {
        debug!("Running {:?} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                InspectorError::new(format!("Failed to run {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", display_name(&self.program), output.status)
            } else {
                stderr
            };
            return Err(InspectorError(message));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| InspectorError::new(format!("Unreadable yt-dlp output: {}", e)))
    }
}

fn display_name(program: &Path) -> String {
    program
        .file_name()
        .unwrap_or_else(|| OsStr::new("yt-dlp"))
        .to_string_lossy()
        .into_owned()
}

impl Default for YtDlpInspector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaInspector for YtDlpInspector {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn inspect(&self, url: &str) -> Result<MediaInfo, InspectorError> {
        self.run(self.inspect_args(url)).await
    }

    async fn download(
        &self,
        url: &str,
        plan: &DownloadPlan,
        output_template: &Path,
    ) -> Result<MediaInfo, InspectorError> {
        self.run(self.download_args(url, plan, output_template)).await
    }
}
