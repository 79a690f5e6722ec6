//! Command line argument parsing

use crate::core::DownloadRequest;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// grabr - list and fetch media renditions through yt-dlp
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// yt-dlp executable to run
    #[arg(long = "yt-dlp", global = true, value_name = "PATH", default_value = "yt-dlp")]
    pub yt_dlp: PathBuf,

    /// ffmpeg binary or directory passed to yt-dlp
    #[arg(long, global = true, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Scratch directory for in-progress downloads
    #[arg(long, global = true, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List the qualities a page offers
    Probe {
        /// Page URL
        url: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download one rendition as MP4, or the audio as MP3
    Fetch {
        /// Page URL
        url: String,

        /// Extract audio as MP3 instead of downloading video
        #[arg(long, conflicts_with = "format_id")]
        audio: bool,

        /// Format id from `grabr probe`
        #[arg(short = 'f', long, value_name = "ID")]
        format_id: Option<String>,

        /// Directory to save the file into
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,

        /// Give up on a download after this long (e.g., 90s, 10m)
        #[arg(long, value_name = "DURATION")]
        timeout: Option<humantime::Duration>,

        /// Extra attempts after a failed download
        #[arg(long, default_value = "0")]
        retries: u32,
    },
}

impl Command {
    /// Build the download request for a `fetch` invocation
    pub fn download_request(&self) -> Option<DownloadRequest> {
        match self {
            Command::Fetch {
                url,
                audio: true,
                ..
            } => Some(DownloadRequest::audio(url.clone())),
            Command::Fetch { url, format_id, .. } => {
                Some(DownloadRequest::video(url.clone(), format_id.clone()))
            }
            Command::Probe { .. } => None,
        }
    }

    /// Fetch timeout as Duration
    pub fn timeout_duration(&self) -> Option<Duration> {
        match self {
            Command::Fetch { timeout, .. } => timeout.map(Into::into),
            Command::Probe { .. } => None,
        }
    }
}

impl Args {
    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}
