//! Output formatting and progress display

use crate::cli::args::VerbosityLevel;
use crate::core::{ProbeReport, RenditionOption};
use crate::utils::{is_audio_mime, is_video_mime};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Output formatter for grabr
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
    spinner: Option<ProgressBar>,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            spinner: None,
        }
    }

    /// Show a spinner while yt-dlp works; download size is unknown up front
    pub fn start_spinner(&mut self, message: &str) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));
        self.spinner = Some(spinner);
    }

    /// Stop the spinner, leaving `message` on screen
    pub fn finish_spinner(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(message.to_string());
        }
    }

    /// Stop the spinner and clear it, e.g. before printing an error
    pub fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("❌ {}", message);
    }

    /// Print the renditions a page offers
    pub fn print_probe_report(&self, report: &ProbeReport) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        println!("📹 {}", report.title);
        println!("🔗 {}", report.webpage_url);
        if !report.thumbnail.is_empty() && self.verbosity == VerbosityLevel::Verbose {
            println!("🖼️  {}", report.thumbnail);
        }
        println!();

        if report.options.is_empty() {
            println!("  No video renditions found");
        }
        for option in &report.options {
            println!("  {}", format_rendition(option));
        }

        println!();
        if report.audio_available {
            println!("🎵 Audio available (fetch with --audio)");
        } else {
            println!("🔇 No separate audio stream");
        }
    }

    /// Print fetch start message
    pub fn print_fetch_start(&self, url: &str, target: &str) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        println!("🚀 Fetching {}", target);
        println!("🔗 URL: {}", url);
    }

    /// Print fetch complete message
    pub fn print_fetch_complete(&self, saved: &Path, mime_type: &str, size: u64, elapsed: Duration) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        println!();
        println!("{} Saved to: {}", media_icon(mime_type), saved.display());
        println!("📦 {} ({})", format_bytes(size), mime_type);
        println!(
            "⏱️  Time: {}",
            humantime::format_duration(Duration::from_secs(elapsed.as_secs()))
        );
    }
}

/// One line of the probe table
fn format_rendition(option: &RenditionOption) -> String {
    let kind = if option.is_progressive {
        "progressive"
    } else {
        "merged with best audio"
    };
    format!(
        "{:>6}  id={:<8} {:>8.0} kbps  {}",
        option.resolution_label, option.format_id, option.bitrate, kind
    )
}

fn media_icon(mime_type: &str) -> &'static str {
    if is_video_mime(mime_type) {
        "🎬"
    } else if is_audio_mime(mime_type) {
        "🎵"
    } else {
        "💾"
    }
}

/// Format bytes as human-readable string
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f64 = bytes as f64;
    let exp = ((bytes_f64.ln() / THRESHOLD.ln()).floor() as usize).min(UNITS.len() - 1);
    if exp == 0 {
        return format!("{} B", bytes);
    }
    format!("{:.1} {}", bytes_f64 / THRESHOLD.powi(exp as i32), UNITS[exp])
}
