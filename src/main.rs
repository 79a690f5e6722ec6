//! Main entry point for the grabr CLI

use clap::Parser;
use grabr::cli::{Args, Command, OutputFormatter, VerbosityLevel};
use grabr::core::{DownloadRequest, Fetcher, Mode};
use grabr::download::{RetryConfig, RetryExecutor};
use grabr::error::ErrorKind;
use grabr::platform::YtDlpInspector;
use grabr::GrabError;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbosity_level())?;
    debug!("Starting grabr with args: {:?}", args);

    let mut formatter = OutputFormatter::new(args.verbosity_level());
    let fetcher = build_fetcher(&args);

    let (outcome, json) = match &args.command {
        Command::Probe { url, json } => (run_probe(&fetcher, url, *json, &formatter).await, *json),
        Command::Fetch {
            output, retries, ..
        } => {
            let outcome = match args.command.download_request() {
                Some(request) => {
                    run_fetch(&fetcher, request, output, *retries, &mut formatter).await
                }
                None => Err(GrabError::InvalidRequest("Nothing to fetch".to_string())),
            };
            (outcome, false)
        }
    };

    if let Err(e) = outcome {
        formatter.clear_spinner();
        error!("{}", e);

        let payload = e.payload();
        if json {
            println!("{}", serde_json::to_string_pretty(&payload)?);
        } else {
            formatter.error(&payload.message);
        }
        std::process::exit(match payload.kind {
            ErrorKind::InvalidRequest => 2,
            _ => 1,
        });
    }

    Ok(())
}

/// Wire the yt-dlp inspector and fetcher from the command line
fn build_fetcher(args: &Args) -> Fetcher {
    let mut inspector = YtDlpInspector::new().with_binary(&args.yt_dlp);
    if let Some(ffmpeg) = &args.ffmpeg {
        inspector = inspector.with_ffmpeg_location(ffmpeg);
    }

    let mut fetcher = Fetcher::new(Arc::new(inspector));
    if let Some(dir) = &args.work_dir {
        fetcher = fetcher.with_work_root(dir);
    }
    if let Some(timeout) = args.command.timeout_duration() {
        fetcher = fetcher.with_timeout(timeout);
    }
    fetcher
}

/// Handle `grabr probe`
async fn run_probe(
    fetcher: &Fetcher,
    url: &str,
    json: bool,
    formatter: &OutputFormatter,
) -> Result<(), GrabError> {
    let report = fetcher.probe(url).await?;
    info!("Found {} renditions for {}", report.options.len(), url);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        formatter.print_probe_report(&report);
    }
    Ok(())
}

/// Handle `grabr fetch`
async fn run_fetch(
    fetcher: &Fetcher,
    request: DownloadRequest,
    output: &Path,
    retries: u32,
    formatter: &mut OutputFormatter,
) -> Result<(), GrabError> {
    let started = Instant::now();
    let target = match request.mode {
        Mode::Audio => "MP3 audio",
        Mode::Video => "MP4 video",
    };
    formatter.print_fetch_start(&request.source_url, target);
    formatter.start_spinner("Downloading and converting...");

    let executor = RetryExecutor::new(RetryConfig::with_max_retries(retries));
    let request = &request;
    let delivery = executor.execute(move || fetcher.fetch(request)).await?;

    let mime_type = delivery.mime_type();
    let size = delivery.size().await?;
    let saved = delivery.persist(output).await?;
    formatter.finish_spinner("Done");

    info!("Fetch finished in {:?}", started.elapsed());
    formatter.print_fetch_complete(&saved, mime_type, size, started.elapsed());
    Ok(())
}

/// Initialize logging system; logs go to stderr so `--json` output stays clean
fn init_logging(verbosity: VerbosityLevel) -> anyhow::Result<()> {
    let default_level = match verbosity {
        VerbosityLevel::Quiet => "error",
        VerbosityLevel::Normal => "info",
        VerbosityLevel::Verbose => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .try_init()?;

    Ok(())
}
