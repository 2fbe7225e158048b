use std::sync::Arc;

use clap::Parser;
use error::AppError;
use hlsgrab_engine::{CancellationToken, DownloadEvent, HlsSegmentDownloader, OnProgress};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

mod cli;
mod config;
mod error;
mod utils;

use cli::CliArgs;
use utils::progress::ProgressManager;

const LOG_FILE: &str = "hlsgrab.log";

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

fn init_logging(args: &CliArgs) -> Result<(), AppError> {
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // stdout is reserved for the result path and JSON events
    let writer = if args.no_log_file {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(LOG_FILE)?;
        BoxMakeWriter::new(MakeWriterExt::and(std::io::stderr, log_file))
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(writer)
        // colors only when nothing is written to the log file
        .with_ansi(args.no_log_file)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();
    init_logging(&args)?;

    info!("hlsgrab {} - manual HLS downloader", env!("CARGO_PKG_VERSION"));

    let hls_config = config::build_hls_config(&args)?;
    let request = config::build_request(&args)?;

    let progress = if args.show_progress && !args.json {
        ProgressManager::new()
    } else {
        ProgressManager::new_disabled()
    };

    let json = args.json;
    let progress_sink = progress.clone();
    let on_progress: OnProgress = Arc::new(move |event: DownloadEvent| {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "Failed to serialize download event"),
            }
        }
        progress_sink.handle_event(&event);
    });

    // Ctrl-C stops the download at the next transfer boundary
    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling download");
            signal_token.cancel();
        }
    });

    let downloader = HlsSegmentDownloader::new(hls_config);
    match downloader.download(request, &token, Some(on_progress)).await {
        Ok(result) => {
            info!(
                path = %result.path.display(),
                bytes = result.bytes,
                segments = result.segments,
                "Saved"
            );
            if !json {
                println!("{}", result.path.display());
            }
            Ok(())
        }
        Err(e) => {
            progress.abandon();
            Err(e.into())
        }
    }
}
