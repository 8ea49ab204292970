//! iiifstitch CLI - Command-line interface
//!
//! Reassembles a full-resolution image from a tiled IIIF image service and
//! writes it as a JPEG.

mod error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use console::style;
use iiifstitch::config::{ConfigFile, DownloadConfig};
use iiifstitch::logging::{default_log_dir, init_logging, DEFAULT_LOG_FILE};
use iiifstitch::provider::AsyncReqwestClient;
use iiifstitch::service::ReconstructionService;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(name = "iiifstitch", version)]
#[command(about = "Reassemble full-resolution artwork images from tiled IIIF services", long_about = None)]
struct Args {
    /// Artwork page URL or IIIF image URL
    reference: String,

    /// Concurrent tile downloads
    #[arg(long, short = 'w')]
    workers: Option<usize>,

    /// Attempts per tile, including the first (1 = no retries)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    attempts: Option<u32>,

    /// Timeout per tile attempt, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Cap the longer output edge, in pixels (0 = no cap)
    #[arg(long)]
    max_dimension: Option<u32>,

    /// Directory to write the image into
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// JPEG quality (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Config file (default: <config dir>/iiifstitch/config.ini)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Args {
    /// CLI values override config file values, which override defaults.
    fn download_config(&self, file: &ConfigFile) -> DownloadConfig {
        let mut config = file.to_download_config();
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(attempts) = self.attempts {
            config = config.with_max_attempts(attempts);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_attempt_timeout(Duration::from_secs(timeout.max(1)));
        }
        if let Some(max_dimension) = self.max_dimension {
            config = config.with_max_dimension(Some(max_dimension));
        }
        if let Some(quality) = self.quality {
            config = config.with_jpeg_quality(quality);
        }
        config
    }

    fn output_dir(&self, file: &ConfigFile) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| file.output.directory.clone())
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        e.exit();
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    let file = match &args.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };

    let level = if args.verbose { "debug" } else { "info" };
    let _logging = init_logging(&default_log_dir(), DEFAULT_LOG_FILE, level)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    let config = args.download_config(&file);
    let output_dir = args.output_dir(&file);
    info!(
        workers = config.workers(),
        attempts = config.retry().max_attempts(),
        max_dimension = ?config.max_dimension(),
        output_dir = %output_dir.display(),
        "Starting reconstruction"
    );

    let client = AsyncReqwestClient::with_timeout(config.attempt_timeout().as_secs().max(1))
        .map_err(CliError::HttpClient)?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} tiles")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let progress_bar = bar.clone();
    let service = ReconstructionService::with_http(client, config.clone()).with_progress(
        Arc::new(move |placed, total| {
            progress_bar.set_length(total as u64);
            progress_bar.set_position(placed as u64);
        }),
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let result = service.reconstruct(&args.reference, cancel).await;
    bar.finish_and_clear();
    let output = result?;

    let bytes = output.encode_jpeg(config.jpeg_quality())?;
    let path = output_dir.join(output.filename());
    let write_error = |error| CliError::FileWrite {
        path: path.display().to_string(),
        error,
    };
    tokio::fs::create_dir_all(&output_dir)
        .await
        .map_err(write_error)?;
    tokio::fs::write(&path, &bytes).await.map_err(write_error)?;

    let (width, height) = output.image().dimensions();
    let stats = output.stats();
    println!(
        "{} {} ({}x{}, {} tiles in {:.1}s)",
        style("Saved").green().bold(),
        path.display(),
        width,
        height,
        stats.total_tiles,
        stats.elapsed_secs
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config_file() {
        let file = ConfigFile::parse("[download]\nworkers = 4\nmax_attempts = 2\n").unwrap();
        let args = Args::parse_from(["iiifstitch", "https://host/iiif/2/abc", "--workers", "12"]);

        let config = args.download_config(&file);
        assert_eq!(config.workers(), 12);
        assert_eq!(config.retry().max_attempts(), 2);
    }

    #[test]
    fn test_all_flags() {
        let args = Args::parse_from([
            "iiifstitch",
            "https://www.artic.edu/artworks/1/x",
            "--attempts",
            "5",
            "--timeout",
            "10",
            "--max-dimension",
            "4000",
            "--quality",
            "80",
            "-o",
            "/tmp/out",
        ]);
        let file = ConfigFile::default();
        let config = args.download_config(&file);

        assert_eq!(config.retry().max_attempts(), 5);
        assert_eq!(config.attempt_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_dimension(), Some(4000));
        assert_eq!(config.jpeg_quality(), 80);
        assert_eq!(args.output_dir(&file), PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_output_dir_falls_back_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[output]\ndirectory = art\n").unwrap();
        let file = ConfigFile::load_from(&path).unwrap();

        let args = Args::parse_from(["iiifstitch", "ref"]);
        assert_eq!(args.output_dir(&file), PathBuf::from("art"));
    }

    #[test]
    fn test_single_attempt_disables_retries() {
        let args = Args::parse_from(["iiifstitch", "ref", "--attempts", "1"]);
        let config = args.download_config(&ConfigFile::default());
        assert_eq!(config.retry().max_attempts(), 1);
        assert_eq!(config.retry().delay_for_attempt(1), None);

        assert!(Args::try_parse_from(["iiifstitch", "ref", "--attempts", "0"]).is_err());
        assert!(Args::try_parse_from(["iiifstitch", "ref", "--retries", "3"]).is_err());
    }

    #[test]
    fn test_quality_out_of_range_rejected() {
        assert!(Args::try_parse_from(["iiifstitch", "ref", "--quality", "0"]).is_err());
        assert!(Args::try_parse_from(["iiifstitch", "ref", "--quality", "101"]).is_err());
    }
}
