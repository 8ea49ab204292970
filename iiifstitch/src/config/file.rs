//! Configuration file handling for `config.ini`.
//!
//! ```ini
//! [download]
//! workers = 12
//! max_attempts = 3
//! timeout = 30
//! request_delay_ms = 100
//! max_retry_after = 180
//! max_dimension = 8000
//! tile_edge = 256
//!
//! [output]
//! directory = output
//! jpeg_quality = 90
//! ```
//!
//! Missing keys keep their defaults; a missing file yields all defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use thiserror::Error;

use super::defaults::*;
use super::download::DownloadConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read or parse the config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to parse config text
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ini::ParseError),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub workers: usize,
    pub max_attempts: u32,
    pub timeout_secs: u64,
    pub request_delay_ms: u64,
    pub max_retry_after_secs: u64,
    pub max_dimension: Option<u32>,
    pub tile_edge: u32,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout_secs: DEFAULT_ATTEMPT_TIMEOUT_SECS,
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            max_retry_after_secs: DEFAULT_MAX_RETRY_AFTER_SECS,
            max_dimension: None,
            tile_edge: DEFAULT_TILE_EDGE,
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    pub directory: PathBuf,
    pub jpeg_quality: u8,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_OUTPUT_DIR),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub download: DownloadSettings,
    pub output: OutputSettings,
}

/// Parse `section.key` if present, validating with `check`.
fn parse_key<T: FromStr>(
    props: Option<&Properties>,
    section: &str,
    key: &str,
    check: impl Fn(&T) -> Result<(), &'static str>,
) -> Result<Option<T>, ConfigFileError> {
    let Some(raw) = props.and_then(|p| p.get(key)) else {
        return Ok(None);
    };
    let invalid = |reason: &str| ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let value = raw
        .trim()
        .parse::<T>()
        .map_err(|_| invalid("not a valid number"))?;
    check(&value).map_err(invalid)?;
    Ok(Some(value))
}

fn positive<T: PartialOrd + Default>(value: &T) -> Result<(), &'static str> {
    if *value > T::default() {
        Ok(())
    } else {
        Err("must be greater than zero")
    }
}

fn any<T>(_: &T) -> Result<(), &'static str> {
    Ok(())
}

impl ConfigFile {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        Self::from_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(text)?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigFileError> {
        let mut config = Self::default();

        let download = ini.section(Some("download"));
        let d = &mut config.download;
        if let Some(v) = parse_key(download, "download", "workers", positive::<usize>)? {
            d.workers = v;
        }
        if let Some(v) = parse_key(download, "download", "max_attempts", positive::<u32>)? {
            d.max_attempts = v;
        }
        if let Some(v) = parse_key(download, "download", "timeout", positive::<u64>)? {
            d.timeout_secs = v;
        }
        if let Some(v) = parse_key(download, "download", "request_delay_ms", any::<u64>)? {
            d.request_delay_ms = v;
        }
        if let Some(v) = parse_key(download, "download", "max_retry_after", any::<u64>)? {
            d.max_retry_after_secs = v;
        }
        if let Some(v) = parse_key(download, "download", "max_dimension", any::<u32>)? {
            d.max_dimension = (v > 0).then_some(v);
        }
        if let Some(v) = parse_key(download, "download", "tile_edge", positive::<u32>)? {
            d.tile_edge = v;
        }

        let output = ini.section(Some("output"));
        if let Some(dir) = output.and_then(|p| p.get("directory")) {
            if !dir.trim().is_empty() {
                config.output.directory = PathBuf::from(dir.trim());
            }
        }
        let quality_range = |q: &u8| {
            if (1..=100).contains(q) {
                Ok(())
            } else {
                Err("must be between 1 and 100")
            }
        };
        if let Some(v) = parse_key(output, "output", "jpeg_quality", quality_range)? {
            config.output.jpeg_quality = v;
        }

        Ok(config)
    }

    /// Build the runtime download configuration from these settings.
    pub fn to_download_config(&self) -> DownloadConfig {
        let d = &self.download;
        DownloadConfig::default()
            .with_workers(d.workers)
            .with_max_attempts(d.max_attempts)
            .with_attempt_timeout(Duration::from_secs(d.timeout_secs))
            .with_request_delay(Duration::from_millis(d.request_delay_ms))
            .with_max_retry_after(Duration::from_secs(d.max_retry_after_secs))
            .with_max_dimension(d.max_dimension)
            .with_default_tile_edge(d.tile_edge)
            .with_jpeg_quality(self.output.jpeg_quality)
    }
}

/// Get the path to the config directory.
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("iiifstitch")
}

/// Get the path to the config file.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
