//! Configuration for downloads and output.
//!
//! [`DownloadConfig`] is the runtime form handed to the service;
//! [`ConfigFile`] is the persisted `config.ini` form the CLI merges with
//! its flags.

mod defaults;
mod download;
mod file;

pub use defaults::*;
pub use download::DownloadConfig;
pub use file::{
    config_directory, config_file_path, ConfigFile, ConfigFileError, DownloadSettings,
    OutputSettings,
};
