//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use iiifstitch::config::ConfigFileError;
use iiifstitch::orchestrator::OrchestratorError;
use iiifstitch::provider::ProviderError;
use iiifstitch::service::ServiceError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(ConfigFileError),
    /// Failed to create the HTTP client
    HttpClient(ProviderError),
    /// Reconstruction failed
    Reconstruct(ServiceError),
    /// Failed to write output file
    FileWrite { path: String, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Reconstruct(ServiceError::Download(OrchestratorError::AssemblyAborted {
                failures,
            })) => {
                eprintln!();
                eprintln!("Failed tiles:");
                for failure in failures.iter().take(10) {
                    eprintln!("  {}", failure);
                }
                if failures.len() > 10 {
                    eprintln!("  ... and {} more", failures.len() - 10);
                }
                eprintln!();
                eprintln!("The service may be throttling requests. Try fewer --workers.");
            }
            CliError::Reconstruct(ServiceError::Resolve(_)) => {
                eprintln!();
                eprintln!("Pass an artwork page URL or an IIIF image URL");
                eprintln!("(for example https://www.artic.edu/iiif/2/<identifier>).");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::HttpClient(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Reconstruct(e) => write!(f, "{}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::HttpClient(e) => Some(e),
            CliError::Reconstruct(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            CliError::LoggingInit(_) => None,
        }
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        CliError::Reconstruct(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}
