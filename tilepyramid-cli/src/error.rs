//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use tilepyramid::config::ConfigFileError;
use tilepyramid::provider::ProviderError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(std::io::Error),
    /// Configuration file could not be loaded
    Config(ConfigFileError),
    /// Arguments are inconsistent
    InvalidArgument(String),
    /// HTTP provider could not be created
    Provider(ProviderError),
    /// Async runtime could not be started
    Runtime(std::io::Error),
    /// Tiles did not finish in time
    Timeout { seconds: u64, pending: usize },
    /// Failed to serialize output
    Output(serde_json::Error),
}

impl CliError {
    /// Print the error and exit with status 1.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Timeout { .. } => {
                eprintln!();
                eprintln!("Try a smaller area, a lower zoom level, or a longer --wait.");
            }
            CliError::Config(_) => {
                eprintln!();
                eprintln!(
                    "Check {} or pass --config.",
                    tilepyramid::config::config_file_path().display()
                );
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Provider(e) => write!(f, "Failed to create tile provider: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Timeout { seconds, pending } => write!(
                f,
                "{} tile(s) still pending after {} seconds",
                pending, seconds
            ),
            CliError::Output(e) => write!(f, "Failed to write output: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) | CliError::Runtime(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Provider(e) => Some(e),
            CliError::Output(e) => Some(e),
            CliError::InvalidArgument(_) | CliError::Timeout { .. } => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Provider(e)
    }
}
