//! Error types for the PDF renderer

use thiserror::Error;

/// Result type alias for render operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering a document to PDF
///
/// Every variant carries the underlying message so callers can report it
/// for diagnostics. None of them are retried internally.
#[derive(Error, Debug)]
pub enum Error {
    /// The browser process could not be started
    #[error("Browser launch failed: {0}")]
    LaunchFailure(String),

    /// The target URL was unreachable or never reached network idle
    #[error("Navigation failed: {0}")]
    NavigationFailure(String),

    /// In-document script evaluation failed while computing dimensions
    #[error("Measurement failed: {0}")]
    MeasurementFailure(String),

    /// The PDF engine rejected the requested parameters
    #[error("PDF generation failed: {0}")]
    GenerationFailure(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Short label of the pipeline stage the error came from.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::LaunchFailure(_) => "launch",
            Error::NavigationFailure(_) => "navigate",
            Error::MeasurementFailure(_) => "measure",
            Error::GenerationFailure(_) => "generate",
            Error::ConfigError(_) => "config",
            Error::Other(_) => "internal",
        }
    }
}
