//! Error types module
//!
//! All client-side failures are unified under `AppError`. Preprocessing failures
//! never reach this type: the preprocessor degrades to the original file instead.
//! Everything else (configuration, transport, remote rejections, missing heat-map
//! prerequisites) is surfaced to the user through `ErrorMetadata::client_message`.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for remote rejections and transport issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "API_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether the user may reasonably try the same action again.
    /// The client itself never retries.
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message rendered inline
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No stored image identifier or model name from a successful analysis")]
    MissingHeatmapPrerequisites,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidResponse(format!("JSON parsing error: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{:#}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn app_error_static_metadata(err: &AppError) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        AppError::Config(_) => (
            "CONFIG_ERROR",
            false,
            Some("Check the PNEUMOSCAN_* and PREPROCESS_* environment variables"),
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            "INVALID_INPUT",
            false,
            Some("Check the selected file and form fields"),
            LogLevel::Debug,
        ),
        AppError::Io(_) => (
            "IO_ERROR",
            false,
            Some("Check that the file exists and is readable"),
            LogLevel::Warn,
        ),
        AppError::Transport(_) => (
            "TRANSPORT_ERROR",
            true,
            Some("Check the network connection and the service URL"),
            LogLevel::Warn,
        ),
        AppError::Api { status, .. } if *status >= 500 => (
            "API_ERROR",
            true,
            Some("The analysis service failed; try again later"),
            LogLevel::Warn,
        ),
        AppError::Api { .. } => (
            "API_ERROR",
            false,
            Some("Check the uploaded file and clinical information"),
            LogLevel::Warn,
        ),
        AppError::Rejected(_) => (
            "REQUEST_REJECTED",
            false,
            Some("Check the uploaded file and clinical information"),
            LogLevel::Warn,
        ),
        AppError::InvalidResponse(_) => (
            "INVALID_RESPONSE",
            true,
            Some("The service returned an unexpected payload; try again later"),
            LogLevel::Error,
        ),
        AppError::MissingHeatmapPrerequisites => (
            "HEATMAP_PREREQUISITES_MISSING",
            false,
            Some("Run a successful analysis before requesting a heat-map"),
            LogLevel::Debug,
        ),
        AppError::Internal(_) => (
            "INTERNAL_ERROR",
            false,
            Some("Contact support if this error persists"),
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Config(ref msg) => format!("Configuration error: {}", msg),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Io(ref err) => format!("Could not read the file: {}", err),
            AppError::Transport(_) => "Could not reach the analysis service".to_string(),
            AppError::Api { status, message } if message.is_empty() => {
                format!("The analysis service returned an error (HTTP {})", status)
            }
            AppError::Api { message, .. } => message.clone(),
            AppError::Rejected(ref msg) => msg.clone(),
            AppError::InvalidResponse(_) => {
                "The analysis service returned an unexpected response".to_string()
            }
            AppError::MissingHeatmapPrerequisites => {
                "Analyze an image before generating a heat-map".to_string()
            }
            AppError::Internal(_) => "Internal error".to_string(),
        }
    }
}
