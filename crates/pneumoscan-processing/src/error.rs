use std::time::Duration;

/// Why a qualifying file could not be re-encoded. Never surfaced to the user:
/// the preprocessor reports it alongside the original file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessingError {
    #[error("Image decode failed: {0}")]
    Decode(String),

    #[error("Image encoding failed: {0}")]
    Encode(String),

    #[error("Encoder produced no output")]
    EmptyOutput,

    #[error("Preprocessing exceeded {0:?}")]
    Timeout(Duration),

    #[error("Preprocessing task failed: {0}")]
    TaskFailed(String),
}
