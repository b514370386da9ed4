//! Library side of the `pneumoscan` binary: file loading, the analysis
//! session driver and terminal rendering.

pub mod render;
pub mod session;

use std::path::Path;

use bytes::Bytes;
use pneumoscan_core::{AppError, ErrorMetadata, LogLevel, UploadFile};
use pneumoscan_processing::{PassThroughReason, PreprocessOutcome};
use serde::Serialize;

pub use session::AnalysisSession;

const DICOM_CONTENT_TYPE: &str = "application/dicom";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays parseable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Emit an error at the level its metadata asks for.
pub fn log_app_error(err: &AppError, context: &str) {
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(code = err.error_code(), error = %err, "{}", context),
        LogLevel::Warn => tracing::warn!(code = err.error_code(), error = %err, "{}", context),
        LogLevel::Error => {
            tracing::error!(code = err.error_code(), error = %err.detailed_message(), "{}", context)
        }
    }
}

/// Media type from content sniffing, then the file extension.
pub fn detect_content_type(path: &Path, data: &[u8]) -> &'static str {
    if pneumoscan_processing::image::preprocessor::is_dicom(data) {
        return DICOM_CONTENT_TYPE;
    }
    if let Ok(format) = image::guess_format(data) {
        return format.to_mime_type();
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("dcm") | Some("dicom") => DICOM_CONTENT_TYPE,
        Some(_) => image::ImageFormat::from_path(path)
            .map(|f| f.to_mime_type())
            .unwrap_or(FALLBACK_CONTENT_TYPE),
        None => FALLBACK_CONTENT_TYPE,
    }
}

/// Read a local file into an upload, named after its file name.
pub async fn load_upload_file(path: &Path) -> Result<UploadFile, AppError> {
    let data = tokio::fs::read(path).await?;
    if data.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "File is empty: {}",
            path.display()
        )));
    }

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();
    let content_type = detect_content_type(path, &data);

    Ok(UploadFile::new(name, content_type, Bytes::from(data)))
}

/// JSON-friendly description of a preprocessing outcome.
#[derive(Debug, Serialize)]
pub struct PreprocessSummary {
    pub file_name: String,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub content_type: String,
    pub source_size: usize,
    pub output_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dimensions: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<(u32, u32)>,
}

impl From<&PreprocessOutcome> for PreprocessSummary {
    fn from(outcome: &PreprocessOutcome) -> Self {
        let file = outcome.file();
        match outcome {
            PreprocessOutcome::Original { reason, .. } => Self {
                file_name: file.name.clone(),
                outcome: "original",
                reason: Some(match reason {
                    PassThroughReason::BelowThreshold => "below_threshold".to_string(),
                    PassThroughReason::NotRasterImage => "not_raster_image".to_string(),
                    PassThroughReason::Failed(err) => err.to_string(),
                }),
                content_type: file.content_type.clone(),
                source_size: file.size(),
                output_size: file.size(),
                source_dimensions: None,
                dimensions: None,
            },
            PreprocessOutcome::Reencoded {
                source_dimensions,
                dimensions,
                source_size,
                ..
            } => Self {
                file_name: file.name.clone(),
                outcome: "reencoded",
                reason: None,
                content_type: file.content_type.clone(),
                source_size: *source_size,
                output_size: file.size(),
                source_dimensions: Some(*source_dimensions),
                dimensions: Some(dimensions.as_tuple()),
            },
        }
    }
}
