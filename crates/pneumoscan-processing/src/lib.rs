//! Pneumoscan Upload Processing Library
//!
//! This crate bounds the size of radiographs before upload: files above a byte
//! threshold are decoded, scaled so the longer edge fits a fixed cap, and
//! re-encoded as JPEG. Any failure degrades to uploading the original file.

pub mod compression;
pub mod error;
pub mod image;

// Re-export commonly used types
pub use compression::{JpegCompressor, RasterEncoder, JPEG_CONTENT_TYPE};
pub use error::ProcessingError;
pub use self::image::{ImagePreprocessor, PassThroughReason, PreprocessOutcome, TargetDimensions};
