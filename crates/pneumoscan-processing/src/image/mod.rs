//! Image preprocessing module
//!
//! - Target geometry for the longer-edge cap (resize)
//! - The size-gated decode/resize/re-encode transform (preprocessor)

pub mod preprocessor;
pub mod resize;

pub use preprocessor::{ImagePreprocessor, PassThroughReason, PreprocessOutcome};
pub use resize::TargetDimensions;
