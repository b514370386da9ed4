//! Pneumoscan Core Library
//!
//! This crate provides the domain models, error types, configuration and the
//! form view-model shared by the preprocessing, API client and CLI crates.

pub mod config;
pub mod error;
pub mod form;
pub mod models;

// Re-export commonly used types
pub use config::{AnalyzeEndpoint, AuthScheme, ClientConfig, HeatmapVersion, PreprocessSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use form::{FileSummary, FormAction, FormState};
pub use models::{
    AnalysisData, AnalysisResponse, ClinicalInfo, HeatmapRequest, HeatmapResponse, LabelScore,
    UploadFile,
};
