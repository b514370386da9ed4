//! Data models for the application
//!
//! Organized by domain: the file being uploaded, the classification exchange
//! and the heat-map exchange.

mod analysis;
mod heatmap;
mod upload;

// Re-export all models for convenient imports
pub use analysis::*;
pub use heatmap::*;
pub use upload::*;
