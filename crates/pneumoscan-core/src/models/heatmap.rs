use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Body of the heat-map (EigenCAM) request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapRequest {
    pub cloudinary_id: String,
    pub model_name: String,
}

impl HeatmapRequest {
    /// Both identifiers must be non-blank; otherwise there is nothing the
    /// heat-map service could look up.
    pub fn new(
        cloudinary_id: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Result<Self, AppError> {
        let request = Self {
            cloudinary_id: cloudinary_id.into(),
            model_name: model_name.into(),
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.cloudinary_id.trim().is_empty() || self.model_name.trim().is_empty() {
            return Err(AppError::MissingHeatmapPrerequisites);
        }
        Ok(())
    }
}

/// Heat-map endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapResponse {
    pub success: bool,
    #[serde(default)]
    pub eigencam_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl HeatmapResponse {
    /// Best available failure description.
    pub fn failure_message(&self) -> String {
        [self.error.as_deref(), self.detail.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or("Heat-map generation failed")
            .to_string()
    }
}
