//! Domain methods for the classification and heat-map services.

use pneumoscan_core::{
    AnalysisData, AnalysisResponse, AnalyzeEndpoint, AppError, ClientConfig, ClinicalInfo,
    HeatmapRequest, HeatmapResponse, HeatmapVersion, UploadFile,
};
use reqwest::multipart::{Form, Part};

use crate::{ApiClient, Auth};

/// The two remote collaborators: classification and heat-map explanation.
#[derive(Clone, Debug)]
pub struct DiagnosticsApi {
    classifier: ApiClient,
    explainer: ApiClient,
    analyze_endpoint: AnalyzeEndpoint,
    heatmap_version: HeatmapVersion,
}

impl DiagnosticsApi {
    pub fn new(
        classifier: ApiClient,
        explainer: ApiClient,
        analyze_endpoint: AnalyzeEndpoint,
        heatmap_version: HeatmapVersion,
    ) -> Self {
        Self {
            classifier,
            explainer,
            analyze_endpoint,
            heatmap_version,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, AppError> {
        let auth = Auth::from_config(config);
        let classifier = ApiClient::new(&config.api_url, auth.clone(), config.request_timeout)?;
        let explainer = ApiClient::new(&config.heatmap_url, auth, config.request_timeout)?;
        Ok(Self::new(
            classifier,
            explainer,
            config.analyze_endpoint,
            config.heatmap_version,
        ))
    }

    /// Upload an image (plus optional clinical context) for classification.
    pub async fn analyze(
        &self,
        file: &UploadFile,
        clinical_info: &ClinicalInfo,
    ) -> Result<AnalysisData, AppError> {
        let form = build_analyze_form(file, clinical_info)?;

        tracing::debug!(
            endpoint = self.analyze_endpoint.path(),
            file_name = %file.name,
            size_bytes = file.size(),
            with_clinical_info = !clinical_info.is_empty(),
            "Submitting image for analysis"
        );

        let response: AnalysisResponse = self
            .classifier
            .post_multipart(self.analyze_endpoint.path(), form)
            .await?;

        if !response.success {
            let message = if response.message.is_empty() {
                "Analysis failed".to_string()
            } else {
                response.message
            };
            return Err(AppError::Rejected(message));
        }

        response
            .data
            .ok_or_else(|| AppError::InvalidResponse("Analysis response has no data".to_string()))
    }

    /// Request a heat-map explanation for a previously analyzed upload.
    /// Returns the heat-map image URL. Blank identifiers fail before any request is sent.
    pub async fn generate_heatmap(&self, request: &HeatmapRequest) -> Result<String, AppError> {
        request.validate()?;

        tracing::debug!(
            endpoint = self.heatmap_version.path(),
            cloudinary_id = %request.cloudinary_id,
            model_name = %request.model_name,
            "Requesting heat-map"
        );

        let response: HeatmapResponse = self
            .explainer
            .post_json(self.heatmap_version.path(), request)
            .await?;

        match response.eigencam_url {
            Some(ref url) if response.success && !url.is_empty() => Ok(url.clone()),
            _ => Err(AppError::Rejected(response.failure_message())),
        }
    }
}

/// Multipart body for the classification endpoint: an `image` part, plus a
/// JSON `clinical_info` part only when there is clinical context to send.
pub fn build_analyze_form(
    file: &UploadFile,
    clinical_info: &ClinicalInfo,
) -> Result<Form, AppError> {
    let image = Part::bytes(file.data.to_vec())
        .file_name(file.name.clone())
        .mime_str(&file.content_type)
        .map_err(|e| {
            AppError::InvalidInput(format!("Invalid media type '{}': {}", file.content_type, e))
        })?;

    let mut form = Form::new().part("image", image);
    if !clinical_info.is_empty() {
        form = form.text("clinical_info", serde_json::to_string(clinical_info)?);
    }

    Ok(form)
}
