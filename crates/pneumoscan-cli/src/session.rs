//! Drives one upload form through preprocessing, analysis and heat-map
//! generation. All visible state changes go through [`FormState::apply`].

use pneumoscan_api_client::DiagnosticsApi;
use pneumoscan_core::{AppError, ErrorMetadata, FileSummary, FormAction, FormState, UploadFile};
use pneumoscan_processing::{ImagePreprocessor, PreprocessOutcome};

use crate::log_app_error;

pub struct AnalysisSession {
    api: DiagnosticsApi,
    preprocessor: ImagePreprocessor,
    state: FormState,
    file: Option<UploadFile>,
}

impl AnalysisSession {
    pub fn new(api: DiagnosticsApi, preprocessor: ImagePreprocessor) -> Self {
        Self {
            api,
            preprocessor,
            state: FormState::default(),
            file: None,
        }
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// The file that will be uploaded, after preprocessing.
    pub fn file(&self) -> Option<&UploadFile> {
        self.file.as_ref()
    }

    pub fn dispatch(&mut self, action: FormAction) {
        self.state.apply(action);
    }

    /// Preprocess and remember a file. The returned outcome describes what
    /// happened; the stored file is whatever the preprocessor handed back.
    pub async fn select_file(&mut self, file: UploadFile) -> PreprocessOutcome {
        let outcome = self.preprocessor.preprocess(file).await;
        self.dispatch(FormAction::FileSelected(FileSummary::from(outcome.file())));
        self.file = Some(outcome.file().clone());
        outcome
    }

    /// Submit the selected file with the current clinical context.
    pub async fn submit(&mut self) -> Result<(), AppError> {
        let Some(file) = self.file.as_ref() else {
            let err = AppError::InvalidInput("Select an image before analyzing".to_string());
            self.dispatch(FormAction::AnalysisFailed(err.client_message()));
            return Err(err);
        };

        self.state.apply(FormAction::AnalysisStarted);
        match self.api.analyze(file, &self.state.clinical_info).await {
            Ok(data) => {
                tracing::info!(
                    predicted_class = %data.predicted_class,
                    confidence = ?data.effective_confidence(),
                    "Analysis complete"
                );
                self.state.apply(FormAction::AnalysisSucceeded(data));
                Ok(())
            }
            Err(err) => {
                log_app_error(&err, "Analysis failed");
                self.state.apply(FormAction::AnalysisFailed(err.client_message()));
                Err(err)
            }
        }
    }

    /// Ask for a heat-map of the last successful analysis.
    pub async fn request_heatmap(&mut self) -> Result<(), AppError> {
        let request = match self.state.heatmap_request() {
            Ok(request) => request,
            Err(err) => {
                self.dispatch(FormAction::HeatmapFailed(err.client_message()));
                return Err(err);
            }
        };

        self.dispatch(FormAction::HeatmapStarted);
        match self.api.generate_heatmap(&request).await {
            Ok(url) => {
                tracing::info!(url = %url, "Heat-map ready");
                self.dispatch(FormAction::HeatmapSucceeded(url));
                Ok(())
            }
            Err(err) => {
                log_app_error(&err, "Heat-map generation failed");
                self.dispatch(FormAction::HeatmapFailed(err.client_message()));
                Err(err)
            }
        }
    }
}
