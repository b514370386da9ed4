//! Upload form view-model
//!
//! All form state lives in one serializable struct and changes only through
//! [`FormState::apply`]. Every action that ends an in-flight request clears the
//! matching loading flag, whether the request succeeded or failed.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{AnalysisData, ClinicalInfo, HeatmapRequest, UploadFile};

/// What the form remembers about the selected file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub name: String,
    pub content_type: String,
    pub size_bytes: usize,
}

impl From<&UploadFile> for FileSummary {
    fn from(file: &UploadFile) -> Self {
        Self {
            name: file.name.clone(),
            content_type: file.content_type.clone(),
            size_bytes: file.size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormAction {
    FileSelected(FileSummary),
    DiagnosisChanged(String),
    SymptomAdded(String),
    SymptomRemoved(usize),
    AnalysisStarted,
    AnalysisSucceeded(AnalysisData),
    AnalysisFailed(String),
    HeatmapStarted,
    HeatmapSucceeded(String),
    HeatmapFailed(String),
    Reset,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    pub selected_file: Option<FileSummary>,
    pub clinical_info: ClinicalInfo,
    pub analyzing: bool,
    pub analysis_error: Option<String>,
    pub result: Option<AnalysisData>,
    pub heatmap_loading: bool,
    pub heatmap_error: Option<String>,
    pub heatmap_url: Option<String>,
}

impl FormState {
    pub fn apply(&mut self, action: FormAction) {
        match action {
            FormAction::FileSelected(summary) => {
                self.selected_file = Some(summary);
                self.clear_outputs();
            }
            FormAction::DiagnosisChanged(diagnosis) => {
                self.clinical_info.initial_diagnosis = diagnosis.trim().to_string();
            }
            FormAction::SymptomAdded(symptom) => {
                let symptom = symptom.trim();
                if !symptom.is_empty()
                    && !self
                        .clinical_info
                        .symptoms
                        .iter()
                        .any(|s| s.eq_ignore_ascii_case(symptom))
                {
                    self.clinical_info.symptoms.push(symptom.to_string());
                }
            }
            FormAction::SymptomRemoved(index) => {
                if index < self.clinical_info.symptoms.len() {
                    self.clinical_info.symptoms.remove(index);
                }
            }
            FormAction::AnalysisStarted => {
                self.clear_outputs();
                self.analyzing = true;
            }
            FormAction::AnalysisSucceeded(data) => {
                self.analyzing = false;
                self.analysis_error = None;
                self.result = Some(data);
            }
            FormAction::AnalysisFailed(message) => {
                self.analyzing = false;
                self.analysis_error = Some(message);
            }
            FormAction::HeatmapStarted => {
                self.heatmap_loading = true;
                self.heatmap_error = None;
                self.heatmap_url = None;
            }
            FormAction::HeatmapSucceeded(url) => {
                self.heatmap_loading = false;
                self.heatmap_url = Some(url);
            }
            FormAction::HeatmapFailed(message) => {
                self.heatmap_loading = false;
                self.heatmap_error = Some(message);
            }
            FormAction::Reset => *self = FormState::default(),
        }
    }

    /// Heat-map request built from the stored analysis result.
    ///
    /// Fails locally, before any network call, when there is no successful
    /// result carrying both the image identifier and the model name.
    pub fn heatmap_request(&self) -> Result<HeatmapRequest, AppError> {
        let (cloudinary_id, model_name) = self
            .result
            .as_ref()
            .and_then(|r| r.heatmap_identifiers())
            .ok_or(AppError::MissingHeatmapPrerequisites)?;

        HeatmapRequest::new(cloudinary_id, model_name)
    }

    pub fn is_busy(&self) -> bool {
        self.analyzing || self.heatmap_loading
    }

    fn clear_outputs(&mut self) {
        self.analysis_error = None;
        self.result = None;
        self.heatmap_error = None;
        self.heatmap_url = None;
        self.heatmap_loading = false;
    }
}
