use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Optional clinical context sent alongside the image as the `clinical_info` part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalInfo {
    #[serde(default)]
    pub initial_diagnosis: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
}

impl ClinicalInfo {
    /// True when there is nothing worth sending.
    pub fn is_empty(&self) -> bool {
        self.initial_diagnosis.trim().is_empty() && self.symptoms.is_empty()
    }
}

/// One entry of the multi-label score list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Envelope returned by the classification endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<AnalysisData>,
}

/// Classification payload. Field names follow the service's camelCase contract,
/// except `enhanced_analysis` which the optimized endpoint emits in snake_case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisData {
    pub binary_probabilities: BTreeMap<String, f64>,
    pub predicted_class: String,
    #[serde(default)]
    pub class_labels: Vec<String>,
    #[serde(default)]
    pub all_multi_label_scores: Vec<LabelScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinary_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(
        rename = "enhanced_analysis",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub enhanced_analysis: Option<serde_json::Value>,
}

impl AnalysisData {
    /// Highest `n` multi-label scores, best first.
    pub fn top_scores(&self, n: usize) -> Vec<&LabelScore> {
        let mut scores: Vec<&LabelScore> = self.all_multi_label_scores.iter().collect();
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        scores.truncate(n);
        scores
    }

    /// Probability of the predicted class, falling back to the binary table
    /// when the service omits `confidence`.
    pub fn effective_confidence(&self) -> Option<f64> {
        self.confidence
            .or_else(|| self.binary_probabilities.get(&self.predicted_class).copied())
    }

    /// `(cloudinary_id, model_name)` when both are present and non-empty.
    pub fn heatmap_identifiers(&self) -> Option<(&str, &str)> {
        match (self.cloudinary_id.as_deref(), self.model_name.as_deref()) {
            (Some(id), Some(model)) if !id.is_empty() && !model.is_empty() => Some((id, model)),
            _ => None,
        }
    }
}
