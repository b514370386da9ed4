//! Plain-text rendering of the form state for the terminal.

use std::fmt::Write;

use pneumoscan_core::FormState;

const TOP_FINDINGS: usize = 5;

/// Probability in `[0, 1]` as a percentage with one decimal.
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Top-level fields of the optimized endpoint's `enhanced_analysis`, one per
/// line. Nested values are printed as compact JSON.
fn render_enhanced(out: &mut String, enhanced: &serde_json::Value) {
    out.push_str("Enhanced analysis:\n");
    match enhanced {
        serde_json::Value::Object(fields) if !fields.is_empty() => {
            for (key, value) in fields {
                let text = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let _ = writeln!(out, "  {}: {}", key, text);
            }
        }
        serde_json::Value::Object(_) | serde_json::Value::Null => out.push_str("  (empty)\n"),
        other => {
            let _ = writeln!(out, "  {}", other);
        }
    }
}

pub fn render_analysis(state: &FormState) -> String {
    let mut out = String::new();

    if let Some(ref file) = state.selected_file {
        let _ = writeln!(
            out,
            "File: {} ({}, {} bytes)",
            file.name, file.content_type, file.size_bytes
        );
    }

    if let Some(ref error) = state.analysis_error {
        let _ = writeln!(out, "Analysis failed: {}", error);
    }

    if let Some(ref result) = state.result {
        let _ = write!(out, "Prediction: {}", result.predicted_class);
        match result.effective_confidence() {
            Some(confidence) => {
                let _ = writeln!(out, " ({})", format_percent(confidence));
            }
            None => out.push('\n'),
        }

        if !result.binary_probabilities.is_empty() {
            out.push_str("Probabilities:\n");
            for (label, probability) in &result.binary_probabilities {
                let _ = writeln!(out, "  {:<12} {:>6}", label, format_percent(*probability));
            }
        }

        let findings = result.top_scores(TOP_FINDINGS);
        if !findings.is_empty() {
            out.push_str("Top findings:\n");
            for score in findings {
                let _ = writeln!(out, "  {:<20} {:>6}", score.label, format_percent(score.score));
            }
        }

        for warning in &result.warnings {
            let _ = writeln!(out, "Warning: {}", warning);
        }

        if let Some(ref model) = result.model_name {
            let _ = writeln!(out, "Model: {}", model);
        }

        if let Some(ref enhanced) = result.enhanced_analysis {
            render_enhanced(&mut out, enhanced);
        }
    }

    if let Some(ref url) = state.heatmap_url {
        let _ = writeln!(out, "Heat-map: {}", url);
    }
    if let Some(ref error) = state.heatmap_error {
        let _ = writeln!(out, "Heat-map failed: {}", error);
    }

    out
}
