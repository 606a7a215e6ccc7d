use crate::models::{ClinicalFacts, SourceDocument};

use super::parser::parse_audit_response;
use super::prompt::{build_audit_prompt, AUDIT_SYSTEM_PROMPT};
use super::types::{GeneratedReview, InferenceBackend};
use super::BackendError;

/// Maximum fresh-generation retries after a malformed response.
const MAX_PARSE_RETRIES: usize = 1;

/// Characters of a rejected payload kept for debug logging.
const PREVIEW_CHARS: usize = 300;

/// Drives one generative review pass: prompt → backend → strict parse.
///
/// Transport and schema failures surface as errors here; deciding whether
/// the audit survives them is the caller's concern.
pub struct GroundedReasoningAdapter {
    backend: Box<dyn InferenceBackend + Send + Sync>,
    model_name: String,
}

impl GroundedReasoningAdapter {
    pub fn new(backend: Box<dyn InferenceBackend + Send + Sync>, model_name: &str) -> Self {
        Self {
            backend,
            model_name: model_name.to_string(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Ask the backend to review the record. A malformed response earns one
    /// fresh generation; transport errors propagate immediately.
    pub fn analyze(
        &self,
        facts: &ClinicalFacts,
        documents: &[SourceDocument],
    ) -> Result<GeneratedReview, BackendError> {
        let prompt = build_audit_prompt(facts, documents);

        let mut last_error: Option<BackendError> = None;

        for attempt in 0..=MAX_PARSE_RETRIES {
            let response =
                self.backend
                    .generate(&self.model_name, &prompt, AUDIT_SYSTEM_PROMPT)?;

            match parse_audit_response(&response) {
                Ok(review) => {
                    tracing::debug!(
                        patient_id = %facts.patient_id,
                        flag_count = review.flags.len(),
                        question_count = review.missing_info_questions.len(),
                        "Review response parsed"
                    );
                    return Ok(review);
                }
                Err(e) if attempt < MAX_PARSE_RETRIES => {
                    tracing::warn!(
                        patient_id = %facts.patient_id,
                        attempt = attempt + 1,
                        error = %e,
                        "Review response malformed, retrying"
                    );
                    tracing::debug!(preview = %preview(&response), "Rejected review payload");
                    last_error = Some(e);
                }
                Err(e) => {
                    tracing::debug!(preview = %preview(&response), "Rejected review payload");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BackendError::MalformedResponse("All retry attempts exhausted".into())
        }))
    }
}

fn preview(response: &str) -> String {
    response.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlagOrigin, Severity};
    use crate::reasoning::ollama::MockBackend;

    fn sample_facts() -> ClinicalFacts {
        ClinicalFacts {
            patient_id: "pt-200".into(),
            current_meds: vec!["warfarin 5mg daily".into()],
            ..Default::default()
        }
    }

    fn sample_documents() -> Vec<SourceDocument> {
        vec![SourceDocument::meds("meds-1", "warfarin 5mg daily")]
    }

    fn valid_response() -> String {
        r#"{"flags": [{
            "category": "MED_LAB_CONFLICT",
            "severity": "HIGH",
            "confidence": 0.8,
            "evidence": [{"source": "meds-1", "quote": "warfarin 5mg daily"}],
            "explanation": "Possible anticoagulation risk.",
            "recommendation": "Consider reviewing the anticoagulation plan."
        }], "missing_info_questions": []}"#
            .to_string()
    }

    #[test]
    fn analyze_parses_valid_response() {
        let adapter =
            GroundedReasoningAdapter::new(Box::new(MockBackend::new(&valid_response())), "m");
        let review = adapter.analyze(&sample_facts(), &sample_documents()).unwrap();
        assert_eq!(review.flags.len(), 1);
        assert_eq!(review.flags[0].severity, Severity::High);
        assert_eq!(review.flags[0].origin, FlagOrigin::Generated);
    }

    #[test]
    fn malformed_response_earns_one_retry() {
        let backend = MockBackend::with_responses(vec![
            "I could not find anything.".to_string(),
            valid_response(),
        ]);
        let adapter = GroundedReasoningAdapter::new(Box::new(backend), "m");
        let review = adapter.analyze(&sample_facts(), &sample_documents()).unwrap();
        assert_eq!(review.flags.len(), 1);
    }

    #[test]
    fn persistent_malformed_response_fails_after_retry() {
        let backend = MockBackend::with_responses(vec![
            "nonsense".to_string(),
            "more nonsense".to_string(),
        ]);
        let adapter = GroundedReasoningAdapter::new(Box::new(backend), "m");
        let result = adapter.analyze(&sample_facts(), &sample_documents());
        assert!(matches!(result, Err(BackendError::MalformedResponse(_))));
    }

    #[test]
    fn transport_error_is_not_retried() {
        let adapter =
            GroundedReasoningAdapter::new(Box::new(MockBackend::unreachable()), "m");
        let result = adapter.analyze(&sample_facts(), &sample_documents());
        assert!(matches!(result, Err(BackendError::Connection(_))));
    }
}
