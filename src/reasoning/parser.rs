use serde::Deserialize;

use crate::models::{EvidenceQuote, Flag, FlagCategory, FlagOrigin, Severity};

use super::types::GeneratedReview;
use super::BackendError;

/// Parse the backend's review response into candidate flags.
///
/// The response is an untrusted payload: anything that does not deserialize
/// cleanly against the flag schema is rejected as a whole. The only
/// tolerated deviations are a ```json fence around the payload, a bare
/// flag array instead of the full envelope, and an out-of-range confidence
/// value, which is clamped to [0, 1].
pub fn parse_audit_response(response: &str) -> Result<GeneratedReview, BackendError> {
    let payload = extract_json_payload(response);

    let (raw_flags, questions) = if payload.starts_with('[') {
        let flags: Vec<RawFlag> = serde_json::from_str(payload)
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;
        (flags, Vec::new())
    } else {
        let envelope: RawEnvelope = serde_json::from_str(payload)
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;
        (envelope.flags, envelope.missing_info_questions)
    };

    let mut flags = Vec::with_capacity(raw_flags.len());
    for raw in raw_flags {
        flags.push(raw.into_flag()?);
    }

    let missing_info_questions = questions
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();

    Ok(GeneratedReview {
        flags,
        missing_info_questions,
    })
}

#[derive(Deserialize)]
struct RawEnvelope {
    flags: Vec<RawFlag>,
    #[serde(default)]
    missing_info_questions: Vec<String>,
}

#[derive(Deserialize)]
struct RawFlag {
    category: FlagCategory,
    severity: Severity,
    confidence: f32,
    evidence: Vec<RawQuote>,
    explanation: String,
    recommendation: String,
}

#[derive(Deserialize)]
struct RawQuote {
    source: String,
    quote: String,
}

impl RawFlag {
    fn into_flag(self) -> Result<Flag, BackendError> {
        if self.evidence.is_empty() {
            return Err(BackendError::MalformedResponse(
                "flag has an empty evidence list".into(),
            ));
        }

        let mut evidence = Vec::with_capacity(self.evidence.len());
        for raw in self.evidence {
            if raw.source.trim().is_empty() || raw.quote.trim().is_empty() {
                return Err(BackendError::MalformedResponse(
                    "evidence entry has a blank source or quote".into(),
                ));
            }
            evidence.push(EvidenceQuote::new(raw.source, raw.quote));
        }

        Ok(Flag {
            category: self.category,
            severity: self.severity,
            confidence: self.confidence.clamp(0.0, 1.0),
            evidence,
            explanation: self.explanation,
            recommendation: self.recommendation,
            origin: FlagOrigin::Generated,
        })
    }
}

/// Strip an optional ```json fence. The backend is configured to stop at a
/// fence token, so an opened fence is often left unclosed; everything after
/// the opening marker is taken in that case.
fn extract_json_payload(response: &str) -> &str {
    let trimmed = response.trim();
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        match after.find("```") {
            Some(end) => after[..end].trim(),
            None => after.trim(),
        }
    } else if let Some(stripped) = trimmed.strip_prefix("```") {
        match stripped.find("```") {
            Some(end) => stripped[..end].trim(),
            None => stripped.trim(),
        }
    } else {
        trimmed
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_flag_json() -> &'static str {
        r#"{
            "category": "MED_LAB_CONFLICT",
            "severity": "HIGH",
            "confidence": 0.82,
            "evidence": [{"source": "meds-1", "quote": "warfarin 5mg daily"}],
            "explanation": "Anticoagulant use may conflict with the elevated INR.",
            "recommendation": "Consider reviewing the anticoagulation plan."
        }"#
    }

    #[test]
    fn parses_full_envelope() {
        let response = format!(
            r#"{{"flags": [{}], "missing_info_questions": ["When was the INR drawn?"]}}"#,
            valid_flag_json()
        );
        let review = parse_audit_response(&response).unwrap();
        assert_eq!(review.flags.len(), 1);
        assert_eq!(review.flags[0].category, FlagCategory::MedLabConflict);
        assert_eq!(review.flags[0].severity, Severity::High);
        assert_eq!(review.flags[0].origin, FlagOrigin::Generated);
        assert_eq!(review.missing_info_questions.len(), 1);
    }

    #[test]
    fn parses_bare_flag_array() {
        let response = format!("[{}]", valid_flag_json());
        let review = parse_audit_response(&response).unwrap();
        assert_eq!(review.flags.len(), 1);
        assert!(review.missing_info_questions.is_empty());
    }

    #[test]
    fn parses_fenced_payload() {
        let response = format!("```json\n{{\"flags\": [{}]}}\n```", valid_flag_json());
        let review = parse_audit_response(&response).unwrap();
        assert_eq!(review.flags.len(), 1);
    }

    #[test]
    fn parses_fence_left_unclosed_by_stop_token() {
        let response = format!("```json\n{{\"flags\": [{}]}}", valid_flag_json());
        let review = parse_audit_response(&response).unwrap();
        assert_eq!(review.flags.len(), 1);
    }

    #[test]
    fn empty_flag_list_is_valid() {
        let review =
            parse_audit_response(r#"{"flags": [], "missing_info_questions": []}"#).unwrap();
        assert!(review.flags.is_empty());
        assert!(review.missing_info_questions.is_empty());
    }

    #[test]
    fn free_text_is_rejected() {
        let result = parse_audit_response("I see no safety concerns in this record.");
        assert!(matches!(result, Err(BackendError::MalformedResponse(_))));
    }

    #[test]
    fn unknown_category_is_rejected() {
        let response = r#"{"flags": [{
            "category": "VIBES",
            "severity": "HIGH",
            "confidence": 0.9,
            "evidence": [{"source": "note-1", "quote": "x"}],
            "explanation": "e",
            "recommendation": "r"
        }]}"#;
        assert!(matches!(
            parse_audit_response(response),
            Err(BackendError::MalformedResponse(_))
        ));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let response = r#"{"flags": [{
            "category": "MED_LAB_CONFLICT",
            "severity": "HIGH",
            "confidence": 0.9,
            "evidence": [{"source": "note-1", "quote": "x"}],
            "explanation": "e"
        }]}"#;
        assert!(matches!(
            parse_audit_response(response),
            Err(BackendError::MalformedResponse(_))
        ));
    }

    #[test]
    fn empty_evidence_rejects_whole_response() {
        let response = r#"{"flags": [{
            "category": "MED_LAB_CONFLICT",
            "severity": "LOW",
            "confidence": 0.4,
            "evidence": [],
            "explanation": "e",
            "recommendation": "r"
        }]}"#;
        assert!(matches!(
            parse_audit_response(response),
            Err(BackendError::MalformedResponse(_))
        ));
    }

    #[test]
    fn blank_quote_rejects_whole_response() {
        let response = r#"{"flags": [{
            "category": "MED_LAB_CONFLICT",
            "severity": "LOW",
            "confidence": 0.4,
            "evidence": [{"source": "note-1", "quote": "   "}],
            "explanation": "e",
            "recommendation": "r"
        }]}"#;
        assert!(matches!(
            parse_audit_response(response),
            Err(BackendError::MalformedResponse(_))
        ));
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        let response = r#"{"flags": [{
            "category": "DOC_INCONSISTENCY",
            "severity": "LOW",
            "confidence": 1.7,
            "evidence": [{"source": "note-1", "quote": "x"}],
            "explanation": "e",
            "recommendation": "r"
        }]}"#;
        let review = parse_audit_response(response).unwrap();
        assert_eq!(review.flags[0].confidence, 1.0);
    }

    #[test]
    fn blank_questions_are_dropped() {
        let response = r#"{"flags": [], "missing_info_questions": ["  ", "Is the INR current?"]}"#;
        let review = parse_audit_response(response).unwrap();
        assert_eq!(review.missing_info_questions, vec!["Is the INR current?"]);
    }
}
