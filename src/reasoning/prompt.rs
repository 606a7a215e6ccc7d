use crate::models::{ClinicalFacts, DocumentKind, SourceDocument};

/// Character budget for the clinical note body.
pub const NOTE_BUDGET_CHARS: usize = 15_000;
/// Character budget for the lab report body.
pub const LABS_BUDGET_CHARS: usize = 5_000;
/// Character budget for the medication list body.
pub const MEDS_BUDGET_CHARS: usize = 5_000;

const TRUNCATION_MARKER: &str = "\n[... truncated]";

pub const AUDIT_SYSTEM_PROMPT: &str = r#"
You are a clinical safety reviewer. Your ONLY role is to identify potential
medication safety concerns in the patient record below and report them as
structured flags. You advise; you never order.

RULES — ABSOLUTE, NO EXCEPTIONS:
1. Every flag MUST cite at least one evidence quote copied VERBATIM from a
   document, with that document's id as "source". No quote, no flag.
2. Collect evidence FIRST. Write the explanation only from text you have
   already quoted, never the other way around.
3. Use ONLY the listed category and severity values. Do not invent new ones.
4. Use advisory language (consider, verify, review, monitor). NEVER issue
   directive orders such as "start", "stop", or "administer". NEVER recommend
   a specific drug, dose, or dosage change.
5. If the record is ambiguous, OMIT the flag rather than guess. If needed
   information is absent, add a question to "missing_info_questions".
6. Output MUST be a single valid JSON object and nothing else.
"#;

/// Assemble the review prompt from structured facts plus the source
/// documents the model may quote from.
pub fn build_audit_prompt(facts: &ClinicalFacts, documents: &[SourceDocument]) -> String {
    let mut prompt = String::new();

    prompt.push_str("<patient>\n");
    prompt.push_str(&render_facts(facts));
    prompt.push_str("</patient>\n");

    for doc in documents {
        let body = truncate_to_budget(&doc.text, budget_for(doc.kind));
        prompt.push_str(&format!(
            "\n<document id=\"{}\" kind=\"{}\">\n{}\n</document>\n",
            doc.id,
            doc.kind.as_str(),
            body
        ));
    }

    prompt.push_str(
        r#"
Review the record above for medication safety concerns. Respond with exactly
this JSON structure:

```json
{
  "flags": [
    {
      "category": "MED_LAB_CONFLICT | TEMPORAL_CONTRADICTION | MISSING_WORKFLOW_STEP | DOC_INCONSISTENCY",
      "severity": "LOW | MEDIUM | HIGH",
      "confidence": 0.0,
      "evidence": [
        {"source": "document id", "quote": "verbatim text copied from that document"}
      ],
      "explanation": "what the concern is and which facts support it",
      "recommendation": "advisory next step for the clinician"
    }
  ],
  "missing_info_questions": [
    "question about information the record does not contain"
  ]
}
```

If you find no concerns, return {"flags": [], "missing_info_questions": []}.
"#,
    );

    prompt
}

fn render_facts(facts: &ClinicalFacts) -> String {
    let age = match facts.age {
        Some(a) => a.to_string(),
        None => "unknown".to_string(),
    };

    let mut out = format!("Age: {} | Sex: {}\n", age, facts.sex.as_str());

    if !facts.key_conditions.is_empty() {
        out.push_str(&format!("Conditions: {}\n", facts.key_conditions.join("; ")));
    }
    if !facts.current_meds.is_empty() {
        out.push_str(&format!("Medications: {}\n", facts.current_meds.join("; ")));
    }
    if !facts.allergies.is_empty() {
        let allergies: Vec<&str> = facts.allergies.iter().map(String::as_str).collect();
        out.push_str(&format!("Allergies: {}\n", allergies.join("; ")));
    }
    if !facts.labs.is_empty() {
        let labs: Vec<String> = facts.labs.iter().map(render_lab).collect();
        out.push_str(&format!("Labs: {}\n", labs.join("; ")));
    }
    if !facts.clinician_assertions.is_empty() {
        out.push_str(&format!(
            "Clinician assertions: {}\n",
            facts.clinician_assertions.join("; ")
        ));
    }

    out
}

fn render_lab(lab: &crate::models::LabResult) -> String {
    let mut entry = format!("{} = {}", lab.name, lab.value_text());
    if let Some(unit) = &lab.unit {
        entry.push(' ');
        entry.push_str(unit);
    }
    if let Some(date) = &lab.date {
        entry.push_str(&format!(" ({date})"));
    }
    entry
}

fn budget_for(kind: DocumentKind) -> usize {
    match kind {
        DocumentKind::Note => NOTE_BUDGET_CHARS,
        DocumentKind::Labs => LABS_BUDGET_CHARS,
        DocumentKind::Meds => MEDS_BUDGET_CHARS,
    }
}

/// Cut text to its character budget, marking the cut so the model knows
/// the document continues past what it sees.
fn truncate_to_budget(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(budget).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LabValue, Sex};

    fn sample_facts() -> ClinicalFacts {
        ClinicalFacts {
            patient_id: "pt-100".into(),
            age: Some(67),
            sex: Sex::Female,
            key_conditions: vec!["atrial fibrillation".into()],
            current_meds: vec!["warfarin 5mg daily".into()],
            allergies: ["sulfa".to_string()].into_iter().collect(),
            labs: vec![crate::models::LabResult {
                name: "INR".into(),
                value: LabValue::Number(4.8),
                unit: None,
                date: None,
            }],
            clinician_assertions: vec![],
        }
    }

    #[test]
    fn prompt_contains_facts_and_documents() {
        let docs = vec![
            SourceDocument::note("note-1", "Patient reports dark stools."),
            SourceDocument::meds("meds-1", "warfarin 5mg daily"),
        ];
        let prompt = build_audit_prompt(&sample_facts(), &docs);
        assert!(prompt.contains("Age: 67 | Sex: FEMALE"));
        assert!(prompt.contains("INR = 4.8"));
        assert!(prompt.contains("<document id=\"note-1\" kind=\"NOTE\">"));
        assert!(prompt.contains("Patient reports dark stools."));
        assert!(prompt.contains("missing_info_questions"));
    }

    #[test]
    fn oversized_document_is_truncated_with_marker() {
        let long_text = "x".repeat(LABS_BUDGET_CHARS + 100);
        let docs = vec![SourceDocument::labs("labs-1", long_text)];
        let prompt = build_audit_prompt(&sample_facts(), &docs);
        assert!(prompt.contains("[... truncated]"));
    }

    #[test]
    fn short_document_is_kept_verbatim() {
        let docs = vec![SourceDocument::labs("labs-1", "INR 4.8")];
        let prompt = build_audit_prompt(&sample_facts(), &docs);
        assert!(prompt.contains("INR 4.8"));
        assert!(!prompt.contains("[... truncated]"));
    }

    #[test]
    fn unknown_age_is_rendered_as_unknown() {
        let mut facts = sample_facts();
        facts.age = None;
        let prompt = build_audit_prompt(&facts, &[]);
        assert!(prompt.contains("Age: unknown"));
    }

    #[test]
    fn system_prompt_enforces_evidence_and_advisory_language() {
        assert!(AUDIT_SYSTEM_PROMPT.contains("VERBATIM"));
        assert!(AUDIT_SYSTEM_PROMPT.contains("advisory language"));
        assert!(AUDIT_SYSTEM_PROMPT.contains("valid JSON"));
    }
}
