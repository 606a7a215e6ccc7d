use std::collections::HashSet;

use crate::models::{
    AuditMetadata, AuditReport, ClinicalFacts, Flag, GeneratedPass, Severity,
};

use super::grounding::normalize;

/// Flag totals per severity tier, used for the report summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlagCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl FlagCounts {
    pub fn tally(flags: &[Flag]) -> Self {
        let mut counts = Self::default();
        for flag in flags {
            match flag.severity {
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Terminal step of an audit: adjudicate the two flag streams, build the
/// summary, attach follow-up questions, and freeze the report.
pub fn assemble_report(
    facts: &ClinicalFacts,
    deterministic: Vec<Flag>,
    generated: Vec<Flag>,
    generated_questions: Vec<String>,
    metadata: AuditMetadata,
) -> AuditReport {
    let flags = merge_flags(deterministic, generated);
    let summary = summary_line(&flags, metadata.generated_pass);
    let missing_info_questions = combine_questions(gap_questions(facts), generated_questions);
    AuditReport {
        patient_id: facts.patient_id.clone(),
        summary,
        flags,
        missing_info_questions,
        metadata,
    }
}

/// Combine both flag streams into the report order.
///
/// Two flags are duplicates when they share a category and at least one
/// normalized evidence quote. A deterministic finding always supersedes a
/// generated duplicate; between generated duplicates the higher severity,
/// then higher confidence, claim survives in the earlier flag's position.
/// Final order: HIGH, MEDIUM, LOW, ties by category declaration order,
/// stable within a tier.
pub fn merge_flags(deterministic: Vec<Flag>, generated: Vec<Flag>) -> Vec<Flag> {
    let mut merged = deterministic;
    for candidate in generated {
        match merged.iter().position(|kept| duplicates(kept, &candidate)) {
            None => merged.push(candidate),
            Some(idx) => {
                if merged[idx].is_deterministic() {
                    tracing::debug!(
                        category = candidate.category.as_str(),
                        "Deterministic finding supersedes generated duplicate"
                    );
                } else if outranks(&candidate, &merged[idx]) {
                    merged[idx] = candidate;
                }
            }
        }
    }
    merged.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.category.cmp(&b.category)));
    merged
}

fn duplicates(a: &Flag, b: &Flag) -> bool {
    a.category == b.category && shares_quote(a, b)
}

fn shares_quote(a: &Flag, b: &Flag) -> bool {
    a.evidence.iter().any(|qa| {
        let needle = normalize(&qa.quote);
        b.evidence.iter().any(|qb| normalize(&qb.quote) == needle)
    })
}

fn outranks(candidate: &Flag, incumbent: &Flag) -> bool {
    candidate.severity > incumbent.severity
        || (candidate.severity == incumbent.severity
            && candidate.confidence > incumbent.confidence)
}

/// One-line human summary for the report header.
pub fn summary_line(flags: &[Flag], pass: GeneratedPass) -> String {
    let counts = FlagCounts::tally(flags);
    let mut summary = if counts.total() == 0 {
        "Safety audit complete. No safety flags identified.".to_string()
    } else {
        format!(
            "Safety audit complete. {} {} raised: {} high, {} medium, {} low.",
            counts.total(),
            if counts.total() == 1 { "flag" } else { "flags" },
            counts.high,
            counts.medium,
            counts.low,
        )
    };
    match pass {
        GeneratedPass::Completed => {}
        GeneratedPass::Degraded => summary
            .push_str(" Generative review unavailable; findings reflect deterministic checks only."),
        GeneratedPass::Disabled => summary
            .push_str(" Generative review disabled; findings reflect deterministic checks only."),
    }
    summary
}

/// Follow-up questions derived from holes in the fact model itself.
pub fn gap_questions(facts: &ClinicalFacts) -> Vec<String> {
    let mut questions = Vec::new();
    if facts.age.is_none() {
        questions.push("What is the patient's age?".to_string());
    }
    if facts.allergies.is_empty() {
        questions.push("Does the patient have any documented allergies?".to_string());
    }
    if !facts.current_meds.is_empty() && facts.labs.is_empty() {
        questions.push(
            "Are recent laboratory results available for the current medications?".to_string(),
        );
    }
    questions
}

/// Fact-gap questions first, then backend questions, deduplicated under
/// the same normalization as evidence quotes.
pub fn combine_questions(gap: Vec<String>, generated: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut combined = Vec::new();
    for question in gap.into_iter().chain(generated) {
        if seen.insert(normalize(&question)) {
            combined.push(question);
        }
    }
    combined
}

// ===========================================================================
// Tests
// ===========================================================================
