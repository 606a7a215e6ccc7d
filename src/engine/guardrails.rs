use std::sync::LazyLock;

use regex::Regex;

use crate::models::Flag;

/// Directive clinical verbs that generated text must never carry. Matched on
/// word boundaries so "restart" and "monitoring" pass through untouched.
static DIRECTIVE_VERBS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(start|stop|discontinue|order|administer|prescribe)\b")
        .expect("valid regex")
});

/// Whole-word markers that make a sentence read as advisory.
const CAUTIOUS_MARKERS: [&str; 9] = [
    "may", "could", "consider", "possible", "potential", "review", "verify", "evaluate", "monitor",
];

const REVIEW_PREAMBLE: &str = "Review Item: ";

/// Advisory-language post-pass over generated flags.
///
/// Deterministic flags are left alone, their wording comes from the curated
/// rule templates. For generated flags, directive verbs are softened to
/// "Review" and an explanation that still reads as a directive gets a
/// "Review Item: " preamble.
pub fn apply_guardrails(flags: Vec<Flag>) -> Vec<Flag> {
    flags.into_iter().map(enforce_advisory_tone).collect()
}

fn enforce_advisory_tone(mut flag: Flag) -> Flag {
    if flag.is_deterministic() {
        return flag;
    }

    if contains_directive_language(&flag.explanation) {
        tracing::debug!(category = flag.category.as_str(), "Softening directive explanation");
        flag.explanation = soften(&flag.explanation);
    }
    if contains_directive_language(&flag.recommendation) {
        flag.recommendation = soften(&flag.recommendation);
    }

    let combined = format!("{} {}", flag.explanation, flag.recommendation);
    if !contains_cautious_language(&combined) {
        flag.explanation = format!("{REVIEW_PREAMBLE}{}", flag.explanation);
    }

    flag
}

pub fn contains_directive_language(text: &str) -> bool {
    DIRECTIVE_VERBS.is_match(text)
}

pub fn contains_cautious_language(text: &str) -> bool {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| CAUTIOUS_MARKERS.contains(&token))
}

fn soften(text: &str) -> String {
    DIRECTIVE_VERBS.replace_all(text, "Review").to_string()
}

// ===========================================================================
// Tests
// ===========================================================================
