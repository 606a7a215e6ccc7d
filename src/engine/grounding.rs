use regex::Regex;

use crate::models::{in_search_order, EvidenceQuote, Flag, SourceDocument};

/// Lowercase and collapse runs of whitespace to single spaces. Every
/// grounding comparison normalizes both sides with this.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whether `quote` appears as a contiguous substring of `document_text`
/// under normalization. An empty quote grounds nowhere.
pub fn is_grounded(quote: &str, document_text: &str) -> bool {
    let needle = normalize(quote);
    if needle.is_empty() {
        return false;
    }
    normalize(document_text).contains(&needle)
}

/// Keep only flags whose every evidence quote is verifiable against the
/// document it cites. Partial grounding counts as no grounding: one
/// unverifiable quote drops the whole flag, whatever its origin.
pub fn validate_flags(flags: Vec<Flag>, documents: &[SourceDocument]) -> Vec<Flag> {
    flags
        .into_iter()
        .filter(|flag| {
            let grounded = flag_is_grounded(flag, documents);
            if !grounded {
                tracing::debug!(
                    category = flag.category.as_str(),
                    origin = flag.origin.as_str(),
                    "Dropping flag with unverifiable evidence"
                );
            }
            grounded
        })
        .collect()
}

fn flag_is_grounded(flag: &Flag, documents: &[SourceDocument]) -> bool {
    !flag.evidence.is_empty()
        && flag
            .evidence
            .iter()
            .all(|quote| quote_is_grounded(quote, documents))
}

fn quote_is_grounded(quote: &EvidenceQuote, documents: &[SourceDocument]) -> bool {
    documents
        .iter()
        .find(|doc| doc.id == quote.source)
        .is_some_and(|doc| is_grounded(&quote.quote, &doc.text))
}

/// Find the first document, in search order, containing `text` and cite the
/// matching span in the document's own casing and spacing.
pub fn locate_quote(documents: &[SourceDocument], text: &str) -> Option<EvidenceQuote> {
    let pattern = quote_pattern(text)?;
    in_search_order(documents).into_iter().find_map(|doc| {
        pattern
            .find(&doc.text)
            .map(|m| EvidenceQuote::new(doc.id.clone(), m.as_str()))
    })
}

/// Case-insensitive pattern for a fact string, tolerant of whitespace runs.
/// Matches exactly where [`is_grounded`] would, so located evidence always
/// survives validation.
fn quote_pattern(text: &str) -> Option<Regex> {
    let tokens: Vec<String> = text.split_whitespace().map(|t| regex::escape(t)).collect();
    if tokens.is_empty() {
        return None;
    }
    Regex::new(&format!("(?i){}", tokens.join(r"\s+"))).ok()
}

/// Find a document line carrying both a lab name and its value, citing the
/// line itself as evidence. Falls back to the whole text for short blobs
/// where name and value sit on separate lines.
pub fn locate_lab_line(
    documents: &[SourceDocument],
    name: &str,
    value_text: &str,
) -> Option<EvidenceQuote> {
    let name_lower = name.to_lowercase();
    let value_lower = value_text.to_lowercase();
    if name_lower.is_empty() || value_lower.is_empty() {
        return None;
    }

    for doc in in_search_order(documents) {
        for line in doc.text.lines() {
            let line_lower = line.to_lowercase();
            if line_lower.contains(&name_lower) && line_lower.contains(&value_lower) {
                return Some(EvidenceQuote::new(doc.id.clone(), line.trim()));
            }
        }
        if doc.text.len() < 200 {
            let text_lower = doc.text.to_lowercase();
            if text_lower.contains(&name_lower) && text_lower.contains(&value_lower) {
                return Some(EvidenceQuote::new(doc.id.clone(), doc.text.trim()));
            }
        }
    }
    None
}

// ===========================================================================
// Tests
// ===========================================================================
