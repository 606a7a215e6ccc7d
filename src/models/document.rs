use serde::{Deserialize, Serialize};

use super::enums::DocumentKind;

/// A named source text blob. The only valid provenance target for evidence
/// quotes: every quote in a report names one of these by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceDocument {
    pub id: String,
    pub kind: DocumentKind,
    pub text: String,
}

impl SourceDocument {
    pub fn note(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), kind: DocumentKind::Note, text: text.into() }
    }

    pub fn labs(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), kind: DocumentKind::Labs, text: text.into() }
    }

    pub fn meds(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), kind: DocumentKind::Meds, text: text.into() }
    }
}

/// Documents in the fixed evidence-search order: note, labs, meds.
/// Stable within a kind, so repeated runs search identically.
pub fn in_search_order(documents: &[SourceDocument]) -> Vec<&SourceDocument> {
    let mut ordered: Vec<&SourceDocument> = documents.iter().collect();
    ordered.sort_by_key(|d| d.kind.search_rank());
    ordered
}
