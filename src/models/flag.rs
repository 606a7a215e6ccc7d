use serde::{Deserialize, Serialize};

use super::enums::{FlagCategory, FlagOrigin, Severity};

// ---------------------------------------------------------------------------
// EvidenceQuote
// ---------------------------------------------------------------------------

/// A verbatim quote from a source document. `quote` must be a literal
/// contiguous substring of the document whose id is in `source`; the
/// grounding validator enforces this before any flag reaches a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceQuote {
    pub source: String,
    pub quote: String,
}

impl EvidenceQuote {
    pub fn new(source: impl Into<String>, quote: impl Into<String>) -> Self {
        Self { source: source.into(), quote: quote.into() }
    }
}

// ---------------------------------------------------------------------------
// Flag
// ---------------------------------------------------------------------------

/// One safety finding. A flag with no evidence is invalid and is rejected
/// at the parsing and validation layers; none is ever constructed here
/// without at least one quote.
///
/// Flags carry no ids or timestamps: the deterministic producer must be a
/// pure function of its inputs, so identity lives on the report, not the
/// flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flag {
    pub category: FlagCategory,
    pub severity: Severity,
    pub confidence: f32,
    pub evidence: Vec<EvidenceQuote>,
    pub explanation: String,
    pub recommendation: String,
    pub origin: FlagOrigin,
}

impl Flag {
    pub fn is_deterministic(&self) -> bool {
        self.origin == FlagOrigin::Deterministic
    }
}
