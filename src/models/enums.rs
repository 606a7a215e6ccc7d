use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Severity of a safety flag. Ordering is ascending so `Ord` ranks
/// `Low < Medium < High`; reports sort descending.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

// ---------------------------------------------------------------------------
// FlagCategory
// ---------------------------------------------------------------------------

/// What kind of risk a flag describes. Declaration order is the tie-break
/// order when two flags share a severity tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagCategory {
    MedLabConflict,
    TemporalContradiction,
    MissingWorkflowStep,
    DocInconsistency,
}

impl FlagCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MedLabConflict => "MED_LAB_CONFLICT",
            Self::TemporalContradiction => "TEMPORAL_CONTRADICTION",
            Self::MissingWorkflowStep => "MISSING_WORKFLOW_STEP",
            Self::DocInconsistency => "DOC_INCONSISTENCY",
        }
    }
}

// ---------------------------------------------------------------------------
// FlagOrigin
// ---------------------------------------------------------------------------

/// Which producer a flag came from. Deterministic findings are authoritative
/// over generated ones when both cite the same evidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagOrigin {
    Deterministic,
    Generated,
}

impl FlagOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deterministic => "DETERMINISTIC",
            Self::Generated => "GENERATED",
        }
    }
}

// ---------------------------------------------------------------------------
// Sex
// ---------------------------------------------------------------------------

/// Patient sex as extracted. Absent or unstated values stay `Unknown`;
/// the extraction collaborator never guesses.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sex {
    Female,
    Male,
    #[default]
    Unknown,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Female => "FEMALE",
            Self::Male => "MALE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentKind
// ---------------------------------------------------------------------------

/// Kind of source document. `search_rank` fixes the order evidence is
/// located in: note first, then labs, then meds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    Note,
    Labs,
    Meds,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Note => "NOTE",
            Self::Labs => "LABS",
            Self::Meds => "MEDS",
        }
    }

    pub fn search_rank(&self) -> u8 {
        match self {
            Self::Note => 0,
            Self::Labs => 1,
            Self::Meds => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// GeneratedPass
// ---------------------------------------------------------------------------

/// Outcome of the generative reasoning pass for one audit run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeneratedPass {
    /// Backend responded and its output survived validation.
    Completed,
    /// Backend failed, timed out, or returned malformed output; the report
    /// reflects deterministic findings only.
    Degraded,
    /// Audit was run without a generative backend.
    Disabled,
}

impl GeneratedPass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Degraded => "DEGRADED",
            Self::Disabled => "DISABLED",
        }
    }
}
