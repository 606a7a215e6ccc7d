use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::GeneratedPass;
use super::flag::Flag;

// ---------------------------------------------------------------------------
// AuditReport
// ---------------------------------------------------------------------------

/// The terminal artifact of one audit run. Assembled once by the merger
/// and never mutated afterwards; the storage collaborator persists it as
/// an opaque JSON document keyed by `patient_id` and the encounter
/// timestamp in `metadata`.
///
/// Flag order is part of the contract: HIGH before MEDIUM before LOW,
/// ties by category, then first-seen order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub patient_id: String,
    pub summary: String,
    pub flags: Vec<Flag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_info_questions: Vec<String>,
    pub metadata: AuditMetadata,
}

/// Operability block for the storage and presentation collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditMetadata {
    pub encounter_id: Uuid,
    pub created_at: NaiveDateTime,
    pub kb_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub engine_duration_ms: u64,
    pub generated_pass: GeneratedPass,
}
