use crate::models::{Flag, Severity};

/// Confidence thresholds applied to generated flags.
pub mod gating_thresholds {
    /// Below this: the claim is noise and is dropped outright.
    pub const MIN_CONFIDENCE: f32 = 0.5;

    /// A HIGH severity claim below this keeps its evidence but is
    /// demoted to MEDIUM rather than discarded.
    pub const HIGH_SEVERITY_MIN_CONFIDENCE: f32 = 0.65;

    /// HIGH flags corroborated by two or more quotes are floored here.
    pub const HIGH_MULTI_EVIDENCE_FLOOR: f32 = 0.80;

    /// MEDIUM flags resting on a single quote are capped here.
    pub const MEDIUM_SINGLE_EVIDENCE_CAP: f32 = 0.65;

    /// LOW severity flags never report more confidence than this.
    pub const LOW_SEVERITY_CAP: f32 = 0.55;
}

/// Drop or demote generated flags whose confidence does not support their
/// severity tier. Deterministic flags pass through untouched.
pub fn gate_flags(flags: Vec<Flag>) -> Vec<Flag> {
    flags
        .into_iter()
        .filter_map(|mut flag| {
            if flag.is_deterministic() {
                return Some(flag);
            }
            if flag.confidence < gating_thresholds::MIN_CONFIDENCE {
                tracing::debug!(
                    category = flag.category.as_str(),
                    confidence = flag.confidence,
                    "Dropping low-confidence flag"
                );
                return None;
            }
            if flag.severity == Severity::High
                && flag.confidence < gating_thresholds::HIGH_SEVERITY_MIN_CONFIDENCE
            {
                tracing::debug!(
                    category = flag.category.as_str(),
                    confidence = flag.confidence,
                    "Demoting under-supported HIGH flag to MEDIUM"
                );
                flag.severity = Severity::Medium;
            }
            Some(flag)
        })
        .collect()
}

/// Align reported confidence with severity and evidence weight so that a
/// surviving flag's number reflects how well it is corroborated.
pub fn calibrate_flags(flags: Vec<Flag>) -> Vec<Flag> {
    flags
        .into_iter()
        .map(|mut flag| {
            if flag.is_deterministic() {
                return flag;
            }
            if flag.severity == Severity::High
                && flag.evidence.len() >= 2
                && flag.confidence < gating_thresholds::HIGH_MULTI_EVIDENCE_FLOOR
            {
                flag.confidence = gating_thresholds::HIGH_MULTI_EVIDENCE_FLOOR;
            } else if flag.severity == Severity::Medium
                && flag.evidence.len() <= 1
                && flag.confidence > gating_thresholds::MEDIUM_SINGLE_EVIDENCE_CAP
            {
                flag.confidence = gating_thresholds::MEDIUM_SINGLE_EVIDENCE_CAP;
            } else if flag.severity == Severity::Low
                && flag.confidence > gating_thresholds::LOW_SEVERITY_CAP
            {
                flag.confidence = gating_thresholds::LOW_SEVERITY_CAP;
            }
            flag
        })
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================
