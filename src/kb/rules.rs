use serde::{Deserialize, Serialize};

use crate::models::{FlagCategory, Severity};

// ---------------------------------------------------------------------------
// InteractionRule
// ---------------------------------------------------------------------------

/// One curated conflict rule. The trigger side is always a medication
/// (named generic or drug class); the counterpart is whatever the trigger
/// must not coexist with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRule {
    pub id: String,
    pub trigger: RuleSide,
    pub counterpart: Counterpart,
    pub severity: Severity,
    pub category: FlagCategory,
    /// Explanation template. `{trigger}` and `{counterpart}` are replaced
    /// with the patient's actual fact strings when a flag is built.
    pub explanation: String,
    pub recommendation: String,
}

impl InteractionRule {
    pub fn render_explanation(&self, trigger: &str, counterpart: &str) -> String {
        render(&self.explanation, trigger, counterpart)
    }

    pub fn render_recommendation(&self, trigger: &str, counterpart: &str) -> String {
        render(&self.recommendation, trigger, counterpart)
    }
}

fn render(template: &str, trigger: &str, counterpart: &str) -> String {
    template
        .replace("{trigger}", trigger)
        .replace("{counterpart}", counterpart)
}

/// A rule side naming either a single generic or a whole drug class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuleSide {
    Medication(String),
    Class(String),
}

/// What the trigger medication conflicts with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Counterpart {
    Medication(String),
    Class(String),
    /// Allergy keyword, matched case-insensitively against documented
    /// allergy strings in either containment direction.
    Allergy(String),
    Lab(LabCondition),
}

/// A lab threshold, e.g. potassium > 5.5.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabCondition {
    pub name: String,
    pub op: Comparison,
    pub threshold: f64,
}

impl LabCondition {
    pub fn is_met(&self, value: f64) -> bool {
        self.op.evaluate(value, self.threshold)
    }

    /// Whether a documented lab name refers to this condition's analyte.
    pub fn name_matches(&self, lab_name: &str) -> bool {
        lab_name.to_lowercase().contains(&self.name.to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn evaluate(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Gte => value >= threshold,
            Self::Lt => value < threshold,
            Self::Lte => value <= threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_operators() {
        assert!(Comparison::Gt.evaluate(5.8, 5.5));
        assert!(!Comparison::Gt.evaluate(5.5, 5.5));
        assert!(Comparison::Gte.evaluate(5.5, 5.5));
        assert!(Comparison::Lt.evaluate(25.0, 30.0));
        assert!(!Comparison::Lt.evaluate(30.0, 30.0));
        assert!(Comparison::Lte.evaluate(30.0, 30.0));
    }

    #[test]
    fn lab_condition_name_match_is_loose() {
        let cond = LabCondition {
            name: "potassium".into(),
            op: Comparison::Gt,
            threshold: 5.5,
        };
        assert!(cond.name_matches("Potassium"));
        assert!(cond.name_matches("Serum Potassium"));
        assert!(!cond.name_matches("Sodium"));
    }

    #[test]
    fn templates_render_actual_names() {
        let rule = InteractionRule {
            id: "test".into(),
            trigger: RuleSide::Class("anticoagulant".into()),
            counterpart: Counterpart::Class("nsaid".into()),
            severity: Severity::High,
            category: FlagCategory::MedLabConflict,
            explanation: "Concurrent use of {trigger} and {counterpart} increases bleeding risk.".into(),
            recommendation: "Review whether {counterpart} is necessary.".into(),
        };
        assert_eq!(
            rule.render_explanation("Warfarin", "Ibuprofen"),
            "Concurrent use of Warfarin and Ibuprofen increases bleeding risk."
        );
        assert_eq!(
            rule.render_recommendation("Warfarin", "Ibuprofen"),
            "Review whether Ibuprofen is necessary."
        );
    }

    #[test]
    fn rule_sides_deserialize_externally_tagged() {
        let side: RuleSide = serde_json::from_str(r#"{"class": "nsaid"}"#)
            .expect("class side should deserialize");
        assert_eq!(side, RuleSide::Class("nsaid".into()));

        let counter: Counterpart =
            serde_json::from_str(r#"{"lab": {"name": "potassium", "op": "gt", "threshold": 5.5}}"#)
                .expect("lab counterpart should deserialize");
        match counter {
            Counterpart::Lab(cond) => {
                assert_eq!(cond.name, "potassium");
                assert!(cond.is_met(5.8));
                assert!(!cond.is_met(5.2));
            }
            other => panic!("expected lab counterpart, got {other:?}"),
        }
    }
}
