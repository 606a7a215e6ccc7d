use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::Sex;

// ---------------------------------------------------------------------------
// ClinicalFacts
// ---------------------------------------------------------------------------

/// Extracted clinical facts for one encounter.
///
/// Every string in here is a verbatim substring of a supplied source
/// document, or explicitly unknown. The extraction collaborator upstream
/// never synthesizes values, and nothing in the engine adds to this struct
/// after deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClinicalFacts {
    pub patient_id: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub sex: Sex,
    #[serde(default)]
    pub key_conditions: Vec<String>,
    #[serde(default)]
    pub current_meds: Vec<String>,
    #[serde(default)]
    pub allergies: BTreeSet<String>,
    #[serde(default)]
    pub labs: Vec<LabResult>,
    #[serde(default)]
    pub clinician_assertions: Vec<String>,
}

// ---------------------------------------------------------------------------
// LabResult
// ---------------------------------------------------------------------------

/// One lab observation, immutable once extracted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabResult {
    pub name: String,
    pub value: LabValue,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Lab values arrive either as numbers or as verbatim text ("positive",
/// ">60"). Only values with a numeric reading participate in threshold
/// comparisons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LabValue {
    Number(f64),
    Text(String),
}

impl LabResult {
    /// Numeric reading of the value, if one exists. Text values are parsed
    /// for a leading numeric token ("5.8 mEq/L" reads as 5.8; ">60" does
    /// not read at all).
    pub fn numeric_value(&self) -> Option<f64> {
        match &self.value {
            LabValue::Number(n) => Some(*n),
            LabValue::Text(s) => leading_number(s),
        }
    }

    /// Display form of the value as it would appear in a document, used
    /// when locating evidence lines.
    pub fn value_text(&self) -> String {
        match &self.value {
            LabValue::Number(n) => format!("{n}"),
            LabValue::Text(s) => s.trim().to_string(),
        }
    }

    /// Value with its unit where one is recorded, for report text.
    pub fn display_value(&self) -> String {
        match (&self.value, &self.unit) {
            (LabValue::Number(n), Some(unit)) => format!("{n} {unit}"),
            _ => self.value_text(),
        }
    }
}

fn leading_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    let end = trimmed
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-'))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    trimmed[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_value_from_number() {
        let lab = LabResult {
            name: "Potassium".into(),
            value: LabValue::Number(5.8),
            unit: Some("mEq/L".into()),
            date: None,
        };
        assert_eq!(lab.numeric_value(), Some(5.8));
        assert_eq!(lab.value_text(), "5.8");
    }

    #[test]
    fn numeric_value_from_leading_token() {
        let lab = LabResult {
            name: "Creatinine".into(),
            value: LabValue::Text("1.4 mg/dL".into()),
            unit: None,
            date: None,
        };
        assert_eq!(lab.numeric_value(), Some(1.4));
    }

    #[test]
    fn non_numeric_text_has_no_reading() {
        let lab = LabResult {
            name: "eGFR".into(),
            value: LabValue::Text(">60".into()),
            unit: None,
            date: None,
        };
        assert_eq!(lab.numeric_value(), None);
        assert_eq!(lab.value_text(), ">60");
    }

    #[test]
    fn whole_numbers_render_without_decimal() {
        let lab = LabResult {
            name: "WBC".into(),
            value: LabValue::Number(14.0),
            unit: None,
            date: None,
        };
        assert_eq!(lab.value_text(), "14");
    }

    #[test]
    fn facts_deserialize_with_missing_fields() {
        let facts: ClinicalFacts =
            serde_json::from_str(r#"{"patient_id": "p-1", "current_meds": ["Warfarin"]}"#)
                .expect("minimal facts should deserialize");
        assert_eq!(facts.patient_id, "p-1");
        assert_eq!(facts.age, None);
        assert_eq!(facts.sex, Sex::Unknown);
        assert!(facts.allergies.is_empty());
        assert_eq!(facts.current_meds, vec!["Warfarin".to_string()]);
    }

    #[test]
    fn lab_value_deserializes_both_forms() {
        let labs: Vec<LabResult> = serde_json::from_str(
            r#"[{"name": "Potassium", "value": 5.8}, {"name": "eGFR", "value": ">60"}]"#,
        )
        .expect("both value forms should deserialize");
        assert_eq!(labs[0].value, LabValue::Number(5.8));
        assert_eq!(labs[1].value, LabValue::Text(">60".into()));
    }
}
