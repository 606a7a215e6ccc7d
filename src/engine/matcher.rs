use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::kb::{Counterpart, InteractionRule, KnowledgeBase, ResolvedMedication};
use crate::models::{
    ClinicalFacts, EvidenceQuote, Flag, FlagOrigin, LabResult, SourceDocument,
};

use super::grounding::{locate_lab_line, locate_quote};

/// Rule-driven conflict detection over the fact model.
///
/// Matching is a pure function of (facts, documents, knowledge base): no
/// clocks, no ids, no randomness. Unknown medications and absent data
/// produce no flags rather than errors, and a candidate whose evidence
/// cannot be located verbatim in the documents is dropped.
pub struct ConflictMatcher {
    kb: Arc<KnowledgeBase>,
}

impl ConflictMatcher {
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self { kb }
    }

    pub fn match_facts(&self, facts: &ClinicalFacts, documents: &[SourceDocument]) -> Vec<Flag> {
        let resolved: Vec<(usize, ResolvedMedication)> = facts
            .current_meds
            .iter()
            .enumerate()
            .filter_map(|(i, raw)| self.kb.resolve(raw).map(|r| (i, r)))
            .collect();

        let mut flags = Vec::new();
        // One flag per medication pair, per (rule, medication) allergy hit,
        // and per (rule, medication) lab hit, so duplicate fact entries
        // ("Bactrim" and "Septra") cannot double-report the same risk.
        let mut seen_pairs: HashSet<(String, String)> = HashSet::new();
        let mut seen_single: HashSet<(String, String)> = HashSet::new();

        for (i, trigger) in &resolved {
            for rule in self.kb.lookup(&trigger.generic) {
                match &rule.counterpart {
                    Counterpart::Medication(_) | Counterpart::Class(_) => {
                        for (j, partner) in &resolved {
                            if j == i
                                || !self
                                    .kb
                                    .counterpart_matches_medication(&rule.counterpart, &partner.generic)
                            {
                                continue;
                            }
                            if !seen_pairs.insert(canonical_pair(&trigger.generic, &partner.generic))
                            {
                                continue;
                            }
                            if let Some(flag) = self.med_pair_flag(
                                rule,
                                facts,
                                documents,
                                (*i, trigger),
                                (*j, partner),
                            ) {
                                flags.push(flag);
                            }
                        }
                    }
                    Counterpart::Allergy(substance) => {
                        let Some(allergy) = matched_allergy(&facts.allergies, substance) else {
                            continue;
                        };
                        if !seen_single.insert((rule.id.clone(), trigger.generic.clone())) {
                            continue;
                        }
                        if let Some(flag) =
                            self.allergy_flag(rule, facts, documents, (*i, trigger), allergy)
                        {
                            flags.push(flag);
                        }
                    }
                    Counterpart::Lab(condition) => {
                        for lab in &facts.labs {
                            if !condition.name_matches(&lab.name) {
                                continue;
                            }
                            let Some(value) = lab.numeric_value() else {
                                continue;
                            };
                            if !condition.is_met(value) {
                                continue;
                            }
                            if seen_single.insert((rule.id.clone(), trigger.generic.clone())) {
                                if let Some(flag) =
                                    self.lab_flag(rule, facts, documents, (*i, trigger), lab)
                                {
                                    flags.push(flag);
                                }
                            }
                            break;
                        }
                    }
                }
            }
        }

        flags
    }

    fn med_pair_flag(
        &self,
        rule: &InteractionRule,
        facts: &ClinicalFacts,
        documents: &[SourceDocument],
        (trigger_idx, trigger): (usize, &ResolvedMedication),
        (partner_idx, partner): (usize, &ResolvedMedication),
    ) -> Option<Flag> {
        let Some(trigger_quote) =
            locate_medication(documents, &facts.current_meds[trigger_idx], trigger)
        else {
            tracing::debug!(rule = %rule.id, "Trigger evidence not locatable, dropping candidate");
            return None;
        };
        let Some(partner_quote) =
            locate_medication(documents, &facts.current_meds[partner_idx], partner)
        else {
            tracing::debug!(rule = %rule.id, "Counterpart evidence not locatable, dropping candidate");
            return None;
        };

        Some(build_flag(
            rule,
            &trigger.display,
            &partner.display,
            vec![trigger_quote, partner_quote],
        ))
    }

    fn allergy_flag(
        &self,
        rule: &InteractionRule,
        facts: &ClinicalFacts,
        documents: &[SourceDocument],
        (trigger_idx, trigger): (usize, &ResolvedMedication),
        allergy: &str,
    ) -> Option<Flag> {
        let Some(med_quote) =
            locate_medication(documents, &facts.current_meds[trigger_idx], trigger)
        else {
            tracing::debug!(rule = %rule.id, "Trigger evidence not locatable, dropping candidate");
            return None;
        };
        let Some(allergy_quote) = locate_quote(documents, allergy) else {
            tracing::debug!(rule = %rule.id, "Allergy evidence not locatable, dropping candidate");
            return None;
        };

        Some(build_flag(
            rule,
            &trigger.display,
            allergy,
            vec![med_quote, allergy_quote],
        ))
    }

    fn lab_flag(
        &self,
        rule: &InteractionRule,
        facts: &ClinicalFacts,
        documents: &[SourceDocument],
        (trigger_idx, trigger): (usize, &ResolvedMedication),
        lab: &LabResult,
    ) -> Option<Flag> {
        let Some(med_quote) =
            locate_medication(documents, &facts.current_meds[trigger_idx], trigger)
        else {
            tracing::debug!(rule = %rule.id, "Trigger evidence not locatable, dropping candidate");
            return None;
        };
        let Some(lab_quote) = locate_lab_line(documents, &lab.name, &lab.value_text()) else {
            tracing::debug!(rule = %rule.id, "Lab evidence not locatable, dropping candidate");
            return None;
        };

        Some(build_flag(
            rule,
            &trigger.display,
            &lab.display_value(),
            vec![med_quote, lab_quote],
        ))
    }
}

fn build_flag(
    rule: &InteractionRule,
    trigger_display: &str,
    counterpart_display: &str,
    evidence: Vec<EvidenceQuote>,
) -> Flag {
    Flag {
        category: rule.category,
        severity: rule.severity,
        confidence: 1.0,
        evidence,
        explanation: rule.render_explanation(trigger_display, counterpart_display),
        recommendation: rule.render_recommendation(trigger_display, counterpart_display),
        origin: FlagOrigin::Deterministic,
    }
}

/// Try the full fact string first, then the parsed name, then the generic.
fn locate_medication(
    documents: &[SourceDocument],
    fact: &str,
    resolved: &ResolvedMedication,
) -> Option<EvidenceQuote> {
    locate_quote(documents, fact.trim())
        .or_else(|| locate_quote(documents, &resolved.display))
        .or_else(|| locate_quote(documents, &resolved.generic))
}

fn matched_allergy<'a>(allergies: &'a BTreeSet<String>, substance: &str) -> Option<&'a str> {
    let substance_lower = substance.to_lowercase();
    allergies
        .iter()
        .find(|a| {
            let a_lower = a.to_lowercase();
            a_lower.contains(&substance_lower) || substance_lower.contains(&a_lower)
        })
        .map(String::as_str)
}

fn canonical_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
