use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::rules::{Counterpart, InteractionRule, RuleSide};
use super::KnowledgeBaseError;

/// Name token at the head of a free-form medication string. Tolerates
/// leading bullets and numbering, so "- Metoprolol 25mg twice daily"
/// yields "Metoprolol".
static MED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\s\-•*\d.]*([A-Za-z][A-Za-z\- ]{1,40})(?:\s|$)")
        .expect("Invalid medication name pattern")
});

// ---------------------------------------------------------------------------
// Table records
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RuleTable {
    #[serde(default)]
    version: String,
    #[serde(default)]
    rules: Vec<InteractionRule>,
}

/// Brand-to-generic medication mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationAlias {
    pub brand: String,
    pub generic: String,
}

/// Drug class membership record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugClass {
    pub class: String,
    pub members: Vec<String>,
}

/// A medication fact resolved through the alias table. `display` keeps the
/// original casing from the fact string (used for evidence search and
/// explanation rendering); `generic` is the lowercase name rules match on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedication {
    pub display: String,
    pub generic: String,
}

// ---------------------------------------------------------------------------
// KnowledgeBase
// ---------------------------------------------------------------------------

/// The interaction knowledge base: rule table, alias table, and drug-class
/// membership. Loaded once at process start and shared read-only; nothing
/// here mutates after construction.
#[derive(Debug)]
pub struct KnowledgeBase {
    version: String,
    rules: Vec<InteractionRule>,
    /// lowercase brand or abbreviation -> lowercase generic
    aliases: HashMap<String, String>,
    /// lowercase generic -> classes it belongs to
    member_classes: HashMap<String, Vec<String>>,
}

impl KnowledgeBase {
    /// Load the tables bundled with the crate.
    pub fn builtin() -> Result<Self, KnowledgeBaseError> {
        Self::from_json(
            include_str!("../../resources/interaction_rules.json"),
            include_str!("../../resources/medication_aliases.json"),
            include_str!("../../resources/drug_classes.json"),
        )
    }

    /// Load site-local replacements of the bundled tables from a directory
    /// containing `interaction_rules.json`, `medication_aliases.json`, and
    /// `drug_classes.json`.
    pub fn load_dir(dir: &Path) -> Result<Self, KnowledgeBaseError> {
        let rules = read_table(dir, "interaction_rules.json")?;
        let aliases = read_table(dir, "medication_aliases.json")?;
        let classes = read_table(dir, "drug_classes.json")?;
        Self::from_json(&rules, &aliases, &classes)
    }

    fn from_json(
        rules_json: &str,
        aliases_json: &str,
        classes_json: &str,
    ) -> Result<Self, KnowledgeBaseError> {
        let table: RuleTable = serde_json::from_str(rules_json)
            .map_err(|e| KnowledgeBaseError::Parse("interaction_rules.json".into(), e.to_string()))?;
        let aliases: Vec<MedicationAlias> = serde_json::from_str(aliases_json)
            .map_err(|e| KnowledgeBaseError::Parse("medication_aliases.json".into(), e.to_string()))?;
        let classes: Vec<DrugClass> = serde_json::from_str(classes_json)
            .map_err(|e| KnowledgeBaseError::Parse("drug_classes.json".into(), e.to_string()))?;
        Self::build(table, aliases, classes)
    }

    fn build(
        table: RuleTable,
        aliases: Vec<MedicationAlias>,
        classes: Vec<DrugClass>,
    ) -> Result<Self, KnowledgeBaseError> {
        if table.version.trim().is_empty() {
            return Err(KnowledgeBaseError::MissingVersion);
        }
        if table.rules.is_empty() {
            return Err(KnowledgeBaseError::EmptyRuleSet);
        }
        let mut seen_ids = std::collections::HashSet::new();
        for rule in &table.rules {
            if !seen_ids.insert(rule.id.clone()) {
                return Err(KnowledgeBaseError::DuplicateRuleId(rule.id.clone()));
            }
        }

        let alias_map: HashMap<String, String> = aliases
            .into_iter()
            .map(|a| (a.brand.to_lowercase(), a.generic.to_lowercase()))
            .collect();

        let mut member_classes: HashMap<String, Vec<String>> = HashMap::new();
        for class in classes {
            for member in class.members {
                member_classes
                    .entry(member.to_lowercase())
                    .or_default()
                    .push(class.class.to_lowercase());
            }
        }

        tracing::info!(
            version = %table.version,
            rule_count = table.rules.len(),
            alias_count = alias_map.len(),
            "Knowledge base loaded"
        );

        Ok(Self {
            version: table.version,
            rules: table.rules,
            aliases: alias_map,
            member_classes,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Resolve a free-form medication fact string to its generic name.
    /// Returns None only when no name token can be parsed at all; unknown
    /// names resolve to themselves (unmatched names produce no rule later,
    /// never an error).
    pub fn resolve(&self, raw: &str) -> Option<ResolvedMedication> {
        let display = parse_medication_name(raw)?;
        let token = display.to_lowercase();
        let generic = self
            .aliases
            .get(&token)
            .cloned()
            .or_else(|| {
                // "Bactrim DS 800-160mg" still resolves when only the
                // leading word is a known brand.
                token
                    .split_whitespace()
                    .next()
                    .and_then(|first| self.aliases.get(first).cloned())
            })
            .unwrap_or(token);
        Some(ResolvedMedication { display, generic })
    }

    /// Classes a generic belongs to; empty for unknown drugs.
    pub fn classes_of(&self, generic: &str) -> &[String] {
        self.member_classes
            .get(&generic.to_lowercase())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Rules whose trigger side matches the given medication name (raw
    /// fact string or generic). Unmatched names yield an empty set.
    pub fn lookup(&self, medication_name: &str) -> Vec<&InteractionRule> {
        let Some(resolved) = self.resolve(medication_name) else {
            return Vec::new();
        };
        self.rules
            .iter()
            .filter(|r| self.side_matches(&resolved.generic, &r.trigger))
            .collect()
    }

    /// Rules whose counterpart is a lab condition on the given analyte.
    pub fn lookup_for_lab(&self, lab_name: &str) -> Vec<&InteractionRule> {
        self.rules
            .iter()
            .filter(|r| matches!(&r.counterpart, Counterpart::Lab(cond) if cond.name_matches(lab_name)))
            .collect()
    }

    fn side_matches(&self, generic: &str, side: &RuleSide) -> bool {
        match side {
            RuleSide::Medication(name) => name.eq_ignore_ascii_case(generic),
            RuleSide::Class(class) => self
                .classes_of(generic)
                .iter()
                .any(|c| c.eq_ignore_ascii_case(class)),
        }
    }

    /// Whether a counterpart side names this generic (directly or via its
    /// class). Allergy and lab counterparts never match a medication.
    pub fn counterpart_matches_medication(&self, counterpart: &Counterpart, generic: &str) -> bool {
        match counterpart {
            Counterpart::Medication(name) => name.eq_ignore_ascii_case(generic),
            Counterpart::Class(class) => self
                .classes_of(generic)
                .iter()
                .any(|c| c.eq_ignore_ascii_case(class)),
            Counterpart::Allergy(_) | Counterpart::Lab(_) => false,
        }
    }
}

/// Extract the drug name token from a free-form medication string,
/// preserving its original casing.
pub fn parse_medication_name(raw: &str) -> Option<String> {
    let caps = MED_NAME.captures(raw.trim())?;
    let name = caps.get(1)?.as_str().trim_matches([' ', '-']).to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn read_table(dir: &Path, file: &str) -> Result<String, KnowledgeBaseError> {
    let path = dir.join(file);
    std::fs::read_to_string(&path)
        .map_err(|e| KnowledgeBaseError::Load(path.display().to_string(), e.to_string()))
}
