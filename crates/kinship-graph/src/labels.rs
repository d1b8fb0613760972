//! Display labels for classifications.
//!
//! Wording lives in [`LabelTable`]s handed to the renderer at
//! construction. A label names what person 2 is to person 1, using
//! person 2's recorded sex; unknown sex falls back to the neutral term.

use crate::classify::{Classification, RelationshipKind};
use crate::edge::EdgeDirection;
use kinship_core::{ParentChildKind, Sex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Templates that wrap a term. `{term}`, `{ordinal}`, `{removal}` and
/// `{n}` are substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelPatterns {
    pub cousin: String,
    pub removed: String,
    pub half: String,
    pub in_law: String,
    pub step: String,
    pub adoptive: String,
    pub foster: String,
}

impl Default for LabelPatterns {
    fn default() -> Self {
        Self {
            cousin: "{ordinal} {term}".to_string(),
            removed: "{term} {removal}".to_string(),
            half: "half-{term}".to_string(),
            in_law: "{term}-in-law".to_string(),
            step: "step-{term}".to_string(),
            adoptive: "adoptive {term}".to_string(),
            foster: "foster {term}".to_string(),
        }
    }
}

/// Wording for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelTable {
    pub language: String,
    /// Terms keyed `"<base>.<male|female|neutral>"`.
    pub terms: HashMap<String, String>,
    /// Cousin ordinals, starting at first.
    pub ordinals: Vec<String>,
    pub ordinal_fallback: String,
    /// Removal phrases, starting at once.
    pub removals: Vec<String>,
    pub removal_fallback: String,
    /// Prefix repeated once per generation of "great".
    pub great: String,
    /// Used instead of repeating `great` past `great_repeat_limit`.
    pub great_fallback: String,
    pub great_repeat_limit: usize,
    pub patterns: LabelPatterns,
}

const ENGLISH_TERMS: &[(&str, &str)] = &[
    ("self.neutral", "self"),
    ("spouse.male", "husband"),
    ("spouse.female", "wife"),
    ("spouse.neutral", "spouse"),
    ("parent.male", "father"),
    ("parent.female", "mother"),
    ("parent.neutral", "parent"),
    ("child.male", "son"),
    ("child.female", "daughter"),
    ("child.neutral", "child"),
    ("sibling.male", "brother"),
    ("sibling.female", "sister"),
    ("sibling.neutral", "sibling"),
    ("grandparent.male", "grandfather"),
    ("grandparent.female", "grandmother"),
    ("grandparent.neutral", "grandparent"),
    ("grandchild.male", "grandson"),
    ("grandchild.female", "granddaughter"),
    ("grandchild.neutral", "grandchild"),
    ("aunt_uncle.male", "uncle"),
    ("aunt_uncle.female", "aunt"),
    ("aunt_uncle.neutral", "aunt/uncle"),
    ("niece_nephew.male", "nephew"),
    ("niece_nephew.female", "niece"),
    ("niece_nephew.neutral", "niece/nephew"),
    ("cousin.neutral", "cousin"),
    ("co_parent.neutral", "co-parent"),
    ("relative.neutral", "relative"),
];

const ENGLISH_ORDINALS: &[&str] = &[
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth", "tenth",
];

const ENGLISH_REMOVALS: &[&str] = &["once removed", "twice removed", "thrice removed"];

impl Default for LabelTable {
    fn default() -> Self {
        Self::english()
    }
}

impl LabelTable {
    /// The built-in English table.
    pub fn english() -> Self {
        Self {
            language: "en".to_string(),
            terms: ENGLISH_TERMS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ordinals: ENGLISH_ORDINALS.iter().map(|s| s.to_string()).collect(),
            ordinal_fallback: "{n}th".to_string(),
            removals: ENGLISH_REMOVALS.iter().map(|s| s.to_string()).collect(),
            removal_fallback: "{n} times removed".to_string(),
            great: "great-".to_string(),
            great_fallback: "{n}x great-".to_string(),
            great_repeat_limit: 2,
            patterns: LabelPatterns::default(),
        }
    }

    /// Parses a table from JSON. Missing fields take the English defaults.
    pub fn from_json(source: &str) -> serde_json::Result<Self> {
        serde_json::from_str(source)
    }

    /// Looks up a term, falling back from the sexed form to the neutral
    /// one and finally to the bare base name.
    pub fn term(&self, base: &str, sex: Sex) -> String {
        let sexed = format!("{}.{}", base, sex_suffix(sex));
        let neutral = format!("{}.neutral", base);
        self.terms
            .get(&sexed)
            .or_else(|| self.terms.get(&neutral))
            .cloned()
            .unwrap_or_else(|| base.to_string())
    }

    fn ordinal(&self, n: usize) -> String {
        match n.checked_sub(1).and_then(|i| self.ordinals.get(i)) {
            Some(word) => word.clone(),
            None => self.ordinal_fallback.replace("{n}", &n.to_string()),
        }
    }

    fn removal(&self, n: usize) -> String {
        match n.checked_sub(1).and_then(|i| self.removals.get(i)) {
            Some(phrase) => phrase.clone(),
            None => self.removal_fallback.replace("{n}", &n.to_string()),
        }
    }

    fn greats(&self, n: usize) -> String {
        if n <= self.great_repeat_limit {
            self.great.repeat(n)
        } else {
            self.great_fallback.replace("{n}", &n.to_string())
        }
    }
}

fn sex_suffix(sex: Sex) -> &'static str {
    match sex {
        Sex::Male => "male",
        Sex::Female => "female",
        Sex::Unknown => "neutral",
    }
}

fn fill(pattern: &str, term: &str) -> String {
    pattern.replace("{term}", term)
}

/// A rendered label: a stable key for clients with their own wording,
/// plus the text in the requested language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedLabel {
    pub key: String,
    pub text: String,
}

/// Renders classifications and path hops with explicit tables.
#[derive(Debug, Clone)]
pub struct LabelRenderer {
    default: LabelTable,
    extra: HashMap<String, LabelTable>,
}

impl Default for LabelRenderer {
    fn default() -> Self {
        Self::new(LabelTable::english())
    }
}

impl LabelRenderer {
    /// Creates a renderer whose fallback language is `default`'s.
    pub fn new(default: LabelTable) -> Self {
        Self {
            default,
            extra: HashMap::new(),
        }
    }

    /// Adds (or replaces) a language table.
    pub fn with_table(mut self, table: LabelTable) -> Self {
        if table.language == self.default.language {
            self.default = table;
        } else {
            self.extra.insert(table.language.clone(), table);
        }
        self
    }

    pub fn default_language(&self) -> &str {
        &self.default.language
    }

    /// Languages with a table, default first.
    pub fn languages(&self) -> Vec<&str> {
        let mut extra: Vec<&str> = self.extra.keys().map(String::as_str).collect();
        extra.sort();
        std::iter::once(self.default.language.as_str())
            .chain(extra)
            .collect()
    }

    fn table(&self, language: Option<&str>) -> &LabelTable {
        match language {
            None => &self.default,
            Some(lang) if lang == self.default.language => &self.default,
            Some(lang) => self.extra.get(lang).unwrap_or_else(|| {
                warn!(
                    "No label table for language {:?}, using {:?}",
                    lang, self.default.language
                );
                &self.default
            }),
        }
    }

    /// Label for what person 2 is to person 1.
    pub fn render(
        &self,
        classification: &Classification,
        target_sex: Sex,
        language: Option<&str>,
    ) -> RenderedLabel {
        let table = self.table(language);
        let senior = classification.person2_is_senior();
        let mut key = Vec::new();

        let (mut text, qualify) = match &classification.kind {
            RelationshipKind::InLaw { blood } => {
                key.push("in_law".to_string());
                let term = blood_term(table, blood, senior, target_sex, &mut key);
                (fill(&table.patterns.in_law, &term), true)
            }
            RelationshipKind::Step { blood } => {
                key.push("step".to_string());
                let term = blood_term(table, blood, senior, target_sex, &mut key);
                (fill(&table.patterns.step, &term), false)
            }
            RelationshipKind::Oneself
            | RelationshipKind::Spouse
            | RelationshipKind::CoParent
            | RelationshipKind::Distant { .. } => {
                let term = blood_term(table, &classification.kind, senior, target_sex, &mut key);
                (term, false)
            }
            blood => (blood_term(table, blood, senior, target_sex, &mut key), true),
        };

        if qualify {
            let pattern = match classification.lineage {
                ParentChildKind::Biological => None,
                ParentChildKind::Adoptive => Some(&table.patterns.adoptive),
                ParentChildKind::Foster => Some(&table.patterns.foster),
                ParentChildKind::Step => Some(&table.patterns.step),
            };
            if let Some(pattern) = pattern {
                key.insert(0, classification.lineage.to_string());
                text = fill(pattern, &text);
            }
        }

        key.push(sex_suffix(target_sex).to_string());
        RenderedLabel {
            key: key.join("."),
            text,
        }
    }

    /// Label for a single hop: what the next person is to the current one.
    pub fn render_step(
        &self,
        direction: EdgeDirection,
        next_sex: Sex,
        language: Option<&str>,
    ) -> RenderedLabel {
        let table = self.table(language);
        let base = direction.as_str();
        RenderedLabel {
            key: format!("{}.{}", base, sex_suffix(next_sex)),
            text: table.term(base, next_sex),
        }
    }
}

/// Term for a kind without lineage or affinal wrapping. Pushes the key
/// segments that identify it.
fn blood_term(
    table: &LabelTable,
    kind: &RelationshipKind,
    senior: bool,
    sex: Sex,
    key: &mut Vec<String>,
) -> String {
    let pick = |older: &'static str, younger: &'static str| if senior { older } else { younger };

    match kind {
        RelationshipKind::Oneself => plain(table, "self", sex, key),
        RelationshipKind::Spouse => plain(table, "spouse", sex, key),
        RelationshipKind::CoParent => plain(table, "co_parent", sex, key),
        RelationshipKind::Distant { .. } => plain(table, "relative", sex, key),
        RelationshipKind::ParentChild => plain(table, pick("parent", "child"), sex, key),
        RelationshipKind::Sibling { half } => {
            let term = plain(table, "sibling", sex, key);
            if *half {
                key.insert(key.len() - 1, "half".to_string());
                fill(&table.patterns.half, &term)
            } else {
                term
            }
        }
        RelationshipKind::GrandparentGrandchild { greats } => {
            let base = pick("grandparent", "grandchild");
            greats_term(table, base, *greats, sex, key)
        }
        RelationshipKind::AuntUncleNieceNephew { greats } => {
            let base = pick("aunt_uncle", "niece_nephew");
            greats_term(table, base, *greats, sex, key)
        }
        RelationshipKind::Cousin { degree, removal } => {
            let term = plain(table, "cousin", sex, key);
            key.push(degree.to_string());
            let mut text = table
                .patterns
                .cousin
                .replace("{ordinal}", &table.ordinal(*degree))
                .replace("{term}", &term);
            if *removal > 0 {
                key.push(format!("r{}", removal));
                text = table
                    .patterns
                    .removed
                    .replace("{removal}", &table.removal(*removal))
                    .replace("{term}", &text);
            }
            text
        }
        // Affinal kinds never nest.
        RelationshipKind::InLaw { blood } | RelationshipKind::Step { blood } => {
            blood_term(table, blood, senior, sex, key)
        }
    }
}

fn plain(table: &LabelTable, base: &str, sex: Sex, key: &mut Vec<String>) -> String {
    key.push(base.to_string());
    table.term(base, sex)
}

fn greats_term(table: &LabelTable, base: &str, greats: usize, sex: Sex, key: &mut Vec<String>) -> String {
    if greats > 0 {
        key.push(format!("great{}", greats));
    }
    let term = plain(table, base, sex, key);
    format!("{}{}", table.greats(greats), term)
}
