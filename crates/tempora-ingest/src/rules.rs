//! Rule engine: ordered, profession-scoped pattern rules that augment
//! keywords, priority, and category on normalized entries.
//!
//! Rules are applied in ascending `priority_order`. Keyword actions union
//! into the entry's detected keywords; priority and category actions
//! overwrite the field, so when several rules match, the one evaluated last
//! (largest `priority_order`) owns the final value. That overwrite-wins-last
//! behavior is deliberate and pinned by tests.

use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use tracing::warn;
use uuid::Uuid;

use tempora_core::{ParsingRule, RuleAction, RuleType};

use crate::normalizer::NormalizedEntry;

/// A rule with its pattern compiled once at load time.
struct CompiledRule {
    rule: ParsingRule,
    matcher: Matcher,
}

enum Matcher {
    /// Case-insensitive substring match (keyword rules).
    Substring(String),
    /// Regular expression (pattern/priority/category rules).
    Regex(Regex),
}

impl Matcher {
    fn build(rule: &ParsingRule) -> Option<Matcher> {
        match rule.rule_type {
            RuleType::KeywordDetection => Some(Matcher::Substring(rule.pattern.to_lowercase())),
            _ => match Regex::new(&rule.pattern) {
                Ok(re) => Some(Matcher::Regex(re)),
                Err(e) => {
                    warn!(
                        subsystem = "ingest",
                        component = "rules",
                        rule_id = %rule.id,
                        error = %e,
                        "Invalid rule pattern; rule skipped"
                    );
                    None
                }
            },
        }
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Substring(needle) => text.to_lowercase().contains(needle),
            Matcher::Regex(re) => re.is_match(text),
        }
    }
}

/// One rule evaluation, for accuracy-stat accounting.
#[derive(Debug, Clone, Copy)]
pub struct RuleEvaluation {
    pub rule_id: Uuid,
    pub hit: bool,
}

/// Engine holding the compiled, evaluation-ordered rule set for one scope.
pub struct RuleEngine {
    rules: Vec<CompiledRule>,
}

impl RuleEngine {
    /// Compile a rule set. Rules arrive from the repository already ordered
    /// by `priority_order`; re-sorted here so in-memory callers get the same
    /// semantics. Rules with invalid patterns are dropped with a warning.
    pub fn new(mut rules: Vec<ParsingRule>) -> Self {
        rules.sort_by_key(|r| r.priority_order);
        let rules = rules
            .into_iter()
            .filter(|r| r.is_active)
            .filter_map(|rule| Matcher::build(&rule).map(|matcher| CompiledRule { rule, matcher }))
            .collect();
        Self { rules }
    }

    /// Number of usable rules in this engine.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule, in order, to one normalized entry.
    ///
    /// Keyword rules are matched against the serialized original data; all
    /// other rules against the entry's combined text (raw text + parsed
    /// title + parsed description). Returns per-rule evaluations for the
    /// caller to fold into rule accuracy stats.
    pub fn apply(
        &self,
        entry: &mut NormalizedEntry,
        raw_text: &str,
        original_data: &Map<String, JsonValue>,
    ) -> Vec<RuleEvaluation> {
        let combined = combined_text(entry, raw_text);
        let serialized = JsonValue::Object(original_data.clone()).to_string();

        let mut evaluations = Vec::with_capacity(self.rules.len());
        for compiled in &self.rules {
            let haystack = match compiled.rule.rule_type {
                RuleType::KeywordDetection => serialized.as_str(),
                _ => combined.as_str(),
            };
            let hit = compiled.matcher.is_match(haystack);
            if hit {
                apply_action(entry, &compiled.rule.action);
            }
            evaluations.push(RuleEvaluation {
                rule_id: compiled.rule.id,
                hit,
            });
        }
        evaluations
    }
}

fn combined_text(entry: &NormalizedEntry, raw_text: &str) -> String {
    let mut text = raw_text.to_string();
    if let Some(title) = &entry.parsed_title {
        text.push(' ');
        text.push_str(title);
    }
    if let Some(description) = &entry.parsed_description {
        text.push(' ');
        text.push_str(description);
    }
    text
}

fn apply_action(entry: &mut NormalizedEntry, action: &RuleAction) {
    match action {
        RuleAction::Keywords { keywords } => {
            for keyword in keywords {
                if !entry.detected_keywords.contains(keyword) {
                    entry.detected_keywords.push(keyword.clone());
                }
            }
        }
        RuleAction::Priority { level } => entry.parsed_priority = *level,
        RuleAction::Category { name } => entry.detected_category = Some(name.clone()),
    }
}

// =============================================================================
// RULE SELF-TEST
// =============================================================================

/// Outcome of validating a rule against its stored example pairs.
#[derive(Debug, Clone, Default)]
pub struct RuleValidation {
    /// All positives matched and no negative did.
    pub passed: bool,
    pub failed_positives: Vec<String>,
    pub failed_negatives: Vec<String>,
}

/// Validate a rule against its own positive/negative examples: every
/// positive must match, every negative must not. A rule-authoring aid, not
/// a runtime gate.
pub fn validate_rule(rule: &ParsingRule) -> RuleValidation {
    let Some(matcher) = Matcher::build(rule) else {
        return RuleValidation {
            passed: false,
            failed_positives: rule.positive_examples.clone(),
            failed_negatives: Vec::new(),
        };
    };

    let failed_positives: Vec<String> = rule
        .positive_examples
        .iter()
        .filter(|example| !matcher.is_match(example))
        .cloned()
        .collect();
    let failed_negatives: Vec<String> = rule
        .negative_examples
        .iter()
        .filter(|example| matcher.is_match(example))
        .cloned()
        .collect();

    RuleValidation {
        passed: failed_positives.is_empty() && failed_negatives.is_empty(),
        failed_positives,
        failed_negatives,
    }
}
