//! Rule-based field extraction.

pub mod amounts;
pub mod dates;
pub mod patterns;
pub mod services;

pub use amounts::{format_amount, to_decimal};
pub use dates::parse_invoice_date;
pub use services::{ServiceMatch, ServiceMatcher};

use regex::{Regex, RegexBuilder};
use tracing::{trace, warn};

use crate::models::pattern::{ExtractionRule, FieldType};
use crate::registry::PatternRegistry;

/// Compiled program size ceiling for store-supplied patterns.
const REGEX_SIZE_LIMIT: usize = 1 << 21;

/// Outcome of evaluating one rule against a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The rule produced a non-empty, trimmed capture.
    Matched(String),
    /// The rule did not match, or captured only whitespace.
    NoMatch,
    /// The rule cannot be evaluated.
    RuleError(String),
}

/// An extraction rule with its pattern compiled.
///
/// A pattern that fails to compile is kept so that it can be reported each
/// time the rule is tried.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: ExtractionRule,
    regex: Result<Regex, String>,
}

impl CompiledRule {
    /// Compile a rule case-insensitively with `^`/`$` anchoring at line ends.
    pub fn compile(rule: ExtractionRule) -> Self {
        let regex = RegexBuilder::new(&rule.pattern)
            .case_insensitive(true)
            .multi_line(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map_err(|e| e.to_string());
        Self { rule, regex }
    }

    pub fn rule(&self) -> &ExtractionRule {
        &self.rule
    }

    pub fn name(&self) -> &str {
        &self.rule.name
    }

    /// Whether the pattern compiled.
    pub fn is_valid(&self) -> bool {
        self.regex.is_ok()
    }

    /// Apply the rule to `text`.
    pub fn evaluate(&self, text: &str) -> RuleOutcome {
        let regex = match &self.regex {
            Ok(regex) => regex,
            Err(reason) => return RuleOutcome::RuleError(reason.clone()),
        };

        let index = self.rule.capture_index;
        if index >= regex.captures_len() {
            return RuleOutcome::RuleError(format!(
                "capture group {} out of range ({} groups)",
                index,
                regex.captures_len() - 1
            ));
        }

        match regex.captures(text).and_then(|caps| caps.get(index)) {
            Some(m) if !m.as_str().trim().is_empty() => {
                RuleOutcome::Matched(m.as_str().trim().to_string())
            }
            _ => RuleOutcome::NoMatch,
        }
    }
}

/// Applies a field's ordered rule list to a text.
pub struct FieldExtractor<'a> {
    registry: &'a PatternRegistry,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(registry: &'a PatternRegistry) -> Self {
        Self { registry }
    }

    /// The first non-empty capture among the field's rules, lowest priority first.
    ///
    /// Broken rules are logged and skipped.
    pub fn extract(&self, text: &str, field: FieldType) -> Option<String> {
        for rule in self.registry.rules_for(field) {
            match rule.evaluate(text) {
                RuleOutcome::Matched(value) => {
                    trace!("{}: '{}' matched by rule '{}'", field, value, rule.name());
                    return Some(value);
                }
                RuleOutcome::NoMatch => {}
                RuleOutcome::RuleError(reason) => {
                    warn!("Skipping rule '{}' for {}: {}", rule.name(), field, reason);
                }
            }
        }
        None
    }

    /// Every rule's outcome for a field, in evaluation order.
    pub fn explain(&self, text: &str, field: FieldType) -> Vec<(String, RuleOutcome)> {
        self.registry
            .rules_for(field)
            .iter()
            .map(|rule| (rule.name().to_string(), rule.evaluate(text)))
            .collect()
    }
}
