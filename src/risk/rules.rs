//! Configured rules and the evaluator that applies them to a command.

use serde::{Deserialize, Serialize};

use super::condition::{self, Conditions};
use super::level::RiskLevel;
use super::pattern::GlobPattern;
use crate::context::CommandContext;

/// A configured rule: glob pattern, level, and the reason shown when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub pattern: String,
    pub level: RiskLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,
}

impl Rule {
    pub fn new(pattern: impl Into<String>, level: RiskLevel, message: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            level,
            message: message.into(),
            conditions: None,
        }
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions);
        self
    }
}

/// Accumulated result of running every rule against one command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    pub score: i64,
    pub matched: Vec<Rule>,
    pub reasons: Vec<String>,
}

/// Rules with their patterns compiled once, in configured order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<(Rule, GlobPattern)>,
}

impl RuleSet {
    pub fn new(rules: &[Rule]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|r| (r.clone(), GlobPattern::new(&r.pattern)))
                .collect(),
        }
    }

    /// Apply every rule. Matches accumulate; there is no early exit and no
    /// de-duplication.
    pub fn evaluate(&self, ctx: &CommandContext) -> RuleOutcome {
        let mut outcome = RuleOutcome::default();
        for (rule, pattern) in &self.rules {
            if pattern.is_match(&ctx.full_command)
                && condition::satisfied(rule.conditions.as_ref(), ctx)
            {
                log::debug!("rule {:?} matched ({})", rule.pattern, rule.level);
                outcome.score += rule.level.base_score();
                outcome.reasons.push(rule.message.clone());
                outcome.matched.push(rule.clone());
            }
        }
        outcome
    }
}
