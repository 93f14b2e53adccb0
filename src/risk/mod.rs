//! Risk assessment: configured rules plus built-in heuristics, clamped and
//! classified into a [`RiskLevel`].

pub mod condition;
pub mod heuristics;
pub mod level;
pub mod pattern;
pub mod rules;

pub use condition::Conditions;
pub use level::{RiskLevel, clamp_score, classify};
pub use pattern::GlobPattern;
pub use rules::{Rule, RuleOutcome, RuleSet};

use chrono::{Local, NaiveDateTime};
use serde::Serialize;

use crate::context::CommandContext;

/// Reason appended when global intercept lifts a safe command to warning.
pub const GLOBAL_INTERCEPT_REASON: &str = "global monitoring active";

/// Score forced by global intercept.
const GLOBAL_INTERCEPT_SCORE: u8 = level::WARNING_THRESHOLD;

/// Outcome of assessing one command. Never mutated once returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    /// Always within `0..=100`.
    pub score: u8,
    pub level: RiskLevel,
    pub matched_rules: Vec<Rule>,
    /// Rule messages then heuristic reasons, in evaluation order.
    pub reasons: Vec<String>,
}

impl Assessment {
    /// Derive a new assessment carrying `score`, with the level recomputed.
    ///
    /// Returns an unchanged copy when the score is the same.
    pub fn reclassify(&self, score: u8) -> Assessment {
        if score == self.score {
            return self.clone();
        }
        Assessment {
            score,
            level: classify(score),
            ..self.clone()
        }
    }
}

/// Composes the rule evaluator and the heuristic scorer.
#[derive(Debug, Clone)]
pub struct RiskAssessor {
    rules: RuleSet,
    global_intercept: bool,
}

impl RiskAssessor {
    pub fn new(rules: &[Rule], global_intercept: bool) -> Self {
        Self {
            rules: RuleSet::new(rules),
            global_intercept,
        }
    }

    /// Assess against the local wall clock.
    pub fn assess(&self, ctx: &CommandContext) -> Assessment {
        self.assess_at(ctx, &Local::now().naive_local())
    }

    /// Assess as if the local time were `now`.
    pub fn assess_at(&self, ctx: &CommandContext, now: &NaiveDateTime) -> Assessment {
        let RuleOutcome {
            score: rule_score,
            matched,
            mut reasons,
        } = self.rules.evaluate(ctx);

        let heuristic = heuristics::evaluate(ctx, now);
        reasons.extend(heuristic.reasons);

        let mut score = clamp_score(rule_score.saturating_add(heuristic.score));
        let mut level = classify(score);

        if self.global_intercept && level == RiskLevel::Safe {
            score = GLOBAL_INTERCEPT_SCORE;
            level = RiskLevel::Warning;
            reasons.push(GLOBAL_INTERCEPT_REASON.to_string());
        }

        Assessment {
            score,
            level,
            matched_rules: matched,
            reasons,
        }
    }
}
