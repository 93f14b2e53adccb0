use serde::{Deserialize, Serialize};

use crate::context::CommandContext;

/// Optional qualifiers on a rule. Every present condition must hold.
///
/// Values may be prefixed with `!` to negate the comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, alias = "environment", skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
}

impl Conditions {
    pub fn is_satisfied(&self, ctx: &CommandContext) -> bool {
        self.branch_matches(ctx) && self.env_matches(ctx)
    }

    /// A branch condition cannot disqualify a context that has no branch.
    fn branch_matches(&self, ctx: &CommandContext) -> bool {
        match (&self.branch, &ctx.current_branch) {
            (Some(pattern), Some(branch)) => compare(pattern, branch),
            _ => true,
        }
    }

    fn env_matches(&self, ctx: &CommandContext) -> bool {
        match &self.env {
            Some(pattern) => compare(pattern, ctx.environment.as_str()),
            None => true,
        }
    }
}

/// Evaluate an optional condition block; absence always matches.
pub fn satisfied(conditions: Option<&Conditions>, ctx: &CommandContext) -> bool {
    conditions.is_none_or(|c| c.is_satisfied(ctx))
}

/// Exact comparison, inverted when the pattern starts with `!`.
fn compare(pattern: &str, actual: &str) -> bool {
    match pattern.strip_prefix('!') {
        Some(target) => actual != target,
        None => actual == pattern,
    }
}
