//! Built-in scoring checks that run regardless of the configured rules.
//!
//! Each check is independent and additive. Time-based checks look at the
//! local wall clock passed in by the caller.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

use crate::context::{CommandContext, Environment};

const DESTRUCTIVE_KEYWORDS: &[&str] = &[
    "delete", "drop", "remove", "reset", "destroy", "purge", "truncate",
];

/// A single built-in check.
pub struct Heuristic {
    pub name: &'static str,
    pub delta: i64,
    pub reason: &'static str,
    check: fn(&CommandContext, &NaiveDateTime) -> bool,
}

impl Heuristic {
    pub fn triggers(&self, ctx: &CommandContext, now: &NaiveDateTime) -> bool {
        (self.check)(ctx, now)
    }
}

/// The fixed, ordered heuristic table.
pub static HEURISTICS: &[Heuristic] = &[
    Heuristic {
        name: "main-branch",
        delta: 20,
        reason: "operation on the main branch",
        check: |ctx, _| matches!(ctx.current_branch.as_deref(), Some("main" | "master")),
    },
    Heuristic {
        name: "production",
        delta: 25,
        reason: "production environment detected",
        check: |ctx, _| ctx.environment == Environment::Production,
    },
    Heuristic {
        name: "force-flag",
        delta: 30,
        reason: "force flag detected",
        check: |ctx, _| {
            ctx.args
                .iter()
                .any(|a| a.contains("--force") || a.contains("-f"))
        },
    },
    Heuristic {
        name: "destructive-keyword",
        delta: 25,
        reason: "destructive keyword in command",
        check: |ctx, _| {
            let cmd = ctx.full_command.to_lowercase();
            DESTRUCTIVE_KEYWORDS.iter().any(|k| cmd.contains(k))
        },
    },
    Heuristic {
        name: "late-night",
        delta: 15,
        reason: "late-night operation (22:00-06:00)",
        check: |_, now| is_late_night(now),
    },
    Heuristic {
        name: "weekend-deploy",
        delta: 20,
        reason: "deploy on a weekend",
        check: |ctx, now| is_weekend(now) && ctx.full_command.to_lowercase().contains("deploy"),
    },
    Heuristic {
        name: "migration",
        delta: 15,
        reason: "database migration detected",
        check: |ctx, _| ctx.full_command.to_lowercase().contains("migrate"),
    },
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeuristicOutcome {
    pub score: i64,
    pub reasons: Vec<String>,
}

/// Run every heuristic in table order.
pub fn evaluate(ctx: &CommandContext, now: &NaiveDateTime) -> HeuristicOutcome {
    let mut outcome = HeuristicOutcome::default();
    for h in HEURISTICS {
        if h.triggers(ctx, now) {
            log::debug!("heuristic {} triggered (+{})", h.name, h.delta);
            outcome.score += h.delta;
            outcome.reasons.push(h.reason.to_string());
        }
    }
    outcome
}

pub fn is_late_night(now: &NaiveDateTime) -> bool {
    let hour = now.hour();
    hour >= 22 || hour < 6
}

pub fn is_weekend(now: &NaiveDateTime) -> bool {
    matches!(now.weekday(), Weekday::Sat | Weekday::Sun)
}
