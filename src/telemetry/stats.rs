use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use super::{Outcome, TelemetryEvent};
use crate::risk::RiskLevel;

const BAR_WIDTH: usize = 30;
const RULE_WIDTH: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub safe: u64,
    pub warning: u64,
    pub critical: u64,
}

impl RiskDistribution {
    fn bump(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Safe => self.safe += 1,
            RiskLevel::Warning => self.warning += 1,
            RiskLevel::Critical => self.critical += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    pub total_commands: u64,
    pub blocked_commands: u64,
    pub executed_commands: u64,
    /// Last time a critical command actually ran.
    pub last_incident: Option<DateTime<Utc>>,
    pub days_without_incident: i64,
    pub risk_distribution: RiskDistribution,
}

impl Stats {
    /// Fold one event into the counters.
    pub fn record(&mut self, event: &TelemetryEvent, now: DateTime<Utc>) {
        self.total_commands += 1;
        if event.decision == Outcome::Blocked {
            self.blocked_commands += 1;
        }
        if event.executed {
            self.executed_commands += 1;
        }
        self.risk_distribution.bump(event.risk_level);

        if event.risk_level == RiskLevel::Critical && event.executed {
            self.last_incident = Some(event.timestamp);
            self.days_without_incident = 0;
        } else if let Some(last) = self.last_incident {
            self.days_without_incident = (now - last).num_days();
        }
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

fn bar(part: u64, total: u64) -> String {
    let filled = if total == 0 {
        0
    } else {
        ((part as f64 / total as f64) * BAR_WIDTH as f64).round() as usize
    };
    let filled = filled.min(BAR_WIDTH);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// Render the `sentinel stats` report.
pub fn render(stats: &Stats, recent: &[TelemetryEvent]) -> String {
    let mut out = String::new();
    let rule = "─".repeat(RULE_WIDTH);
    let total = stats.total_commands;

    let _ = writeln!(out, "SENTINEL STATS");
    let _ = writeln!(out);
    let _ = writeln!(out, "Overview");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "  Commands evaluated:   {total}");
    let _ = writeln!(
        out,
        "  Commands executed:    {} ({:.1}%)",
        stats.executed_commands,
        percent(stats.executed_commands, total)
    );
    let _ = writeln!(
        out,
        "  Commands blocked:     {} ({:.1}%)",
        stats.blocked_commands,
        percent(stats.blocked_commands, total)
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Risk distribution");
    let _ = writeln!(out, "{rule}");
    let d = &stats.risk_distribution;
    for (label, count) in [("Safe", d.safe), ("Warning", d.warning), ("Critical", d.critical)] {
        let _ = writeln!(
            out,
            "  {label:<9} {} {count} ({:.1}%)",
            bar(count, total),
            percent(count, total)
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Incidents");
    let _ = writeln!(out, "{rule}");
    match stats.last_incident {
        Some(ts) => {
            let _ = writeln!(out, "  Last incident:        {}", ts.format("%Y-%m-%d %H:%M UTC"));
            let _ = writeln!(out, "  Days without incident: {}", stats.days_without_incident);
        }
        None => {
            let _ = writeln!(out, "  No critical command has been executed.");
        }
    }

    if !recent.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Recent commands");
        let _ = writeln!(out, "{rule}");
        for e in recent {
            let cmd: String = e.command.chars().take(40).collect();
            let _ = writeln!(
                out,
                "  {} {:<8} {:>3} {:<9} {cmd}",
                e.timestamp.format("%m-%d %H:%M"),
                e.risk_level.as_str(),
                e.risk_score,
                e.decision.as_str(),
            );
        }
    }

    out
}
