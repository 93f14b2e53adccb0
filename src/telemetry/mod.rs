//! Post-decision events and their on-disk history.
//!
//! Recording is best-effort: every failure is logged and swallowed so the
//! gate itself never fails because of telemetry.

/// Aggregate counters and their text rendering.
pub mod stats;

pub use stats::Stats;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::context::CommandContext;
use crate::decision::{Action, Decision};
use crate::risk::{Assessment, RiskLevel};

/// Number of events kept in `events.json`.
pub const MAX_EVENTS: usize = 1000;

const EVENTS_FILE: &str = "events.json";
const STATS_FILE: &str = "stats.json";

/// How the gate disposed of the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Allowed,
    Blocked,
    Confirmed,
}

impl Outcome {
    pub fn from_decision(decision: &Decision) -> Self {
        match (decision.action, decision.executed) {
            (Action::Allow, true) => Outcome::Allowed,
            (Action::Confirm, true) => Outcome::Confirmed,
            _ => Outcome::Blocked,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Allowed => "allowed",
            Outcome::Blocked => "blocked",
            Outcome::Confirmed => "confirmed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub decision: Outcome,
    pub executed: bool,
}

impl TelemetryEvent {
    pub fn new(ctx: &CommandContext, assessment: &Assessment, decision: &Decision) -> Self {
        Self {
            timestamp: decision.timestamp,
            command: ctx.full_command.clone(),
            risk_score: assessment.score,
            risk_level: assessment.level,
            decision: Outcome::from_decision(decision),
            executed: decision.executed,
        }
    }
}

/// Event history and stats stored as JSON files in one directory.
#[derive(Debug, Clone)]
pub struct TelemetryStore {
    dir: PathBuf,
}

impl TelemetryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the sentinel data directory; `None` without `$HOME`.
    pub fn open_default() -> Option<Self> {
        crate::logging::data_dir().map(Self::new)
    }

    /// Append `event` to the history and fold it into the stats.
    pub fn record(&self, event: &TelemetryEvent) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            log::error!("telemetry: cannot create {}: {e}", self.dir.display());
            return;
        }
        log::info!(
            "command_evaluated score={} level={} decision={} executed={} command={:?}",
            event.risk_score,
            event.risk_level,
            event.decision.as_str(),
            event.executed,
            event.command
        );
        self.append_event(event);
        self.update_stats(event);
    }

    fn append_event(&self, event: &TelemetryEvent) {
        let mut events = self.load_events();
        events.push(event.clone());
        if events.len() > MAX_EVENTS {
            let excess = events.len() - MAX_EVENTS;
            events.drain(..excess);
        }
        if let Err(e) = write_json(&self.dir.join(EVENTS_FILE), &events) {
            log::error!("telemetry: failed to append event: {e}");
        }
    }

    fn update_stats(&self, event: &TelemetryEvent) {
        let mut stats = self.load_stats();
        stats.record(event, Utc::now());
        if let Err(e) = write_json(&self.dir.join(STATS_FILE), &stats) {
            log::error!("telemetry: failed to save stats: {e}");
        }
    }

    /// All stored events, oldest first. Missing or corrupt files read as empty.
    pub fn load_events(&self) -> Vec<TelemetryEvent> {
        read_json(&self.dir.join(EVENTS_FILE)).unwrap_or_default()
    }

    /// The `limit` most recent events, newest first.
    pub fn recent_events(&self, limit: usize) -> Vec<TelemetryEvent> {
        let events = self.load_events();
        events.into_iter().rev().take(limit).collect()
    }

    pub fn load_stats(&self) -> Stats {
        read_json(&self.dir.join(STATS_FILE)).unwrap_or_default()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            log::error!("telemetry: cannot read {}: {e}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(v) => Some(v),
        Err(e) => {
            log::error!("telemetry: corrupt {}: {e}", path.display());
            None
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}
