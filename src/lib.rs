//! cmd-sentinel: a risk gate in front of shell commands.
//!
//! Each command is scored before it runs. Configured glob rules and a fixed
//! set of heuristics produce a score in `0..=100`, plugins may adjust it, and
//! the resulting [`risk::RiskLevel`] decides what happens: `safe` commands
//! run, `warning` commands need a yes, `critical` commands need a yes and
//! the command retyped verbatim.
//!
//! # Architecture
//!
//! - **[`context`]**: The command snapshot: binary, args, branch, cwd, environment.
//! - **[`risk`]**: Pattern matching, conditions, rules, heuristics, assessor.
//! - **[`plugins`]**: Score-adjusting plugins: trait, isolated pipeline, registry.
//! - **[`decision`]**: The allow / confirm / block state machine and prompts.
//! - **[`gate`]**: Orchestration and command execution.
//! - **[`telemetry`]**: Post-decision events, history and stats.
//! - **[`config`]**: Configuration loading: embedded defaults + user overlay merge.
//! - **[`logging`]**: File logger under `~/.local/share/sentinel/`.

/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Command context construction and environment detection.
pub mod context;
/// Decision state machine and operator prompts.
pub mod decision;
/// Error type for the gate.
pub mod error;
/// Orchestration of the full pipeline and the execution gate.
pub mod gate;
/// File-based diagnostic logging.
pub mod logging;
/// Score-adjusting plugins.
pub mod plugins;
/// Risk assessment.
pub mod risk;
/// Telemetry events, history, and stats.
pub mod telemetry;

pub use context::{CommandContext, Environment};
pub use decision::{Action, Decision};
pub use error::SentinelError;
pub use gate::{Mode, RunOptions, Sentinel};
pub use risk::{Assessment, RiskLevel};

/// Assess a command string against the default configuration.
///
/// Uses the wall clock, no plugins, and no branch or environment; build a
/// [`Sentinel`] for anything more.
pub fn assess(command: &str) -> Assessment {
    let config = config::Config::default_config();
    let assessor = risk::RiskAssessor::new(&config.rules, config.settings.global_intercept);
    assessor.assess(&CommandContext::from_command(command))
}
