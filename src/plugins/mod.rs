//! Score-adjusting plugins.
//!
//! Plugins run in configured order, each seeing the score produced by the
//! one before it. A failing or panicking plugin is logged and skipped: the
//! fold continues with the score it was handed.

/// Built-in plugin raising the score for risky operations on main branches.
pub mod branch_check;
/// Plugins implemented as external executables speaking JSON.
pub mod external;
/// Resolution of configured plugin locations into plugin instances.
pub mod registry;

pub use registry::PluginRegistry;

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::context::CommandContext;
use crate::risk::{Assessment, clamp_score};
use crate::telemetry::TelemetryEvent;

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("{0}")]
    Failed(String),
    #[error("plugin panicked: {0}")]
    Panicked(String),
    #[error("plugin i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("plugin protocol error: {0}")]
    Protocol(String),
}

/// An isolated extension able to adjust the risk score and observe the
/// final outcome of each command.
pub trait Plugin: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Return the adjusted score given the score so far.
    fn evaluate(&self, ctx: &CommandContext, score: i64) -> Result<i64, PluginError>;

    /// Observe the post-decision event. Optional.
    fn on_event(&self, _event: &TelemetryEvent) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Ordered list of loaded plugins.
#[derive(Default)]
pub struct PluginPipeline {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginPipeline {
    pub fn new(plugins: Vec<Box<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    pub fn push(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn loaded_names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }

    /// Fold every plugin over `score` in load order.
    ///
    /// Each plugin's answer is clamped to `0..=100` before the next plugin
    /// sees it, so no plugin can hand an out-of-range value down the chain.
    pub fn apply(&self, ctx: &CommandContext, score: i64) -> i64 {
        let mut score = score;
        for plugin in &self.plugins {
            match guarded(|| plugin.evaluate(ctx, score)) {
                Ok(next) => {
                    let next = i64::from(clamp_score(next));
                    if next != score {
                        log::debug!("plugin {}: score {score} -> {next}", plugin.name());
                    }
                    score = next;
                }
                Err(e) => log::error!("plugin {} failed during evaluate: {e}", plugin.name()),
            }
        }
        score
    }

    /// Run the fold over an assessment and derive the final assessment.
    ///
    /// The folded score is clamped; the level is recomputed only when the
    /// score changed.
    pub fn adjust(&self, ctx: &CommandContext, base: &Assessment) -> Assessment {
        if self.plugins.is_empty() {
            return base.clone();
        }
        let adjusted = clamp_score(self.apply(ctx, i64::from(base.score)));
        base.reclassify(adjusted)
    }

    /// Deliver the post-decision event to every plugin, in load order.
    pub fn notify(&self, event: &TelemetryEvent) {
        for plugin in &self.plugins {
            if let Err(e) = guarded(|| plugin.on_event(event)) {
                log::error!("plugin {} failed during on_event: {e}", plugin.name());
            }
        }
    }
}

/// Call into plugin code, converting a panic into a `PluginError`.
fn guarded<T>(f: impl FnOnce() -> Result<T, PluginError>) -> Result<T, PluginError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            Err(PluginError::Panicked(msg))
        }
    }
}
