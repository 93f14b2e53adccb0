//! The full gate: assess, adjust, decide, record, then run or refuse.

use chrono::NaiveDateTime;
use std::io::Write;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use crate::config::Config;
use crate::context::CommandContext;
use crate::decision::{Decision, DecisionEngine, Prompter};
use crate::error::{Result, SentinelError};
use crate::plugins::{PluginPipeline, PluginRegistry};
use crate::risk::{Assessment, RiskAssessor};
use crate::telemetry::{TelemetryEvent, TelemetryStore};

/// Exit status used whenever the command does not run.
pub const BLOCKED_EXIT: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Run the command when the decision allows it.
    #[default]
    Execute,
    /// Never run; report through the exit status only.
    AnalyzeOnly,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub mode: Mode,
    /// Skip every confirmation prompt. Security-sensitive: this lets a
    /// critical command through with no interaction.
    pub auto_approve: bool,
}

/// Both derivations of one command's risk.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Rules and heuristics only.
    pub base: Assessment,
    /// After the plugin fold.
    pub adjusted: Assessment,
}

pub struct Sentinel {
    assessor: RiskAssessor,
    plugins: PluginPipeline,
    telemetry: Option<TelemetryStore>,
    telemetry_enabled: bool,
}

impl Sentinel {
    /// Build from a loaded config and an already-resolved plugin pipeline.
    /// No telemetry store is attached.
    pub fn new(config: &Config, plugins: PluginPipeline) -> Self {
        Self {
            assessor: RiskAssessor::new(&config.rules, config.settings.global_intercept),
            plugins,
            telemetry: None,
            telemetry_enabled: config.settings.telemetry_enabled,
        }
    }

    /// Build with built-in plugin resolution and the default telemetry store.
    pub fn from_config(config: &Config, cwd: &Path) -> Self {
        let plugins = PluginRegistry::with_builtins().load(&config.plugins, cwd);
        if !plugins.is_empty() {
            log::info!("plugins loaded: {}", plugins.loaded_names().join(", "));
        }
        Self::new(config, plugins).with_telemetry(TelemetryStore::open_default())
    }

    pub fn with_telemetry(mut self, store: Option<TelemetryStore>) -> Self {
        self.telemetry = store;
        self
    }

    pub fn plugins(&self) -> &PluginPipeline {
        &self.plugins
    }

    pub fn evaluate(&self, ctx: &CommandContext) -> Evaluation {
        let base = self.assessor.assess(ctx);
        self.finish(ctx, base)
    }

    pub fn evaluate_at(&self, ctx: &CommandContext, now: &NaiveDateTime) -> Evaluation {
        let base = self.assessor.assess_at(ctx, now);
        self.finish(ctx, base)
    }

    fn finish(&self, ctx: &CommandContext, base: Assessment) -> Evaluation {
        let adjusted = self.plugins.adjust(ctx, &base);
        log::info!(
            "assessed {:?}: score={} level={} reasons={:?}",
            ctx.full_command,
            adjusted.score,
            adjusted.level,
            adjusted.reasons
        );
        Evaluation { base, adjusted }
    }

    /// Record the outcome and notify plugins.
    pub fn report(&self, ctx: &CommandContext, assessment: &Assessment, decision: &Decision) {
        let event = TelemetryEvent::new(ctx, assessment, decision);
        if self.telemetry_enabled
            && let Some(store) = &self.telemetry
        {
            store.record(&event);
        }
        self.plugins.notify(&event);
    }

    /// Evaluate, decide, report, and gate one command, returning the exit
    /// status for this invocation.
    pub fn run(
        &self,
        ctx: &CommandContext,
        options: RunOptions,
        prompter: &mut dyn Prompter,
        out: &mut dyn Write,
    ) -> Result<i32> {
        let evaluation = self.evaluate(ctx);
        self.run_evaluated(ctx, &evaluation.adjusted, options, prompter, out)
    }

    /// Same as [`Sentinel::run`] for an assessment computed by the caller.
    pub fn run_evaluated(
        &self,
        ctx: &CommandContext,
        assessment: &Assessment,
        options: RunOptions,
        prompter: &mut dyn Prompter,
        out: &mut dyn Write,
    ) -> Result<i32> {
        let decision = DecisionEngine::new(options.auto_approve)
            .decide(ctx, assessment, prompter, out)
            .map_err(SentinelError::Prompt)?;
        log::info!(
            "decision for {:?}: action={} executed={}",
            ctx.full_command,
            decision.action.as_str(),
            decision.executed
        );

        self.report(ctx, assessment, &decision);
        gate(&decision, &ctx.full_command, options.mode, out)
    }
}

/// Act on a decision: report, run, or refuse.
pub fn gate(decision: &Decision, command: &str, mode: Mode, out: &mut dyn Write) -> Result<i32> {
    if mode == Mode::AnalyzeOnly {
        return Ok(if decision.executed { 0 } else { BLOCKED_EXIT });
    }

    if !decision.executed {
        writeln!(out, "\n🛡️  Sentinel blocked the command.\n")?;
        return Ok(BLOCKED_EXIT);
    }

    // Once the command is allowed, a broken `out` must not stop it running
    // or change its exit status.
    let _ = writeln!(out, "\n⚡ Running command...\n").and_then(|()| out.flush());
    match execute(command) {
        Ok(code) => {
            log::info!("command exited with {code}");
            if code != 0 {
                let _ = writeln!(out, "\n❌ Command failed (exit {code})\n");
            }
            Ok(code)
        }
        Err(e) => {
            log::error!("{e}");
            let _ = writeln!(out, "\n❌ {e}\n");
            Ok(BLOCKED_EXIT)
        }
    }
}

/// Run `command` through the host shell with inherited stdio and wait.
pub fn execute(command: &str) -> Result<i32> {
    let status = shell_command(command)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(SentinelError::Spawn)?;
    Ok(exit_code(status))
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// The child's exit code; signal deaths map to `128 + signal` on unix.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }
    BLOCKED_EXIT
}
