//! Decision state machine: turns a classified assessment into an outcome,
//! asking the operator when the level calls for it.
//!
//! - `safe` runs without interaction.
//! - `warning` asks a single "proceed anyway?" question.
//! - `critical` asks whether the operator understands the consequences,
//!   then requires the full command to be retyped exactly.
//!
//! Auto-approve skips every prompt, for both warning and critical commands.
//! That makes a critical command runnable with one flag; callers should
//! only set it for scripted, non-interactive use.

/// Prompt sources: terminal, scripted.
pub mod prompt;

pub use prompt::{Prompter, ScriptedPrompter, TerminalPrompter};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Write};

use crate::context::{CommandContext, Environment};
use crate::risk::{Assessment, RiskLevel};

pub const PROCEED_QUESTION: &str = "Proceed anyway?";
pub const UNDERSTAND_QUESTION: &str = "Do you truly understand the consequences of this command?";

const RULE_WIDTH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Block,
    Confirm,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::Block => "block",
            Action::Confirm => "confirm",
        }
    }
}

/// Outcome for one command. `executed` is authoritative: the gate runs the
/// command if and only if it is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub action: Action,
    pub executed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_confirmed: Option<bool>,
    pub timestamp: DateTime<Utc>,
}

impl Decision {
    fn new(action: Action, executed: bool, user_confirmed: Option<bool>) -> Self {
        Self {
            action,
            executed,
            user_confirmed,
            timestamp: Utc::now(),
        }
    }

    /// Run without interaction.
    pub fn allow() -> Self {
        Self::new(Action::Allow, true, None)
    }

    /// Operator confirmed.
    pub fn confirmed() -> Self {
        Self::new(Action::Confirm, true, Some(true))
    }

    /// Operator declined a warning prompt.
    pub fn declined() -> Self {
        Self::new(Action::Confirm, false, Some(false))
    }

    /// Critical command refused.
    pub fn block() -> Self {
        Self::new(Action::Block, false, Some(false))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    auto_approve: bool,
}

impl DecisionEngine {
    pub fn new(auto_approve: bool) -> Self {
        Self { auto_approve }
    }

    /// Decide what happens to the command.
    ///
    /// Presentation text goes to `out`; answers come from `prompter`.
    /// Only I/O failures on `out` or the prompter surface as errors.
    pub fn decide(
        &self,
        ctx: &CommandContext,
        assessment: &Assessment,
        prompter: &mut dyn Prompter,
        out: &mut dyn Write,
    ) -> io::Result<Decision> {
        if assessment.level == RiskLevel::Safe {
            return Ok(Decision::allow());
        }

        if self.auto_approve {
            log::warn!(
                "auto-approve bypassed {} confirmation for {:?}",
                assessment.level,
                ctx.full_command
            );
            return Ok(Decision::allow());
        }

        match assessment.level {
            RiskLevel::Safe => Ok(Decision::allow()),
            RiskLevel::Warning => self.handle_warning(ctx, assessment, prompter, out),
            RiskLevel::Critical => self.handle_critical(ctx, assessment, prompter, out),
        }
    }

    fn handle_warning(
        &self,
        ctx: &CommandContext,
        assessment: &Assessment,
        prompter: &mut dyn Prompter,
        out: &mut dyn Write,
    ) -> io::Result<Decision> {
        render_warning(ctx, assessment, out)?;
        if prompter.confirm(PROCEED_QUESTION, false)? {
            Ok(Decision::confirmed())
        } else {
            Ok(Decision::declined())
        }
    }

    fn handle_critical(
        &self,
        ctx: &CommandContext,
        assessment: &Assessment,
        prompter: &mut dyn Prompter,
        out: &mut dyn Write,
    ) -> io::Result<Decision> {
        render_critical(ctx, assessment, out)?;

        if !prompter.confirm(UNDERSTAND_QUESTION, false)? {
            writeln!(out, "\nWise choice. Command blocked.\n")?;
            return Ok(Decision::block());
        }

        let typed = prompter.input(&retype_question(&ctx.full_command))?;
        if typed.trim() != ctx.full_command.trim() {
            writeln!(out, "\nCommand does not match. Blocked.\n")?;
            return Ok(Decision::block());
        }

        writeln!(out, "\nProceeding at your own risk...\n")?;
        Ok(Decision::confirmed())
    }
}

pub fn retype_question(command: &str) -> String {
    format!("Type the full command to confirm: \"{command}\"")
}

fn write_reasons(out: &mut dyn Write, heading: &str, reasons: &[String]) -> io::Result<()> {
    if reasons.is_empty() {
        return Ok(());
    }
    writeln!(out, "\n{heading}")?;
    for reason in reasons {
        writeln!(out, "  • {reason}")?;
    }
    Ok(())
}

pub fn render_warning(
    ctx: &CommandContext,
    assessment: &Assessment,
    out: &mut dyn Write,
) -> io::Result<()> {
    let rule = "━".repeat(RULE_WIDTH);
    writeln!(out, "\n⚠️  MODERATE RISK")?;
    writeln!(out, "{rule}")?;
    writeln!(out, "Command: {}", ctx.full_command)?;
    writeln!(out, "Risk score: {}/100", assessment.score)?;
    write_reasons(out, "Reasons:", &assessment.reasons)?;
    writeln!(out, "{rule}")?;
    out.flush()
}

pub fn render_critical(
    ctx: &CommandContext,
    assessment: &Assessment,
    out: &mut dyn Write,
) -> io::Result<()> {
    let rule = "━".repeat(RULE_WIDTH);
    writeln!(out, "\n🚨 CRITICAL RISK - DANGEROUS COMMAND DETECTED")?;
    writeln!(out, "{rule}")?;
    writeln!(out, "Command: {}", ctx.full_command)?;
    writeln!(out, "Risk score: {}/100", assessment.score)?;
    if let Some(branch) = &ctx.current_branch {
        writeln!(out, "Branch: {branch}")?;
    }
    if ctx.environment != Environment::Unknown {
        writeln!(out, "Environment: {}", ctx.environment)?;
    }
    write_reasons(out, "Reasons:", &assessment.reasons)?;
    writeln!(out, "{rule}")?;
    writeln!(out, "\nBefore going ahead:")?;
    writeln!(out, "  • Review the command carefully")?;
    writeln!(out, "  • Check that you are in the right environment")?;
    writeln!(out, "  • Consider taking a backup first")?;
    writeln!(out, "  • Ask the team if in doubt\n")?;
    out.flush()
}
