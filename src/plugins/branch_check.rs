use crate::context::{CommandContext, Environment};
use crate::plugins::{Plugin, PluginError};
use crate::risk::RiskLevel;
use crate::telemetry::TelemetryEvent;

/// Operations that get an extra bump when run on `main` or `master`.
const PROTECTED_BRANCH_OPS: &[&str] = &["push", "deploy", "publish", "delete", "drop", "reset"];

/// Adds +15 for a risky operation on a protected branch (once, however many
/// operations appear) and +10 in production.
pub struct BranchCheckPlugin;

impl BranchCheckPlugin {
    pub const ID: &'static str = "custom-branch-check";
}

impl Plugin for BranchCheckPlugin {
    fn name(&self) -> &str {
        Self::ID
    }

    fn evaluate(&self, ctx: &CommandContext, score: i64) -> Result<i64, PluginError> {
        let mut score = score;

        if let Some(branch @ ("main" | "master")) = ctx.current_branch.as_deref() {
            let cmd = ctx.full_command.to_lowercase();
            if let Some(op) = PROTECTED_BRANCH_OPS.iter().find(|op| cmd.contains(*op)) {
                log::info!("{}: +15 for {op} on {branch}", Self::ID);
                score = score.saturating_add(15);
            }
        }

        if ctx.environment == Environment::Production {
            log::info!("{}: +10 for production environment", Self::ID);
            score = score.saturating_add(10);
        }

        Ok(score)
    }

    fn on_event(&self, event: &TelemetryEvent) -> Result<(), PluginError> {
        if event.risk_level == RiskLevel::Critical && event.executed {
            log::warn!("{}: critical command executed: {}", Self::ID, event.command);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(ctx: CommandContext) -> i64 {
        BranchCheckPlugin.evaluate(&ctx, 10).unwrap()
    }

    #[test]
    fn push_on_main() {
        assert_eq!(eval(CommandContext::from_command("git push origin").with_branch("main")), 25);
    }

    #[test]
    fn multiple_ops_count_once() {
        let ctx = CommandContext::from_command("deploy && git push").with_branch("master");
        assert_eq!(eval(ctx), 25);
    }

    #[test]
    fn feature_branch_untouched() {
        assert_eq!(eval(CommandContext::from_command("git push").with_branch("feature/x")), 10);
        assert_eq!(eval(CommandContext::from_command("git push")), 10);
    }

    #[test]
    fn production_adds_ten() {
        let ctx = CommandContext::from_command("ls").with_environment(Environment::Production);
        assert_eq!(eval(ctx), 20);
        let ctx = CommandContext::from_command("git reset --hard")
            .with_branch("main")
            .with_environment(Environment::Production);
        assert_eq!(eval(ctx), 35);
    }

    #[test]
    fn saturates_at_the_top() {
        let ctx = CommandContext::from_command("git push")
            .with_branch("main")
            .with_environment(Environment::Production);
        assert_eq!(BranchCheckPlugin.evaluate(&ctx, i64::MAX).unwrap(), i64::MAX);
    }
}
