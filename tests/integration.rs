use chrono::{NaiveDate, NaiveDateTime};
use cmd_sentinel::config::Config;
use cmd_sentinel::decision::{
    DecisionEngine, PROCEED_QUESTION, ScriptedPrompter, UNDERSTAND_QUESTION,
};
use cmd_sentinel::plugins::{Plugin, PluginError, PluginPipeline, PluginRegistry};
use cmd_sentinel::risk::{Conditions, GLOBAL_INTERCEPT_REASON, Rule};
use cmd_sentinel::telemetry::{Outcome, TelemetryEvent, TelemetryStore};
use std::sync::{Arc, Mutex};
use cmd_sentinel::{
    Action, Assessment, CommandContext, Environment, Mode, RiskLevel, RunOptions, Sentinel,
};

/// Wednesday 2024-05-15, 12:00: no time-based heuristic fires.
fn weekday_noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
}

fn default_sentinel() -> Sentinel {
    Sentinel::new(&Config::default_config(), PluginPipeline::default())
}

fn ctx(command: &str, branch: &str, env: Environment) -> CommandContext {
    CommandContext::from_args(&[command], Some(branch.to_string()), "/work", env)
}

fn assess(command: &str, branch: &str, env: Environment) -> Assessment {
    default_sentinel()
        .evaluate_at(&ctx(command, branch, env), &weekday_noon())
        .adjusted
}

fn analyze_options() -> RunOptions {
    RunOptions {
        mode: Mode::AnalyzeOnly,
        auto_approve: false,
    }
}

macro_rules! level_test {
    ($name:ident, $cmd:expr, $branch:expr, $env:ident, $level:ident $(,)?) => {
        #[test]
        fn $name() {
            let a = assess($cmd, $branch, Environment::$env);
            assert_eq!(a.level, RiskLevel::$level, "command: {} (score {})", $cmd, a.score);
        }
    };
}

// ── SAFE ──

level_test!(safe_ls, "ls -la", "feature/x", Development, Safe);
level_test!(safe_git_status, "git status", "feature/x", Development, Safe);
level_test!(safe_cargo_build, "cargo build --release", "feature/x", Development, Safe);
level_test!(safe_on_main, "git log --oneline", "main", Development, Safe);
level_test!(safe_in_production, "cat README.md", "feature/x", Production, Safe);
level_test!(safe_migrate_status, "npx prisma migrate status", "feature/x", Development, Safe);

// ── WARNING ──

level_test!(
    warning_main_production_migration,
    "npx prisma migrate deploy",
    "main",
    Production,
    Warning,
);
level_test!(warning_drop_on_main, "dropdb scratch", "main", Development, Warning);
level_test!(
    warning_delete_in_production,
    "kubectl delete pod web-1",
    "feature/x",
    Production,
    Warning,
);

// ── CRITICAL ──

level_test!(critical_migrate_reset, "npx prisma migrate reset", "main", Production, Critical);
level_test!(
    critical_migrate_reset_feature,
    "npx prisma migrate reset",
    "feature/x",
    Development,
    Critical,
);
level_test!(critical_deploy_main, "./deploy.sh main", "feature/x", Development, Critical);
level_test!(
    critical_force_push,
    "git push --force origin main",
    "feature/x",
    Development,
    Critical,
);
level_test!(critical_uppercase, "NPX PRISMA MIGRATE RESET", "feature/x", Development, Critical);
level_test!(
    critical_reset_force_main_prod,
    "prisma migrate reset --force",
    "main",
    Production,
    Critical,
);
level_test!(
    critical_uppercase_force,
    "PRISMA MIGRATE RESET --force",
    "feature/x",
    Development,
    Critical,
);

// ── Scores ──

#[test]
fn library_shortcut_uses_default_rules() {
    // Time heuristics can only add, so the rule alone decides the level here.
    let a = cmd_sentinel::assess("npx prisma migrate reset");
    assert_eq!(a.level, RiskLevel::Critical);
    assert_eq!(a.matched_rules[0].pattern, "*migrate reset*");
}

#[test]
fn quiet_command_scores_zero() {
    let a = assess("ls -la", "feature/x", Environment::Development);
    assert_eq!(a.score, 0);
    assert!(a.reasons.is_empty());
    assert!(a.matched_rules.is_empty());
}

#[test]
fn migrate_reset_on_main_in_production_clamps_to_max() {
    let a = assess("npx prisma migrate reset", "main", Environment::Production);
    assert_eq!(a.score, 100);
    assert_eq!(a.matched_rules.len(), 1);
    assert_eq!(a.matched_rules[0].pattern, "*migrate reset*");
    assert_eq!(a.reasons[0], "This looks like wiping the database. Think again?");
    assert!(a.reasons.iter().any(|r| r.contains("main branch")));
    assert!(a.reasons.iter().any(|r| r.contains("production")));
}

#[test]
fn time_heuristics_use_the_injected_clock() {
    let sentinel = default_sentinel();
    let late = sentinel
        .evaluate_at(&ctx("ls", "feature/x", Environment::Development), &at(2024, 5, 15, 23))
        .adjusted;
    assert_eq!(late.score, 15);

    // Saturday.
    let weekend = sentinel
        .evaluate_at(
            &ctx("./deploy.sh staging", "feature/x", Environment::Development),
            &at(2024, 5, 18, 12),
        )
        .adjusted;
    assert_eq!(weekend.score, 20);
    assert_eq!(weekend.level, RiskLevel::Safe);
}

#[test]
fn global_intercept_lifts_safe_to_warning() {
    let mut config = Config::default_config();
    config.settings.global_intercept = true;
    let sentinel = Sentinel::new(&config, PluginPipeline::default());

    let a = sentinel
        .evaluate_at(&ctx("ls", "feature/x", Environment::Development), &weekday_noon())
        .adjusted;
    assert_eq!(a.score, 40);
    assert_eq!(a.level, RiskLevel::Warning);
    assert_eq!(a.reasons.last().map(String::as_str), Some(GLOBAL_INTERCEPT_REASON));

    // Already critical: untouched.
    let a = sentinel
        .evaluate_at(
            &ctx("npx prisma migrate reset", "main", Environment::Production),
            &weekday_noon(),
        )
        .adjusted;
    assert_eq!(a.level, RiskLevel::Critical);
    assert!(!a.reasons.iter().any(|r| r == GLOBAL_INTERCEPT_REASON));
}

#[test]
fn negated_branch_condition() {
    let mut config = Config::default_config();
    config.rules = vec![
        Rule::new("*git push*", RiskLevel::Warning, "pushing off the main branch").with_conditions(
            Conditions {
                branch: Some("!main".into()),
                env: None,
            },
        ),
    ];
    let sentinel = Sentinel::new(&config, PluginPipeline::default());

    let feature = sentinel
        .evaluate_at(
            &ctx("git push origin", "feature/x", Environment::Development),
            &weekday_noon(),
        )
        .adjusted;
    assert_eq!(feature.score, 40);
    assert_eq!(feature.matched_rules.len(), 1);

    let main = sentinel
        .evaluate_at(&ctx("git push origin", "main", Environment::Development), &weekday_noon())
        .adjusted;
    assert!(main.matched_rules.is_empty());
    assert_eq!(main.score, 20);
}

// ── Plugins ──

struct Exploding;

impl Plugin for Exploding {
    fn name(&self) -> &str {
        "exploding"
    }
    fn evaluate(&self, _ctx: &CommandContext, _score: i64) -> Result<i64, PluginError> {
        panic!("plugin bug")
    }
    fn on_event(&self, _event: &TelemetryEvent) -> Result<(), PluginError> {
        panic!("plugin bug")
    }
}

struct Bump(i64);

impl Plugin for Bump {
    fn name(&self) -> &str {
        "bump"
    }
    fn evaluate(&self, _ctx: &CommandContext, score: i64) -> Result<i64, PluginError> {
        Ok(score + self.0)
    }
}

#[test]
fn broken_plugin_does_not_change_the_outcome() {
    let pipeline = PluginPipeline::new(vec![Box::new(Exploding), Box::new(Bump(5))]);
    let sentinel = Sentinel::new(&Config::default_config(), pipeline);
    let c = ctx("ls", "feature/x", Environment::Development);
    let eval = sentinel.evaluate_at(&c, &weekday_noon());
    assert_eq!(eval.base.score, 0);
    assert_eq!(eval.adjusted.score, 5);
}

struct Witness(Arc<Mutex<Vec<(String, bool)>>>);

impl Plugin for Witness {
    fn name(&self) -> &str {
        "witness"
    }
    fn evaluate(&self, _ctx: &CommandContext, score: i64) -> Result<i64, PluginError> {
        Ok(score + 50)
    }
    fn on_event(&self, event: &TelemetryEvent) -> Result<(), PluginError> {
        self.0.lock().unwrap().push((event.command.clone(), event.executed));
        Ok(())
    }
}

#[test]
fn broken_plugin_does_not_stop_decision_or_reporting() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let pipeline = PluginPipeline::new(vec![
        Box::new(Exploding),
        Box::new(Witness(seen.clone())),
    ]);
    let sentinel = Sentinel::new(&Config::default_config(), pipeline)
        .with_telemetry(Some(TelemetryStore::new(dir.path())));

    // 0 + witness (+50) = 50: the exploding plugin is skipped, the next one still runs.
    let c = ctx("ls", "feature/x", Environment::Development);
    let a = sentinel.evaluate_at(&c, &weekday_noon()).adjusted;
    assert_eq!(a.score, 50);
    assert_eq!(a.level, RiskLevel::Warning);

    let mut prompter = ScriptedPrompter::new(["y"]);
    let code = sentinel
        .run_evaluated(&c, &a, analyze_options(), &mut prompter, &mut Vec::new())
        .unwrap();
    assert_eq!(code, 0);
    assert_eq!(prompter.asked(), [PROCEED_QUESTION.to_string()]);

    let events = TelemetryStore::new(dir.path()).load_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].decision, Outcome::Confirmed);
    assert_eq!(*seen.lock().unwrap(), vec![("ls".to_string(), true)]);
}

#[test]
fn plugin_can_cross_a_level_boundary() {
    let pipeline = PluginPipeline::new(vec![Box::new(Bump(25))]);
    let sentinel = Sentinel::new(&Config::default_config(), pipeline);
    // main branch (+20) + plugin (+25) = 45
    let c = ctx("git log", "main", Environment::Development);
    let eval = sentinel.evaluate_at(&c, &weekday_noon());
    assert_eq!(eval.base.level, RiskLevel::Safe);
    assert_eq!(eval.adjusted.score, 45);
    assert_eq!(eval.adjusted.level, RiskLevel::Warning);
}

#[test]
fn builtin_branch_check_plugin_loads_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = PluginRegistry::with_builtins().load(
        &["builtin:custom-branch-check".to_string(), "no-such-plugin".to_string()],
        dir.path(),
    );
    assert_eq!(pipeline.loaded_names(), vec!["custom-branch-check".to_string()]);

    let sentinel = Sentinel::new(&Config::default_config(), pipeline);
    // main (+20) + plugin push-on-main (+15) = 35
    let c = ctx("git push origin", "main", Environment::Development);
    let eval = sentinel.evaluate_at(&c, &weekday_noon());
    assert_eq!(eval.base.score, 20);
    assert_eq!(eval.adjusted.score, 35);
}

// ── Decisions ──

#[test]
fn safe_command_needs_no_prompt() {
    let sentinel = default_sentinel();
    let mut prompter = ScriptedPrompter::default();
    let mut out = Vec::new();
    let code = sentinel
        .run_evaluated(
            &ctx("ls -la", "feature/x", Environment::Development),
            &assess("ls -la", "feature/x", Environment::Development),
            analyze_options(),
            &mut prompter,
            &mut out,
        )
        .unwrap();
    assert_eq!(code, 0);
    assert!(prompter.asked().is_empty());
}

#[test]
fn critical_needs_both_confirmations() {
    let command = "npx prisma migrate reset";
    let c = ctx(command, "main", Environment::Production);
    let a = assess(command, "main", Environment::Production);
    let mut prompter = ScriptedPrompter::new(["y", command]);
    let mut out = Vec::new();

    let decision = DecisionEngine::new(false).decide(&c, &a, &mut prompter, &mut out).unwrap();
    assert_eq!(decision.action, Action::Confirm);
    assert!(decision.executed);
    assert_eq!(prompter.asked().len(), 2);
    assert_eq!(prompter.asked()[0], UNDERSTAND_QUESTION);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("main"));
    assert!(text.contains("production"));
}

#[test]
fn critical_retype_mismatch_blocks() {
    let mut config = Config::default_config();
    config.rules = vec![Rule::new("*rm -rf*", RiskLevel::Critical, "recursive delete")];
    let sentinel = Sentinel::new(&config, PluginPipeline::default());
    let c = ctx("rm -rf /", "feature/x", Environment::Development);
    let a = sentinel.evaluate_at(&c, &weekday_noon()).adjusted;
    assert_eq!(a.level, RiskLevel::Critical);

    let mut prompter = ScriptedPrompter::new(["yes", "rm -rf"]);
    let code = sentinel
        .run_evaluated(&c, &a, analyze_options(), &mut prompter, &mut Vec::new())
        .unwrap();
    assert_eq!(code, 1);

    let mut prompter = ScriptedPrompter::new(["yes", "rm -rf /"]);
    let code = sentinel
        .run_evaluated(&c, &a, analyze_options(), &mut prompter, &mut Vec::new())
        .unwrap();
    assert_eq!(code, 0);
}

#[test]
fn warning_declined_by_default() {
    let c = ctx("kubectl delete pod web-1", "feature/x", Environment::Production);
    let a = assess("kubectl delete pod web-1", "feature/x", Environment::Production);
    assert_eq!(a.level, RiskLevel::Warning);

    // Empty answer takes the default (no).
    let mut prompter = ScriptedPrompter::new([""]);
    let decision = DecisionEngine::new(false)
        .decide(&c, &a, &mut prompter, &mut Vec::new())
        .unwrap();
    assert!(!decision.executed);
    assert_eq!(prompter.asked(), [PROCEED_QUESTION.to_string()]);
}

#[test]
fn auto_approve_skips_every_prompt() {
    let c = ctx("npx prisma migrate reset", "main", Environment::Production);
    let a = assess("npx prisma migrate reset", "main", Environment::Production);
    let mut prompter = ScriptedPrompter::default();
    let decision = DecisionEngine::new(true)
        .decide(&c, &a, &mut prompter, &mut Vec::new())
        .unwrap();
    assert!(decision.executed);
    assert!(prompter.asked().is_empty());
}

// ── Telemetry through the gate ──

#[test]
fn outcomes_are_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let sentinel = default_sentinel().with_telemetry(Some(TelemetryStore::new(dir.path())));

    for (command, answers) in [("ls", vec![]), ("git push --force", vec!["n"])] {
        let c = ctx(command, "feature/x", Environment::Development);
        let a = sentinel.evaluate_at(&c, &weekday_noon()).adjusted;
        let mut prompter = ScriptedPrompter::new(answers);
        sentinel
            .run_evaluated(&c, &a, analyze_options(), &mut prompter, &mut Vec::new())
            .unwrap();
    }

    let store = TelemetryStore::new(dir.path());
    let stats = store.load_stats();
    assert_eq!(stats.total_commands, 2);
    assert_eq!(stats.executed_commands, 1);
    assert_eq!(stats.blocked_commands, 1);
    assert_eq!(store.recent_events(1)[0].command, "git push --force");
}
