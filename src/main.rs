//! sentinel: scores a shell command before it runs and allows, confirms, or
//! blocks it.
//!
//! ```text
//! sentinel exec <command...>     assess, decide, run
//! sentinel analyze <command...>  assess, decide, exit 0 (would run) or 1
//! sentinel stats                 show history and counters
//! sentinel <command...>          same as exec
//! ```

use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use cmd_sentinel::config::Config;
use cmd_sentinel::decision::TerminalPrompter;
use cmd_sentinel::telemetry::{TelemetryStore, stats};
use cmd_sentinel::{CommandContext, Mode, RunOptions, Sentinel, logging};

#[derive(Debug, Parser)]
#[command(
    name = "sentinel",
    version,
    about = "Risk gate between you and your shell",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Skip confirmation for warning AND critical commands (dangerous).
    #[arg(short = 'y', long = "yes", global = true)]
    yes: bool,

    /// Path to a config file (defaults to discovery).
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Cmd>,

    /// Command to run when no subcommand is given.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Run a command through the risk gate.
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Assess a command without running it; exit 0 if it would run.
    Analyze {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Show statistics and recent commands.
    Stats,
}

fn main() {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let code = match &cli.command {
        Some(Cmd::Stats) => show_stats(),
        Some(Cmd::Exec { command }) => gate(command, Mode::Execute, &cli, &cwd),
        Some(Cmd::Analyze { command }) => gate(command, Mode::AnalyzeOnly, &cli, &cwd),
        None if cli.args.is_empty() => {
            let _ = Cli::command().print_help();
            0
        }
        None => gate(&cli.args, Mode::Execute, &cli, &cwd),
    };

    std::process::exit(code);
}

fn gate(command: &[String], mode: Mode, cli: &Cli, cwd: &Path) -> i32 {
    let config = Config::load(cli.config.as_deref(), cwd);
    logging::init(&config.settings.log_level);

    let sentinel = Sentinel::from_config(&config, cwd);
    let ctx = CommandContext::detect(command);
    log::info!("command received: {:?}", ctx.full_command);

    let timeout = match config.settings.prompt_timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let mut prompter = TerminalPrompter::with_timeout(timeout);
    let options = RunOptions {
        mode,
        auto_approve: cli.yes,
    };

    match sentinel.run(&ctx, options, &mut prompter, &mut std::io::stderr()) {
        Ok(code) => code,
        Err(e) => {
            log::error!("unexpected error: {e}");
            eprintln!("sentinel: unexpected error: {e}");
            1
        }
    }
}

fn show_stats() -> i32 {
    let Some(store) = TelemetryStore::open_default() else {
        eprintln!("sentinel: HOME is not set, no statistics available");
        return 1;
    };
    let report = stats::render(&store.load_stats(), &store.recent_events(5));
    print!("{report}");
    0
}
