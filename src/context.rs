//! Command context: the immutable snapshot a risk assessment runs against.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Command, Stdio};

/// Deployment environment label detected for the current invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    Development,
    #[default]
    Unknown,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Development => "development",
            Environment::Unknown => "unknown",
        }
    }

    /// Classify a free-form label such as the value of `NODE_ENV`.
    ///
    /// Returns `None` when the label carries no recognizable hint.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.to_lowercase();
        if hint.contains("prod") {
            Some(Environment::Production)
        } else if hint.contains("stag") {
            Some(Environment::Staging)
        } else if hint.contains("dev") {
            Some(Environment::Development)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the command under evaluation.
///
/// Built once per invocation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandContext {
    /// The binary being invoked (first word of the command).
    pub binary: String,
    /// Remaining words, in order.
    pub args: Vec<String>,
    /// The full command string as the operator typed it.
    pub full_command: String,
    /// Current VCS branch; `None` outside a git working tree.
    pub current_branch: Option<String>,
    /// Working directory of the invocation.
    pub current_directory: String,
    /// Detected environment label.
    pub environment: Environment,
}

impl CommandContext {
    /// Build a context from command-line words and already-detected surroundings.
    ///
    /// A single argument containing whitespace is treated as a whole command
    /// line and split into words; `full_command` keeps the original text.
    pub fn from_args<S: AsRef<str>>(
        args: &[S],
        current_branch: Option<String>,
        current_directory: impl Into<String>,
        environment: Environment,
    ) -> Self {
        let parts: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
        let full_command = parts.join(" ");

        let words: Vec<String> = match parts.as_slice() {
            [single] if single.contains(char::is_whitespace) => split_words(single),
            _ => parts.iter().map(|p| p.to_string()).collect(),
        };

        let mut words = words.into_iter();
        let binary = words.next().unwrap_or_default();

        Self {
            binary,
            args: words.collect(),
            full_command,
            current_branch,
            current_directory: current_directory.into(),
            environment,
        }
    }

    /// Convenience constructor from a single command string with no branch
    /// and an unknown environment. Mostly useful in tests and for `analyze`.
    pub fn from_command(command: &str) -> Self {
        Self::from_args(&[command], None, ".", Environment::Unknown)
    }

    /// Build a context for `args`, detecting branch, cwd, and environment
    /// from the running process.
    pub fn detect<S: AsRef<str>>(args: &[S]) -> Self {
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| ".".into());
        let branch = current_branch(Path::new(&cwd));
        let environment = detect_environment(
            std::env::var("NODE_ENV").ok().as_deref(),
            std::env::var("ENVIRONMENT").ok().as_deref(),
            &cwd,
        );
        Self::from_args(args, branch, cwd, environment)
    }

    /// Builder-style override of the branch, used by tests and callers that
    /// already know it.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.current_branch = Some(branch.into());
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

/// Split a command line into words, falling back to whitespace splitting
/// when the quoting is unbalanced.
fn split_words(command: &str) -> Vec<String> {
    shlex::split(command)
        .unwrap_or_else(|| command.split_whitespace().map(str::to_string).collect())
}

/// Ask git for the current branch. Any failure (no git, not a repo) is `None`.
pub fn current_branch(dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .current_dir(dir)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if branch.is_empty() { None } else { Some(branch) }
}

/// Detect the environment from `NODE_ENV`, then `ENVIRONMENT`, then the path.
///
/// The first non-empty variable decides; the path is only consulted for
/// production and staging hints.
pub fn detect_environment(
    node_env: Option<&str>,
    environment: Option<&str>,
    cwd: &str,
) -> Environment {
    let declared = node_env
        .filter(|v| !v.is_empty())
        .or(environment.filter(|v| !v.is_empty()))
        .unwrap_or("");

    if let Some(env) = Environment::from_hint(declared) {
        return env;
    }

    match Environment::from_hint(cwd) {
        Some(env @ (Environment::Production | Environment::Staging)) => env,
        _ => Environment::Unknown,
    }
}
