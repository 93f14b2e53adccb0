//! External plugins: an executable invoked once per hook.
//!
//! The request is a single JSON object on stdin:
//!
//! ```text
//! {"hook":"evaluate","context":{...},"score":42}
//! {"hook":"event","event":{...}}
//! ```
//!
//! For `evaluate` the plugin prints `{"score": N}` (or a bare integer).
//! Output of `event` is ignored. A non-zero exit status is an error, and so
//! is running past the call timeout (the child is killed).

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use crate::context::CommandContext;
use crate::plugins::{Plugin, PluginError};
use crate::telemetry::TelemetryEvent;

/// Per-call limit unless overridden with [`ExternalPlugin::with_timeout`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
#[serde(tag = "hook", rename_all = "lowercase")]
enum Request<'a> {
    Evaluate {
        context: &'a CommandContext,
        score: i64,
    },
    Event {
        event: &'a TelemetryEvent,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EvaluateResponse {
    Object { score: i64 },
    Bare(i64),
}

pub struct ExternalPlugin {
    name: String,
    program: PathBuf,
    timeout: Duration,
}

impl ExternalPlugin {
    /// Wrap an executable. The plugin is named after the file stem.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        Self {
            name,
            program,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound each call; a plugin still running after `timeout` is killed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Spawn the program, feed it `request`, and return its stdout.
    ///
    /// The child is always reaped, whether the call succeeds, fails to
    /// write the request, or runs past the deadline.
    fn call(&self, request: &Request<'_>) -> Result<String, PluginError> {
        let payload =
            serde_json::to_vec(request).map_err(|e| PluginError::Protocol(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let Some(mut stdout) = child.stdout.take() else {
            reap(&mut child);
            return Err(PluginError::Protocol("stdout not captured".into()));
        };
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = tx.send(stdout.read_to_end(&mut buf).map(|_| buf));
        });

        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(&payload)
        {
            reap(&mut child);
            return Err(e.into());
        }

        let output = match rx.recv_timeout(self.timeout) {
            Ok(output) => output,
            Err(_) => {
                reap(&mut child);
                return Err(PluginError::Failed(format!(
                    "{} timed out after {}ms",
                    self.program.display(),
                    self.timeout.as_millis()
                )));
            }
        };

        let status = child.wait()?;
        let stdout = output?;
        if !status.success() {
            return Err(PluginError::Failed(format!(
                "{} exited with {status}",
                self.program.display()
            )));
        }
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

/// Kill and wait; errors mean the child is already gone.
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

impl Plugin for ExternalPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, ctx: &CommandContext, score: i64) -> Result<i64, PluginError> {
        let stdout = self.call(&Request::Evaluate {
            context: ctx,
            score,
        })?;
        parse_score(&stdout)
    }

    fn on_event(&self, event: &TelemetryEvent) -> Result<(), PluginError> {
        self.call(&Request::Event { event }).map(|_| ())
    }
}

fn parse_score(stdout: &str) -> Result<i64, PluginError> {
    let trimmed = stdout.trim();
    match serde_json::from_str::<EvaluateResponse>(trimmed) {
        Ok(EvaluateResponse::Object { score } | EvaluateResponse::Bare(score)) => Ok(score),
        Err(e) => Err(PluginError::Protocol(format!(
            "expected {{\"score\": N}}, got {trimmed:?}: {e}"
        ))),
    }
}
