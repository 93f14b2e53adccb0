//! Operator prompts used by the decision state machine.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::time::Duration;

/// Source of yes/no and free-text answers.
///
/// An unanswered prompt (EOF, timeout) resolves to the default for
/// `confirm` and to an empty string for `input`; it is never an error.
pub trait Prompter {
    fn confirm(&mut self, question: &str, default: bool) -> io::Result<bool>;
    fn input(&mut self, question: &str) -> io::Result<String>;
}

/// Interpret a yes/no answer. Empty input takes the default.
pub fn parse_yes_no(answer: &str, default: bool) -> bool {
    let answer = answer.trim().to_lowercase();
    match answer.as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}

/// Prompts on stderr and reads answers from stdin.
#[derive(Debug, Default, Clone)]
pub struct TerminalPrompter {
    timeout: Option<Duration>,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every prompt by `timeout`; an expired prompt counts as no answer.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn ask(&self, prompt: &str) -> io::Result<Option<String>> {
        let mut stderr = io::stderr().lock();
        write!(stderr, "{prompt}")?;
        stderr.flush()?;
        drop(stderr);

        match self.timeout {
            None => read_stdin_line(),
            Some(limit) => {
                let (tx, rx) = mpsc::channel();
                std::thread::spawn(move || {
                    let _ = tx.send(read_stdin_line());
                });
                match rx.recv_timeout(limit) {
                    Ok(line) => line,
                    Err(_) => {
                        eprintln!();
                        log::info!("prompt timed out after {}s", limit.as_secs());
                        Ok(None)
                    }
                }
            }
        }
    }
}

/// One line from stdin without its terminator; `None` at EOF.
fn read_stdin_line() -> io::Result<Option<String>> {
    let mut line = String::new();
    let n = io::stdin().lock().read_line(&mut line)?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, question: &str, default: bool) -> io::Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let answer = self.ask(&format!("? {question} {hint} "))?;
        Ok(answer.map_or(default, |a| parse_yes_no(&a, default)))
    }

    fn input(&mut self, question: &str) -> io::Result<String> {
        Ok(self.ask(&format!("? {question}\n> "))?.unwrap_or_default())
    }
}

/// Pre-recorded answers, consumed in order. Records every question asked.
///
/// Useful for non-interactive callers and tests.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Questions asked so far, in order.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str, default: bool) -> io::Result<bool> {
        self.asked.push(question.to_string());
        Ok(self
            .answers
            .pop_front()
            .map_or(default, |a| parse_yes_no(&a, default)))
    }

    fn input(&mut self, question: &str) -> io::Result<String> {
        self.asked.push(question.to_string());
        Ok(self.answers.pop_front().unwrap_or_default())
    }
}
