//! Glob-style rule patterns compiled into case-insensitive substring searches.

use regex::{Regex, RegexBuilder};

/// A compiled rule pattern.
///
/// `*` matches any run of characters, `?` exactly one; everything else is
/// literal. The search is unanchored, so `migrate reset` matches anywhere in
/// the command.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Option<Regex>,
}

impl GlobPattern {
    /// Compile a pattern. Never fails: a pattern the regex engine rejects
    /// is kept but never matches.
    pub fn new(pattern: &str) -> Self {
        let translated = translate(pattern);
        let regex = match RegexBuilder::new(&translated).case_insensitive(true).build() {
            Ok(re) => Some(re),
            Err(e) => {
                log::warn!("rule pattern {pattern:?} is unusable and will never match: {e}");
                None
            }
        };
        Self {
            source: pattern.to_string(),
            regex,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, command: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(command))
    }
}

/// Translate glob syntax into regex syntax, escaping every literal.
fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            }
        }
    }
    out
}

/// One-shot helper: does `pattern` match anywhere in `command`?
pub fn matches(pattern: &str, command: &str) -> bool {
    GlobPattern::new(pattern).is_match(command)
}
