use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};
use std::path::PathBuf;

/// Environment variable overriding the configured log level.
pub const LOG_ENV_VAR: &str = "SENTINEL_LOG";

const LOG_FILE: &str = "sentinel.log";

/// `~/.local/share/sentinel`, where the log and telemetry live.
pub fn data_dir() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(std::path::Path::new(&home).join(".local/share/sentinel"))
}

/// Parse a level name (case-insensitive, `warning` accepted for `warn`);
/// unknown names fall back to `info`.
pub fn parse_level(name: &str) -> LevelFilter {
    let name = name.trim();
    if name.eq_ignore_ascii_case("warning") {
        return LevelFilter::Warn;
    }
    name.parse().unwrap_or(LevelFilter::Info)
}

/// Install the file logger at ~/.local/share/sentinel/sentinel.log.
/// Best-effort: failures leave logging disabled (logging must never block the gate).
pub fn init(configured_level: &str) {
    let level = std::env::var(LOG_ENV_VAR)
        .ok()
        .filter(|v| !v.is_empty())
        .map(|v| parse_level(&v))
        .unwrap_or_else(|| parse_level(configured_level));

    let Some(dir) = data_dir() else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))
    else {
        return;
    };

    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .build();
    let _ = WriteLogger::init(level, config, file);
}
