use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::plugins::registry::expand_path;
use crate::risk::{Rule, RiskLevel};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Files probed, in order, relative to the working directory.
const LOCAL_CONFIG_PATHS: &[&str] = &["sentinel.toml", ".sentinel.toml", "config/sentinel.toml"];

/// User-level config, relative to `$HOME`.
const USER_CONFIG_PATH: &str = ".config/sentinel/config.toml";

// ── Final (merged) config types ──

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Plugin locations, in load order.
    #[serde(default)]
    pub plugins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Lift every otherwise-safe command to warning.
    #[serde(default, alias = "globalIntercept")]
    pub global_intercept: bool,
    #[serde(default = "default_true", alias = "telemetryEnabled")]
    pub telemetry_enabled: bool,
    /// Advisory only.
    #[serde(default, alias = "strictMode")]
    pub strict_mode: bool,
    #[serde(default = "default_log_level", alias = "logLevel")]
    pub log_level: String,
    /// Per-prompt input timeout; 0 waits forever.
    #[serde(default, alias = "promptTimeoutSecs")]
    pub prompt_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            global_intercept: false,
            telemetry_enabled: true,
            strict_mode: false,
            log_level: default_log_level(),
            prompt_timeout_secs: 0,
        }
    }
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    rules: Option<Vec<Rule>>,
    plugins: Option<Vec<String>>,
    // Flat flags, accepted next to `rules`; `[settings]` wins when both are set.
    #[serde(alias = "globalIntercept")]
    global_intercept: Option<bool>,
    #[serde(alias = "telemetryEnabled")]
    telemetry_enabled: Option<bool>,
    #[serde(alias = "strictMode")]
    strict_mode: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    #[serde(alias = "globalIntercept")]
    global_intercept: Option<bool>,
    #[serde(alias = "telemetryEnabled")]
    telemetry_enabled: Option<bool>,
    #[serde(alias = "strictMode")]
    strict_mode: Option<bool>,
    #[serde(alias = "logLevel")]
    log_level: Option<String>,
    #[serde(alias = "promptTimeoutSecs")]
    prompt_timeout_secs: Option<u64>,
}

/// Rules used when even the embedded config cannot be parsed.
fn builtin_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "*migrate reset*",
            RiskLevel::Critical,
            "This looks like wiping the database. Think again?",
        ),
        Rule::new("*deploy*main*", RiskLevel::Critical, "Deploying main without review?"),
        Rule::new(
            "*--force*",
            RiskLevel::Warning,
            "--force flag detected. Be careful what you wish for.",
        ),
    ]
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        match toml::from_str(DEFAULT_CONFIG) {
            Ok(config) => config,
            Err(e) => {
                log::error!("embedded default config failed to parse: {e}");
                Self {
                    settings: Settings::default(),
                    rules: builtin_rules(),
                    plugins: Vec::new(),
                }
            }
        }
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Overlay `explicit` if given, otherwise the first file found among
    ///    `./sentinel.toml`, `./.sentinel.toml`, `./config/sentinel.toml`,
    ///    `~/.config/sentinel/config.toml`
    ///
    /// A missing or broken file is never fatal: the defaults are used.
    pub fn load(explicit: Option<&str>, cwd: &Path) -> Self {
        let mut config = Self::default_config();

        let path = match explicit {
            Some(raw) => match expand_path(raw, cwd) {
                Ok(p) => Some(p),
                Err(e) => {
                    report(&format!("cannot expand config path {raw:?}: {e}"));
                    None
                }
            },
            None => Self::discover(cwd),
        };

        let Some(path) = path else {
            log::info!("no config file found, using default rules");
            return config;
        };

        match Self::load_overlay(&path) {
            Ok(overlay) => {
                log::info!("configuration loaded from {}", path.display());
                config.apply_overlay(overlay);
            }
            Err(e) => report(&format!("config {}: {e}; using defaults", path.display())),
        }

        if config.settings.strict_mode {
            log::info!("strict_mode is set (advisory)");
        }
        config
    }

    /// First existing config file among the probed locations.
    pub fn discover(cwd: &Path) -> Option<PathBuf> {
        let local = LOCAL_CONFIG_PATHS.iter().map(|p| cwd.join(p));
        let user = std::env::var_os("HOME").map(|home| Path::new(&home).join(USER_CONFIG_PATH));
        local.chain(user).find(|p| p.is_file())
    }

    fn load_overlay(path: &Path) -> Result<ConfigOverlay, String> {
        let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        toml::from_str(&content).map_err(|e| e.to_string())
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        // Settings: scalar overrides
        let s = overlay.settings;
        if let Some(v) = s.global_intercept.or(overlay.global_intercept) {
            self.settings.global_intercept = v;
        }
        if let Some(v) = s.telemetry_enabled.or(overlay.telemetry_enabled) {
            self.settings.telemetry_enabled = v;
        }
        if let Some(v) = s.strict_mode.or(overlay.strict_mode) {
            self.settings.strict_mode = v;
        }
        if let Some(v) = s.log_level {
            self.settings.log_level = v;
        }
        if let Some(v) = s.prompt_timeout_secs {
            self.settings.prompt_timeout_secs = v;
        }

        // Rules: a non-empty list replaces the defaults
        match overlay.rules {
            Some(rules) if !rules.is_empty() => self.rules = rules,
            Some(_) => log::warn!("config has an empty rule list, keeping default rules"),
            None => {}
        }

        if let Some(plugins) = overlay.plugins {
            self.plugins = plugins;
        }
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}

/// Config problems go to the log and, briefly, to the operator.
fn report(message: &str) {
    log::error!("{message}");
    eprintln!("sentinel: {message}");
}
