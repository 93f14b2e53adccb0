use serde::{Deserialize, Serialize};

/// Lowest score classified as [`RiskLevel::Warning`].
pub const WARNING_THRESHOLD: u8 = 40;
/// Lowest score classified as [`RiskLevel::Critical`].
pub const CRITICAL_THRESHOLD: u8 = 70;
/// Upper bound of every final score.
pub const MAX_SCORE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Warning,
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Warning => "warning",
            RiskLevel::Critical => "critical",
        }
    }

    /// Score contributed by a matched rule of this level.
    pub fn base_score(self) -> i64 {
        match self {
            RiskLevel::Safe => 0,
            RiskLevel::Warning => 40,
            RiskLevel::Critical => 80,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp a raw score into `0..=100`.
pub fn clamp_score(raw: i64) -> u8 {
    raw.clamp(0, i64::from(MAX_SCORE)) as u8
}

/// Map a clamped score to its level.
pub fn classify(score: u8) -> RiskLevel {
    if score >= CRITICAL_THRESHOLD {
        RiskLevel::Critical
    } else if score >= WARNING_THRESHOLD {
        RiskLevel::Warning
    } else {
        RiskLevel::Safe
    }
}
