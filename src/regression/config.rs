// Configuration for benchmark regression detection
//
// Thresholds are ratios against the baseline center: 1.05 means "flag when
// the new value is 5% worse". The soft threshold raises a warning, the hard
// threshold fails the build.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Invalid regression configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid threshold '{0}': expected a ratio such as 1.05 or a percentage such as 105%")]
    UnparseableThreshold(String),

    #[error("{name} must be >= 1.0 (a ratio, 1.05 = 5% worse), got {value}")]
    ThresholdBelowOne { name: &'static str, value: f64 },

    #[error("hard threshold {hard} must not be below the alert threshold {soft}")]
    HardBelowSoft { soft: f64, hard: f64 },

    #[error("{name} must be >= 1, got {value}")]
    ZeroSize { name: &'static str, value: usize },
}

/// Which way is "better" for a benchmark's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Throughput-style metrics (iter/sec, ops/sec)
    HigherIsBetter,
    /// Latency-style metrics (ns/iter, ms)
    LowerIsBetter,
}

impl Direction {
    /// Direction implied by the harness that produced an entry
    ///
    /// Time-per-iteration harnesses are lower-is-better; everything else
    /// (pytest's ops, custom "bigger is better" data, unknown tools)
    /// defaults to higher-is-better.
    pub fn for_tool(tool: &str) -> Self {
        match tool {
            "cargo" | "go" | "googlecpp" | "customSmallerIsBetter" => Self::LowerIsBetter,
            _ => Self::HigherIsBetter,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::HigherIsBetter => "higher-is-better",
            Self::LowerIsBetter => "lower-is-better",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "higher-is-better" | "higher" | "bigger" => Ok(Self::HigherIsBetter),
            "lower-is-better" | "lower" | "smaller" => Ok(Self::LowerIsBetter),
            other => Err(format!(
                "unknown direction '{other}' (expected higher-is-better or lower-is-better)"
            )),
        }
    }
}

/// Parse a threshold given as a ratio (`1.05`) or a percentage (`105%`)
///
/// # Example
/// ```
/// use benchtrack::regression::parse_threshold;
///
/// assert_eq!(parse_threshold("1.05").unwrap(), 1.05);
/// assert_eq!(parse_threshold("200%").unwrap(), 2.0);
/// assert!(parse_threshold("fast").is_err());
/// ```
pub fn parse_threshold(text: &str) -> Result<f64, ConfigError> {
    let trimmed = text.trim();
    let parsed = match trimmed.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f64>().map(|p| p / 100.0),
        None => trimmed.parse::<f64>(),
    };
    match parsed {
        Ok(ratio) if ratio.is_finite() => Ok(ratio),
        _ => Err(ConfigError::UnparseableThreshold(text.to_string())),
    }
}

/// Inputs to a single comparator run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparatorConfig {
    /// Fractional change considered worth flagging (0.05 = 5%)
    pub alert_threshold: f64,
    pub direction: Direction,
    /// Fewer baseline samples than this yields `InsufficientData`
    pub min_baseline_size: usize,
}

/// Configuration for suite-level regression evaluation
///
/// # Example
/// ```
/// use benchtrack::regression::RegressionConfig;
///
/// let config = RegressionConfig::default();
/// assert_eq!(config.threshold, 1.05); // 5% soft regression
/// assert_eq!(config.hard_threshold, 1.10); // 10% fails the build
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionConfig {
    /// Soft threshold ratio; a regression beyond it is a warning
    pub threshold: f64,

    /// Hard threshold ratio; a regression beyond it fails the suite
    pub hard_threshold: f64,

    /// Minimum number of baseline samples before any verdict is given
    ///
    /// The very first runs of a benchmark have no meaningful baseline and
    /// report `InsufficientData` instead of a guess.
    pub min_baseline_size: usize,

    /// Number of preceding entries forming the baseline window
    pub window_size: usize,

    /// Fixed direction; `None` infers it from each entry's tool
    pub direction: Option<Direction>,

    /// Whether benchmarks that vanished from the newest entry warn
    pub removed_is_warning: bool,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            threshold: 1.05,
            hard_threshold: 1.10,
            min_baseline_size: 3,
            window_size: 10,
            direction: None,
            removed_is_warning: false,
        }
    }
}

impl RegressionConfig {
    /// Fewer false alarms: only large regressions warn or fail
    pub fn strict() -> Self {
        Self {
            threshold: 1.10,
            hard_threshold: 1.25,
            min_baseline_size: 5,
            window_size: 20,
            ..Self::default()
        }
    }

    /// Flag small drifts early, from a short history
    pub fn permissive() -> Self {
        Self {
            threshold: 1.02,
            hard_threshold: 1.05,
            min_baseline_size: 1,
            window_size: 5,
            ..Self::default()
        }
    }

    /// Soft threshold as a fraction (1.05 -> 0.05)
    pub fn alert_threshold(&self) -> f64 {
        self.threshold - 1.0
    }

    /// Hard threshold as a fraction (1.10 -> 0.10)
    pub fn hard_alert_threshold(&self) -> f64 {
        self.hard_threshold - 1.0
    }

    /// Direction for an entry produced by `tool`
    pub fn direction_for(&self, tool: &str) -> Direction {
        self.direction.unwrap_or_else(|| Direction::for_tool(tool))
    }

    /// Comparator settings for an entry produced by `tool`
    pub fn comparator_for(&self, tool: &str) -> ComparatorConfig {
        ComparatorConfig {
            alert_threshold: self.alert_threshold(),
            direction: self.direction_for(tool),
            min_baseline_size: self.min_baseline_size,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("threshold", self.threshold),
            ("hard threshold", self.hard_threshold),
        ] {
            if value.is_nan() || value < 1.0 {
                return Err(ConfigError::ThresholdBelowOne { name, value });
            }
        }

        if self.hard_threshold < self.threshold {
            return Err(ConfigError::HardBelowSoft {
                soft: self.threshold,
                hard: self.hard_threshold,
            });
        }

        for (name, value) in [
            ("min baseline", self.min_baseline_size),
            ("window", self.window_size),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroSize { name, value });
            }
        }

        Ok(())
    }
}
