//! Settings file for regression gating
//!
//! An optional TOML file carries the defaults a project wants for every CI
//! run; command-line flags still override it.
//!
//! # Example benchtrack.toml
//!
//! ```toml
//! [evaluation]
//! threshold = 1.05          # or "105%"
//! hard_threshold = "120%"
//! min_baseline = 3
//! window = 10
//! direction = "higher-is-better"
//! removed_is_warning = true
//!
//! [exit_codes]
//! pass = 0
//! warn = 0
//! fail = 1
//!
//! [output]
//! sinks = ["text", "markdown:benchmark-alert.md"]
//! ```

use crate::emitter::{ExitPolicy, Sink};
use crate::regression::{parse_threshold, ConfigError, Direction, RegressionConfig};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// A threshold written either as a number or as text (`"105%"`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ThresholdSetting {
    Ratio(f64),
    Text(String),
}

impl ThresholdSetting {
    pub fn ratio(&self) -> std::result::Result<f64, ConfigError> {
        match self {
            Self::Ratio(ratio) => Ok(*ratio),
            Self::Text(text) => parse_threshold(text),
        }
    }
}

/// `[evaluation]` section; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationSettings {
    pub threshold: Option<ThresholdSetting>,
    pub hard_threshold: Option<ThresholdSetting>,
    pub min_baseline: Option<usize>,
    pub window: Option<usize>,
    pub direction: Option<Direction>,
    pub removed_is_warning: Option<bool>,
}

/// `[output]` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSettings {
    #[serde(default)]
    pub sinks: Vec<Sink>,
}

/// Root of a settings file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub evaluation: EvaluationSettings,
    #[serde(default)]
    pub exit_codes: Option<ExitPolicy>,
    #[serde(default)]
    pub output: OutputSettings,
}

impl Settings {
    /// Load settings from a TOML file
    ///
    /// ```no_run
    /// use benchtrack::settings::Settings;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let settings = Settings::from_file("benchtrack.toml")?;
    /// let config = settings.regression_config()?;
    /// println!("warn above {:.0}%", config.alert_threshold() * 100.0);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("invalid settings file {}", path.display()))
    }

    /// Parse settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse TOML")
    }

    /// Regression configuration: file values over the built-in defaults
    ///
    /// Not validated here; callers validate after applying CLI overrides.
    pub fn regression_config(&self) -> std::result::Result<RegressionConfig, ConfigError> {
        let file = &self.evaluation;
        let mut config = RegressionConfig::default();

        if let Some(threshold) = &file.threshold {
            config.threshold = threshold.ratio()?;
        }
        if let Some(hard) = &file.hard_threshold {
            config.hard_threshold = hard.ratio()?;
        }
        if let Some(min_baseline) = file.min_baseline {
            config.min_baseline_size = min_baseline;
        }
        if let Some(window) = file.window {
            config.window_size = window;
        }
        if file.direction.is_some() {
            config.direction = file.direction;
        }
        if let Some(removed) = file.removed_is_warning {
            config.removed_is_warning = removed;
        }
        Ok(config)
    }

    /// Exit policy from `[exit_codes]`, or the default policy
    pub fn exit_policy(&self) -> ExitPolicy {
        self.exit_codes.unwrap_or_default()
    }
}
