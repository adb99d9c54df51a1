//! Run Configuration - per-run analysis parameters as operator-tunable TOML values
//!
//! Each section implements `Default` with the values the telescope array has
//! historically been analysed with, so a run without a config file behaves
//! exactly like the stock analysis.

use crate::types::{ChannelId, ClockScale};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable pointing at a TOML config file.
pub const CONFIG_ENV_VAR: &str = "COSMIC_TIMELINE_CONFIG";

/// Config file looked up in the working directory when the env var is unset.
pub const LOCAL_CONFIG_FILE: &str = "timeline.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one analysis run.
///
/// Load with `RunConfig::load()` which searches:
/// 1. `$COSMIC_TIMELINE_CONFIG` env var
/// 2. `./timeline.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Channel count, window bound and clock hardware
    #[serde(default)]
    pub run: RunSection,

    /// Detector dead time per hardware revision
    #[serde(default)]
    pub dead_time: DeadTimeConfig,

    /// Per-channel offsets and perimeter selection
    #[serde(default)]
    pub channels: ChannelConfig,

    /// Light curve and interval histogram parameters
    #[serde(default)]
    pub light_curve: LightCurveConfig,
}

impl RunConfig {
    /// Load configuration using the standard search order:
    /// 1. `$COSMIC_TIMELINE_CONFIG` environment variable
    /// 2. `./timeline.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), channels = config.run.channel_count, "Loaded run config from {CONFIG_ENV_VAR}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV_VAR}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(channels = config.run.channel_count, "Loaded run config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys only produce warnings; impossible values are rejected.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in &super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Clock scale in effect, honouring `run.scale_override`.
    pub fn scale(&self) -> ClockScale {
        match self.run.scale_override {
            Some(ticks) => ClockScale::Custom(ticks),
            None => self.run.clock.scale(),
        }
    }

    /// Dead time of the configured hardware revision, in seconds.
    pub fn dead_time_secs(&self) -> f64 {
        match self.run.clock {
            ClockKind::Lm555 => self.dead_time.lm555_secs,
            ClockKind::Crystal => self.dead_time.crystal_secs,
        }
    }

    /// Offset (seconds) added to every event of `channel`; 0 when unset.
    pub fn offset_for(&self, channel: ChannelId) -> f64 {
        self.channels
            .offsets_secs
            .get(usize::from(channel))
            .copied()
            .unwrap_or(0.0)
    }

    /// Validate every section for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.run.channel_count == 0 {
            errors.push("run.channel_count must be >= 1".to_string());
        }
        if let Some(ticks) = self.run.scale_override {
            if !ticks.is_finite() || ticks <= 0.0 {
                errors.push(format!("run.scale_override must be a positive finite number, got {ticks}"));
            }
        }

        for (name, value) in [
            ("dead_time.lm555_secs", self.dead_time.lm555_secs),
            ("dead_time.crystal_secs", self.dead_time.crystal_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{name} must be a non-negative finite number, got {value}"));
            }
        }

        let count = usize::from(self.run.channel_count);
        if self.channels.offsets_secs.len() > count {
            errors.push(format!(
                "channels.offsets_secs has {} entries but run.channel_count is {}",
                self.channels.offsets_secs.len(),
                count
            ));
        }
        if self.channels.offsets_secs.iter().any(|o| !o.is_finite()) {
            errors.push("channels.offsets_secs must contain only finite numbers".to_string());
        }
        for &p in &self.channels.perimeter {
            if p >= self.run.channel_count {
                errors.push(format!(
                    "channels.perimeter entry {p} is not a valid channel (channel_count = {count})"
                ));
            }
        }

        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error ({}): {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// [run]
// ============================================================================

/// Counting-board hardware revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockKind {
    /// BS2 board, LM555 timer
    #[default]
    Lm555,
    /// Arduino board, crystal oscillator
    Crystal,
}

impl ClockKind {
    pub const fn scale(self) -> ClockScale {
        match self {
            Self::Lm555 => ClockScale::Lm555,
            Self::Crystal => ClockScale::Crystal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    /// Number of telescope channels in the run
    #[serde(default = "default_channel_count")]
    pub channel_count: u16,

    /// Largest coincidence window step searched (tolerance = steps / scale)
    #[serde(default = "default_max_window_steps")]
    pub max_window_steps: u32,

    /// Hardware revision that recorded the data
    #[serde(default)]
    pub clock: ClockKind,

    /// Explicit ticks-per-second, replacing the hardware default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_override: Option<f64>,
}

fn default_channel_count() -> u16 { 2 }
fn default_max_window_steps() -> u32 { 3 }

impl Default for RunSection {
    fn default() -> Self {
        Self {
            channel_count: default_channel_count(),
            max_window_steps: default_max_window_steps(),
            clock: ClockKind::default(),
            scale_override: None,
        }
    }
}

// ============================================================================
// [dead_time]
// ============================================================================

/// Measured detector dead time per hardware revision (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadTimeConfig {
    #[serde(default = "default_lm555_dead_time")]
    pub lm555_secs: f64,

    #[serde(default = "default_crystal_dead_time")]
    pub crystal_secs: f64,
}

fn default_lm555_dead_time() -> f64 { 0.275 }
fn default_crystal_dead_time() -> f64 { 0.001 }

impl Default for DeadTimeConfig {
    fn default() -> Self {
        Self {
            lm555_secs: default_lm555_dead_time(),
            crystal_secs: default_crystal_dead_time(),
        }
    }
}

// ============================================================================
// [channels]
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Seconds added to every event of channel `i` (for unsynchronised clocks)
    #[serde(default)]
    pub offsets_secs: Vec<f64>,

    /// Channels on the array perimeter; coincidences touching any of them are
    /// dropped by the anti-coincidence filter
    #[serde(default)]
    pub perimeter: Vec<ChannelId>,
}

// ============================================================================
// [light_curve]
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightCurveConfig {
    /// Width of one light-curve bin (seconds)
    #[serde(default = "default_bin_duration")]
    pub bin_duration_secs: f64,

    /// Largest dead-time-adjusted interval kept in the interval histogram
    #[serde(default = "default_max_interval")]
    pub max_interval_secs: f64,
}

fn default_bin_duration() -> f64 { 60.0 }
fn default_max_interval() -> f64 { 1.0 }

impl Default for LightCurveConfig {
    fn default() -> Self {
        Self {
            bin_duration_secs: default_bin_duration(),
            max_interval_secs: default_max_interval(),
        }
    }
}
