//! Configuration for the pose capture agent.

use crate::writer::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long a capture session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureMode {
    /// Run for a fixed wall-clock duration, then drain and stop.
    FixedDuration(Duration),
    /// Run until externally cancelled (ctrl-c).
    Indefinite,
}

/// Main configuration for a capture session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sampling frequency in Hz
    pub frequency_hz: f64,

    /// Fixed session length in seconds; absent means run until cancelled
    pub duration_secs: Option<u64>,

    /// Samples buffered before a flush; defaults from the frequency
    pub batch_size: Option<usize>,

    /// Output serialization format
    pub format: OutputFormat,

    /// Directory receiving the per-device output files
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pose-capture-agent");

        Self {
            frequency_hz: 10.0,
            duration_secs: None,
            batch_size: None,
            format: OutputFormat::Csv,
            output_dir: data_dir.join("recordings"),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file. A missing file is the
    /// default configuration; an unreadable or corrupt file is an error the
    /// caller should surface rather than swallow.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pose-capture-agent")
            .join("config.json")
    }

    /// Reject configurations the pipeline cannot run with. Called before any
    /// file or device I/O.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.frequency_hz.is_finite() && self.frequency_hz > 0.0) {
            return Err(ConfigError::InvalidFrequency(self.frequency_hz));
        }
        // The implied period must fit in a Duration; a denormal-tiny
        // frequency would overflow it.
        let period_secs = 1.0 / self.frequency_hz;
        if !period_secs.is_finite() || period_secs >= u64::MAX as f64 {
            return Err(ConfigError::InvalidFrequency(self.frequency_hz));
        }
        if self.duration_secs == Some(0) {
            return Err(ConfigError::InvalidDuration);
        }
        if self.batch_size == Some(0) {
            return Err(ConfigError::InvalidBatchSize);
        }
        Ok(())
    }

    /// Parse and set the output-format selector.
    pub fn set_format(&mut self, selector: &str) -> Result<(), ConfigError> {
        self.format = OutputFormat::from_selector(selector)
            .ok_or_else(|| ConfigError::UnsupportedFormat(selector.to_string()))?;
        Ok(())
    }

    /// The tick period implied by the frequency.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frequency_hz)
    }

    pub fn mode(&self) -> CaptureMode {
        match self.duration_secs {
            Some(secs) => CaptureMode::FixedDuration(Duration::from_secs(secs)),
            None => CaptureMode::Indefinite,
        }
    }

    /// Batch size, defaulting to one second's worth of sweeps.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size
            .unwrap_or_else(|| (self.frequency_hz.round() as usize).max(1))
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    InvalidFrequency(f64),
    InvalidDuration,
    InvalidBatchSize,
    UnsupportedFormat(String),
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidFrequency(hz) => {
                write!(f, "sampling frequency must be positive, got {hz}")
            }
            ConfigError::InvalidDuration => write!(f, "fixed duration must be at least 1 second"),
            ConfigError::InvalidBatchSize => write!(f, "batch size must be at least 1"),
            ConfigError::UnsupportedFormat(s) => write!(f, "unsupported output format: {s}"),
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
