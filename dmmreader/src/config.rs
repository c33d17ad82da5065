/*!
Configuration management for the meter reader.
*/

use anyhow::{ensure, Context, Result};
use dmm_protocol::protocol::{BAUD_RATE, DEFAULT_RETRIES, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub meter: MeterConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            meter: MeterConfig::default(),
            output: OutputConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse config file as TOML")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Reject values the reader cannot run with
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.meter.port.is_empty(), "meter.port must not be empty");
        let timeout = Duration::try_from_secs_f64(self.meter.timeout_seconds);
        ensure!(
            matches!(timeout, Ok(t) if !t.is_zero()),
            "meter.timeout_seconds must be a positive number of seconds, got {}",
            self.meter.timeout_seconds
        );
        ensure!(
            self.meter.baud_rate == BAUD_RATE,
            "meter.baud_rate must be {} (the meter's fixed line speed), got {}",
            BAUD_RATE,
            self.meter.baud_rate
        );
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Serial link and retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    /// Serial device path
    pub port: String,

    /// Line speed; the meter only talks at 2400 and other values are rejected
    pub baud_rate: u32,

    /// Read attempts per reading
    pub retries: usize,

    /// Read timeout in seconds
    pub timeout_seconds: f64,
}

impl MeterConfig {
    /// Read timeout; only call on a validated config
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: BAUD_RATE,
            retries: DEFAULT_RETRIES,
            timeout_seconds: DEFAULT_TIMEOUT.as_secs_f64(),
        }
    }
}

/// How readings are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Display text and numeric value on separate lines
    Text,
    /// One JSON object per reading
    Json,
}

/// Output specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,

    /// Print the numeric value under the display text
    pub show_numeric: bool,

    /// Prefix each reading with the local time
    pub timestamps: bool,

    /// Stop after this many readings (0 = run until interrupted)
    pub count: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            show_numeric: true,
            timestamps: false,
            count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_roundtrip() {
        let mut original_config = AppConfig::new();
        original_config.meter.port = "/dev/ttyS3".to_string();
        original_config.output.format = OutputFormat::Json;

        let temp_file = NamedTempFile::new().unwrap();
        let temp_path = temp_file.path();

        // Save and load
        original_config.save_to_file(temp_path).unwrap();
        let loaded_config = AppConfig::load_from_file(temp_path).unwrap();

        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn test_default_values() {
        let config = AppConfig::new();

        assert_eq!(config.meter.port, "/dev/ttyUSB0");
        assert_eq!(config.meter.baud_rate, 2400);
        assert_eq!(config.meter.retries, 3);
        assert_eq!(config.meter.timeout(), Duration::from_secs(3));

        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.output.show_numeric);
        assert!(!config.output.timestamps);
        assert_eq!(config.output.count, 0);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str("[meter]\nport = \"COM4\"\n").unwrap();
        assert_eq!(config.meter.port, "COM4");
        assert_eq!(config.meter.retries, 3);
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_rejects_bad_timeout() {
        let mut config = AppConfig::new();
        config.meter.timeout_seconds = 0.0;
        assert!(config.validate().is_err());

        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "[meter]\ntimeout_seconds = -1.0\n").unwrap();
        assert!(AppConfig::load_from_file(temp_file.path()).is_err());

        // Finite but too large for a Duration
        config.meter.timeout_seconds = 1e20;
        assert!(config.validate().is_err());
        std::fs::write(temp_file.path(), "[meter]\ntimeout_seconds = 1e20\n").unwrap();
        assert!(AppConfig::load_from_file(temp_file.path()).is_err());

        config.meter.timeout_seconds = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_other_baud_rates() {
        let mut config = AppConfig::new();
        config.meter.baud_rate = 9600;
        assert!(config.validate().is_err());

        config.meter.baud_rate = BAUD_RATE;
        assert!(config.validate().is_ok());
    }
}
