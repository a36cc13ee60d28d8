//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! proximity-config.toml file. It centralises GPIO pin assignment, activity
//! cadences, the threshold scaling and the I2C addresses probed at startup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Default config file, looked up in the working directory
pub const CONFIG_FILE: &str = "proximity-config.toml";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("threshold_scale must be a positive finite number, got {0}")]
    Scale(f32),
}

/// Application configuration loaded from proximity-config.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// BCM GPIO numbers
    pub pins: PinConfig,
    /// Activity cadences and sensor timeouts
    pub timing: TimingConfig,
    /// Threshold derivation
    pub alarm: AlarmConfig,
    /// Rolling window settings
    pub history: HistoryConfig,
    /// I2C addresses probed during provisioning
    pub i2c: I2cConfig,
    /// Display outputs
    pub display: DisplayConfig,
}

/// GPIO pin assignment (BCM numbering)
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PinConfig {
    pub trigger: u8,
    pub echo: u8,
    pub buzzer: u8,
    pub button: u8,
    /// Button wired to ground with the internal pull-up enabled
    pub button_active_low: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub ranging_interval_ms: u64,
    pub analog_interval_ms: u64,
    pub button_interval_ms: u64,
    pub display_interval_ms: u64,
    /// Upper bound on each echo edge wait
    pub echo_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AlarmConfig {
    /// threshold_cm = raw ADC reading * threshold_scale
    pub threshold_scale: f32,
    /// ADC channel the potentiometer is wired to
    pub adc_channel: u8,
}

impl AlarmConfig {
    /// Convert a raw potentiometer reading into a threshold in cm
    pub fn threshold_cm(&self, raw: u16) -> f32 {
        raw as f32 * self.threshold_scale
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct I2cConfig {
    /// PCF8591 then ADS7830
    pub adc_addresses: Vec<u16>,
    /// PCF8574 then PCF8574A
    pub lcd_addresses: Vec<u16>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Draw the distance/threshold plot in the terminal
    pub plot: bool,
    /// Rows used by the terminal plot
    pub plot_rows: usize,
}

impl Default for PinConfig {
    fn default() -> Self {
        PinConfig {
            trigger: 23,
            echo: 24,
            buzzer: 17,
            button: 25,
            button_active_low: true,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            ranging_interval_ms: 200,
            analog_interval_ms: 100,
            button_interval_ms: 100,
            display_interval_ms: 200,
            echo_timeout_ms: 30, // ~5 m round trip, beyond HC-SR04 range
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        AlarmConfig {
            threshold_scale: 0.5,
            adc_channel: 0,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            capacity: crate::history::DEFAULT_CAPACITY,
        }
    }
}

impl Default for I2cConfig {
    fn default() -> Self {
        I2cConfig {
            adc_addresses: vec![0x48, 0x4B],
            lcd_addresses: vec![0x27, 0x3F],
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            plot: true,
            plot_rows: 12,
        }
    }
}

impl TimingConfig {
    pub fn ranging_interval(&self) -> Duration {
        Duration::from_millis(self.ranging_interval_ms)
    }

    pub fn analog_interval(&self) -> Duration {
        Duration::from_millis(self.analog_interval_ms)
    }

    pub fn button_interval(&self) -> Duration {
        Duration::from_millis(self.button_interval_ms)
    }

    pub fn display_interval(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms)
    }

    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!("invalid config file format: {}", e);
                    warn!("using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save current configuration to the given path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }

    /// Reject settings the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        for (name, value) in [
            ("ranging_interval_ms", t.ranging_interval_ms),
            ("analog_interval_ms", t.analog_interval_ms),
            ("button_interval_ms", t.button_interval_ms),
            ("display_interval_ms", t.display_interval_ms),
            ("echo_timeout_ms", t.echo_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        if self.history.capacity == 0 {
            return Err(ConfigError::Zero("history.capacity"));
        }
        let scale = self.alarm.threshold_scale;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ConfigError::Scale(scale));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pins.trigger, 23);
        assert_eq!(config.pins.echo, 24);
        assert_eq!(config.pins.buzzer, 17);
        assert_eq!(config.pins.button, 25);
        assert_eq!(config.timing.ranging_interval_ms, 200);
        assert_eq!(config.timing.analog_interval_ms, 100);
        assert_eq!(config.history.capacity, 50);
        assert_eq!(config.i2c.adc_addresses, vec![0x48, 0x4B]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [pins]
            trigger = 5

            [history]
            capacity = 10
            "#,
        )
        .unwrap();
        assert_eq!(parsed.pins.trigger, 5);
        assert_eq!(parsed.pins.echo, 24);
        assert_eq!(parsed.history.capacity, 10);
        assert_eq!(parsed.timing, TimingConfig::default());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_file_falls_back() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "pins = 12 [[[").unwrap();
        assert_eq!(Config::load_from_path(file.path()), Config::default());
    }

    #[test]
    fn test_save_then_load() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.alarm.threshold_scale = 0.25;
        config.save(file.path()).unwrap();
        assert_eq!(Config::load_from_path(file.path()), config);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = Config::default();
        config.timing.display_interval_ms = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero("display_interval_ms"))
        );

        let mut config = Config::default();
        config.history.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.alarm.threshold_scale = -1.0;
        assert_eq!(config.validate(), Err(ConfigError::Scale(-1.0)));
    }

    #[test]
    fn test_threshold_scaling() {
        let alarm = Config::default().alarm;
        assert_eq!(alarm.threshold_cm(0), 0.0);
        assert_eq!(alarm.threshold_cm(20), 10.0);
        assert_eq!(alarm.threshold_cm(255), 127.5);
    }
}
