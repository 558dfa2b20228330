//! Daemon configuration — TOML-based, platform-aware paths.
//!
//! Only the two pin numbers and the poll/debounce intervals are configurable.
//! Electrical settings (pull-up, falling edge) are fixed by the wiring.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Highest BCM GPIO number broken out on the 40-pin header.
pub const MAX_BCM_PIN: u8 = 27;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// BCM number of the status LED output. Default: 26.
    #[serde(default = "default_led_pin")]
    pub led_pin: u8,

    /// BCM number of the push-button input. Default: 27.
    #[serde(default = "default_button_pin")]
    pub button_pin: u8,

    /// How often to re-check the service for external changes. Default: 1000.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Button debounce window. Default: 300.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_led_pin() -> u8 {
    26
}
fn default_button_pin() -> u8 {
    27
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_debounce_ms() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Config {
            led_pin: default_led_pin(),
            button_pin: default_button_pin(),
            poll_interval_ms: default_poll_interval_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Internal resistor on the button input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    Up,
    Down,
    Off,
}

/// Which edge of the button signal counts as a press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Falling,
    Rising,
}

/// Pin assignment and electrical configuration. Fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    pub led: u8,
    pub button: u8,
    pub pull: Pull,
    pub edge: Edge,
}

impl PinConfig {
    /// Active-low button: pull-up resistor, press pulls the line to ground.
    pub fn active_low(led: u8, button: u8) -> Self {
        Self {
            led,
            button,
            pull: Pull::Up,
            edge: Edge::Falling,
        }
    }
}

/// Timing for the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub debounce: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Config::default().poll_config()
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A pin number is outside the header's BCM range.
    PinOutOfRange { field: &'static str, pin: u8 },
    /// LED and button are configured on the same pin.
    PinConflict(u8),
    /// A zero poll interval would spin the loop.
    ZeroPollInterval,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::PinOutOfRange { field, pin } => {
                write!(f, "Invalid {field}: GPIO {pin} is not in 0-{MAX_BCM_PIN}")
            }
            ValidationError::PinConflict(pin) => {
                write!(f, "led_pin and button_pin are both GPIO {pin}")
            }
            ValidationError::ZeroPollInterval => write!(f, "poll_interval_ms must be > 0"),
        }
    }
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("holeswitch"))
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Load config from disk, or return defaults if not found.
    pub fn load() -> Self {
        let (config, warnings) = Self::load_with_warnings();
        for w in &warnings {
            log::warn!("{w}");
        }
        config
    }

    /// Load config from an arbitrary path, returning the config and any parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Load config from the default path, returning the config and any parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Check every field, returning all problems found.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (field, pin) in [("led_pin", self.led_pin), ("button_pin", self.button_pin)] {
            if pin > MAX_BCM_PIN {
                errors.push(ValidationError::PinOutOfRange { field, pin });
            }
        }
        if self.led_pin == self.button_pin {
            errors.push(ValidationError::PinConflict(self.led_pin));
        }
        if self.poll_interval_ms == 0 {
            errors.push(ValidationError::ZeroPollInterval);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold all problems into a single config error.
    pub fn validated(self) -> crate::error::Result<Self> {
        self.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(ToString::to_string).collect();
            crate::HoleswitchError::Config(msgs.join("; "))
        })?;
        Ok(self)
    }

    pub fn pin_config(&self) -> PinConfig {
        PinConfig::active_low(self.led_pin, self.button_pin)
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            debounce: Duration::from_millis(self.debounce_ms),
        }
    }
}
