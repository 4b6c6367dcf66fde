//! Digitizer configuration loading and config file resolution
//!
//! The digitizer reads a single TOML file describing the channel classes,
//! their noise and threshold parameters, and where the digits go.
//! Every field has a built-in default so a missing file is not fatal.
//!
//! # Config file priority
//!
//! 1. Command-line argument (highest priority)
//! 2. `PHOS_DIGITIZER_CONFIG` environment variable
//! 3. `<config dir>/phos/digitizer.toml` (platform config directory)
//! 4. Built-in defaults (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "PHOS_DIGITIZER_CONFIG";

/// Time assigned to a digit that only carries noise (seconds).
///
/// Real arrival times are nanoseconds, so this is later than any of them.
pub const DEFAULT_NOISE_TIME: f64 = 1.0;

/// Complete digitizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitizerConfig {
    /// Name of the digit output; a second run into the same name is refused
    #[serde(default = "default_output_name")]
    pub output_name: String,

    /// SQLite database receiving the digits (in-memory sink if absent)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Seed for the noise generator (entropy-seeded if absent)
    #[serde(default)]
    pub seed: Option<u64>,

    /// Time given to noise-only digits
    #[serde(default = "default_noise_time")]
    pub noise_time: f64,

    /// Explicit origin-id offset per input (falls back to a fixed stride)
    #[serde(default)]
    pub masks: Option<Vec<i64>>,

    /// Channel classes in ascending channel order
    #[serde(default = "default_classes")]
    pub classes: Vec<ChannelClassConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One contiguous class of channels (e.g. EMC crystals, CPV pads)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelClassConfig {
    /// Class name
    pub name: String,

    /// Number of channels in the class
    pub channels: u32,

    /// Electronics noise sigma in calibrated units
    pub noise_sigma: f64,

    /// Digit threshold in calibrated units
    pub threshold: f64,

    /// Calibration pedestal (raw units)
    #[serde(default)]
    pub pedestal: f64,

    /// Calibration slope (raw units per calibrated unit)
    #[serde(default = "default_slope")]
    pub slope: f64,

    /// Whether digits of this class get a time from their earliest contribution
    #[serde(default = "default_true")]
    pub derive_time: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_output_name() -> String {
    "Default".to_string()
}

fn default_noise_time() -> f64 {
    DEFAULT_NOISE_TIME
}

fn default_slope() -> f64 {
    10_000_000.0
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_classes() -> Vec<ChannelClassConfig> {
    vec![
        // 5 modules x 64 x 56 crystals
        ChannelClassConfig {
            name: "EMC".to_string(),
            channels: 5 * 64 * 56,
            noise_sigma: 0.01,
            threshold: 0.01,
            pedestal: 0.0,
            slope: default_slope(),
            derive_time: true,
        },
        // 5 modules x 128 x 60 pads, no timing
        ChannelClassConfig {
            name: "CPV".to_string(),
            channels: 5 * 128 * 60,
            noise_sigma: 0.01,
            threshold: 0.09,
            pedestal: 0.0,
            slope: default_slope(),
            derive_time: false,
        },
    ]
}

impl Default for DigitizerConfig {
    fn default() -> Self {
        Self {
            output_name: default_output_name(),
            database_path: None,
            seed: None,
            noise_time: default_noise_time(),
            classes: default_classes(),
            masks: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl DigitizerConfig {
    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: DigitizerConfig = toml::from_str(text)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        info!("Loaded digitizer configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve the config file and load it, falling back to built-in defaults
    ///
    /// A missing file is a warning. A file that exists but does not parse
    /// or validate is an error.
    pub fn load_or_default(cli_arg: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_arg) {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("No config file located, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Total number of channels across all classes
    pub fn total_channels(&self) -> u64 {
        self.classes.iter().map(|c| u64::from(c.channels)).sum()
    }

    /// Check the configuration for values the digitizer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.output_name.trim().is_empty() {
            return Err(Error::Config("output_name must not be empty".to_string()));
        }
        if !self.noise_time.is_finite() {
            return Err(Error::Config("noise_time must be finite".to_string()));
        }
        if self.classes.is_empty() {
            return Err(Error::Config("at least one channel class is required".to_string()));
        }

        let mut names = HashSet::new();
        let mut total: u32 = 0;
        for class in &self.classes {
            if !names.insert(class.name.as_str()) {
                return Err(Error::Config(format!("duplicate channel class '{}'", class.name)));
            }
            if class.channels == 0 {
                return Err(Error::Config(format!("class '{}' has no channels", class.name)));
            }
            // Channel ids run from 1, and the id after the last must still fit
            total = total
                .checked_add(class.channels)
                .filter(|t| *t < u32::MAX)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "{} channels exceed the channel id range",
                        self.total_channels()
                    ))
                })?;
            if !(class.noise_sigma >= 0.0) {
                return Err(Error::Config(format!(
                    "class '{}' noise_sigma must be non-negative",
                    class.name
                )));
            }
            if !class.threshold.is_finite() {
                return Err(Error::Config(format!(
                    "class '{}' threshold must be finite",
                    class.name
                )));
            }
            // A non-positive slope would make the calibration non-monotonic
            if !(class.slope > 0.0) || !class.pedestal.is_finite() {
                return Err(Error::Config(format!(
                    "class '{}' needs a positive slope and a finite pedestal",
                    class.name
                )));
            }
        }

        if let Some(masks) = &self.masks {
            let distinct: HashSet<i64> = masks.iter().copied().collect();
            if distinct.len() != masks.len() {
                return Err(Error::Config("masks must be distinct per input".to_string()));
            }
            if masks.iter().any(|m| *m < 0) {
                return Err(Error::Config("masks must be non-negative".to_string()));
            }
        }

        Ok(())
    }
}

/// Locate the config file following the priority order in the module docs
///
/// Returns `None` only when no candidate location can be determined.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    dirs::config_dir().map(|d| d.join("phos").join("digitizer.toml"))
}
