//! Engine configuration with validation.
//!
//! Tunables for pagination, the `list_by_action` over-fetch heuristic,
//! retention batching, and metadata bounds. All fields have serde defaults so
//! partial configuration files deserialize cleanly.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// Errors produced when configuration values are out of range.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// A configuration value failed validation.
    #[snafu(display("Invalid configuration: {message}"))]
    Validation {
        /// Description of the violated constraint.
        message: String,
    },
}

/// Engine tunables.
///
/// # Defaults
///
/// - `default_page_size`: `50`
/// - `max_page_size`: `500`
/// - `action_overfetch_factor`: `2`
/// - `retention_batch_size`: `100`
/// - `max_metadata_entries`: `64`
///
/// # Example
///
/// ```
/// # use papertrail_types::EngineConfig;
/// let config = EngineConfig::builder()
///     .default_page_size(25)
///     .retention_batch_size(500)
///     .build()
///     .expect("valid engine config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EngineConfig {
    /// Page size applied when a query omits `limit` (1..=max_page_size).
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Hard cap on caller-supplied limits (1..=10_000).
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Over-fetch multiplier for `list_by_action`'s in-memory organization
    /// post-filter (1..=10). Higher values trade read amplification for
    /// fewer under-reported pages.
    #[serde(default = "default_action_overfetch_factor")]
    pub action_overfetch_factor: usize,

    /// Default number of events deleted per retention invocation (1..=10_000).
    #[serde(default = "default_retention_batch_size")]
    pub retention_batch_size: usize,

    /// Maximum entries accepted in an event's metadata map (1..=1024).
    #[serde(default = "default_max_metadata_entries")]
    pub max_metadata_entries: usize,
}

fn default_page_size() -> usize {
    50
}

fn default_max_page_size() -> usize {
    500
}

fn default_action_overfetch_factor() -> usize {
    2
}

fn default_retention_batch_size() -> usize {
    100
}

fn default_max_metadata_entries() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            action_overfetch_factor: default_action_overfetch_factor(),
            retention_batch_size: default_retention_batch_size(),
            max_metadata_entries: default_max_metadata_entries(),
        }
    }
}

#[bon::bon]
impl EngineConfig {
    /// Creates a new `EngineConfig` with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any value is outside its documented range,
    /// or if `default_page_size` exceeds `max_page_size`.
    #[builder]
    pub fn new(
        default_page_size: Option<usize>,
        max_page_size: Option<usize>,
        action_overfetch_factor: Option<usize>,
        retention_batch_size: Option<usize>,
        max_metadata_entries: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            default_page_size: default_page_size.unwrap_or_else(self::default_page_size),
            max_page_size: max_page_size.unwrap_or_else(self::default_max_page_size),
            action_overfetch_factor: action_overfetch_factor
                .unwrap_or_else(self::default_action_overfetch_factor),
            retention_batch_size: retention_batch_size
                .unwrap_or_else(self::default_retention_batch_size),
            max_metadata_entries: max_metadata_entries
                .unwrap_or_else(self::default_max_metadata_entries),
        };
        config.validate()?;
        Ok(config)
    }
}

impl EngineConfig {
    /// Validates configuration values are within acceptable ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=10_000).contains(&self.max_page_size) {
            return Err(ConfigError::Validation {
                message: format!("max_page_size must be 1..=10000, got {}", self.max_page_size),
            });
        }
        if self.default_page_size < 1 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::Validation {
                message: format!(
                    "default_page_size must be 1..={}, got {}",
                    self.max_page_size, self.default_page_size
                ),
            });
        }
        if !(1..=10).contains(&self.action_overfetch_factor) {
            return Err(ConfigError::Validation {
                message: format!(
                    "action_overfetch_factor must be 1..=10, got {}",
                    self.action_overfetch_factor
                ),
            });
        }
        if !(1..=10_000).contains(&self.retention_batch_size) {
            return Err(ConfigError::Validation {
                message: format!(
                    "retention_batch_size must be 1..=10000, got {}",
                    self.retention_batch_size
                ),
            });
        }
        if !(1..=1024).contains(&self.max_metadata_entries) {
            return Err(ConfigError::Validation {
                message: format!(
                    "max_metadata_entries must be 1..=1024, got {}",
                    self.max_metadata_entries
                ),
            });
        }
        Ok(())
    }
}
