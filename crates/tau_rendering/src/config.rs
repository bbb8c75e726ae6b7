//! Pipeline configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! buffer_capacity = 16384
//! insert_wait_timeout_ms = 16
//! possession_return_timeout_ms = 1000
//! thread_name = "tau-render"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Smallest accepted instruction buffer.
pub const MIN_BUFFER_CAPACITY: usize = 64;

/// Tuning for one [`RenderingPipeline`](crate::RenderingPipeline).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Size of each of the two instruction buffers, in bytes.
    pub buffer_capacity: usize,
    /// How long the render thread waits for a frame before re-checking
    /// exit and possession requests.
    pub insert_wait_timeout_ms: u64,
    /// Period of the diagnostic warning while the context is lent out.
    pub possession_return_timeout_ms: u64,
    /// Name given to the render thread.
    pub thread_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 16 * 1024,
            insert_wait_timeout_ms: 16,
            possession_return_timeout_ms: 1000,
            thread_name: "tau-render".to_owned(),
        }
    }
}

impl PipelineConfig {
    /// Parses a TOML document and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity < MIN_BUFFER_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "buffer_capacity must be at least {MIN_BUFFER_CAPACITY} bytes, got {}",
                self.buffer_capacity
            )));
        }
        if self.insert_wait_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "insert_wait_timeout_ms must be greater than zero".to_owned(),
            ));
        }
        if self.possession_return_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "possession_return_timeout_ms must be greater than zero".to_owned(),
            ));
        }
        if self.thread_name.is_empty() {
            return Err(ConfigError::Invalid("thread_name must not be empty".to_owned()));
        }
        Ok(())
    }

    /// Returns a copy with a different buffer capacity.
    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Returns a copy with a different insert wait, rounded up to whole
    /// milliseconds.
    #[must_use]
    pub fn with_insert_wait_timeout(mut self, timeout: Duration) -> Self {
        self.insert_wait_timeout_ms = millis_rounded_up(timeout);
        self
    }

    /// Returns a copy with a different possession return period, rounded
    /// up to whole milliseconds.
    #[must_use]
    pub fn with_possession_return_timeout(mut self, timeout: Duration) -> Self {
        self.possession_return_timeout_ms = millis_rounded_up(timeout);
        self
    }

    /// Bounded wait for insert-ready.
    #[must_use]
    pub const fn insert_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.insert_wait_timeout_ms)
    }

    /// Diagnostic period while the context is lent out.
    #[must_use]
    pub const fn possession_return_timeout(&self) -> Duration {
        Duration::from_millis(self.possession_return_timeout_ms)
    }
}

fn millis_rounded_up(duration: Duration) -> u64 {
    let partial = u128::from(duration.subsec_nanos() % 1_000_000 != 0);
    u64::try_from(duration.as_millis() + partial).unwrap_or(u64::MAX)
}
