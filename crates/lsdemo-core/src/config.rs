//! Harness configuration.
//!
//! The host passes an optional JSON options object; every field has a
//! default, so `{}` (or no options at all) yields [`HarnessConfig::default`].

use core::fmt;
use core::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors from loading a [`HarnessConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// Options were not valid JSON or had the wrong shape.
    Parse(serde_json::Error),
    /// Options parsed but a value is out of range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "invalid harness options: {e}"),
            Self::Invalid(msg) => write!(f, "invalid harness options: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

/// Canvas size reported to the script as `@swapchain_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapchainSize {
    pub width: u32,
    pub height: u32,
}

impl Default for SwapchainSize {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 512,
        }
    }
}

/// DOM element ids the web host binds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementIds {
    pub editor: String,
    pub controls: String,
    pub compile_output: String,
    pub frame_output: String,
    pub timing: String,
}

impl Default for ElementIds {
    fn default() -> Self {
        Self {
            editor: "editor".into(),
            controls: "controls".into(),
            compile_output: "compilation-result".into(),
            frame_output: "frame-result".into(),
            timing: "frame-timing".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Delay between the end of one frame tick and the start of the next.
    pub tick_interval_ms: u64,
    pub swapchain: SwapchainSize,
    /// Key of the editor snapshot in the host's key-value store.
    pub storage_key: String,
    /// Save and restore the editor snapshot.
    pub persist_editor: bool,
    pub elements: ElementIds,
    /// Most verbose level forwarded to the log output (`error` .. `trace`).
    pub log_level: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            swapchain: SwapchainSize::default(),
            storage_key: "shader-editor".into(),
            persist_editor: true,
            elements: ElementIds::default(),
            log_level: "info".into(),
        }
    }
}

impl HarnessConfig {
    /// Parse and validate options JSON.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be positive".into(),
            ));
        }
        if self.storage_key.is_empty() {
            return Err(ConfigError::Invalid("storage_key must not be empty".into()));
        }
        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "unknown log_level {:?}",
                self.log_level
            )));
        }
        Ok(())
    }

    /// Parsed `log_level`, falling back to `INFO` for unvalidated configs.
    #[must_use]
    pub fn max_log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
