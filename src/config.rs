//! Renderer configuration

use serde::{Deserialize, Serialize};

use crate::error::{PlaybackError, Result};

/// Subtitle decoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Number of input buffers in the decoder pool
    pub input_buffer_count: usize,

    /// Number of output buffers in the decoder pool
    pub output_buffer_count: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            input_buffer_count: 2,
            output_buffer_count: 2,
        }
    }
}

/// Timestamp adjustment configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimestampConfig {
    /// Maximum number of discontinuity sequences tracked at once.
    /// `None` keeps every adjuster until the provider is reset.
    pub max_adjusters: Option<usize>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Renderer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Decoder configuration
    pub decoder: DecoderConfig,

    /// Timestamp adjustment configuration
    pub timestamps: TimestampConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl RendererConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| PlaybackError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &str) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| PlaybackError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
