//! Configuration file support
//!
//! Loads renderer configuration from TOML files. Every section is optional so
//! a file only needs to name the settings it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{DecoderConfig, LogFormat, LoggingConfig, RendererConfig, TimestampConfig};
use crate::error::{PlaybackError, Result};
use crate::text::decoder::MIN_OUTPUT_BUFFERS;

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Decoder settings
    pub decoder: Option<DecoderSettings>,
    /// Timestamp settings
    pub timestamps: Option<TimestampSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecoderSettings {
    /// Number of input buffers
    pub input_buffer_count: Option<usize>,
    /// Number of output buffers
    pub output_buffer_count: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimestampSettings {
    /// Maximum number of tracked discontinuity sequences
    pub max_adjusters: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,
    /// Output format (json, pretty)
    pub format: Option<LogFormat>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| PlaybackError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| PlaybackError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        Self {
            decoder: Some(DecoderSettings {
                input_buffer_count: Some(2),
                output_buffer_count: Some(2),
            }),
            timestamps: Some(TimestampSettings {
                max_adjusters: None,
            }),
            logging: Some(LoggingSettings {
                level: Some("info".to_string()),
                format: Some(LogFormat::Pretty),
            }),
        }
    }

    /// Reject settings the renderer cannot run with
    pub fn validate(&self) -> Result<()> {
        if let Some(decoder) = &self.decoder {
            if decoder.input_buffer_count == Some(0) {
                return Err(PlaybackError::Config(
                    "decoder.input_buffer_count must be at least 1".to_string(),
                ));
            }
            if matches!(decoder.output_buffer_count, Some(count) if count < MIN_OUTPUT_BUFFERS) {
                return Err(PlaybackError::Config(format!(
                    "decoder.output_buffer_count must be at least {}",
                    MIN_OUTPUT_BUFFERS
                )));
            }
        }
        if let Some(TimestampSettings {
            max_adjusters: Some(0),
        }) = &self.timestamps
        {
            return Err(PlaybackError::Config(
                "timestamps.max_adjusters must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Convert to RendererConfig, filling unset fields with defaults
    pub fn into_renderer_config(self) -> Result<RendererConfig> {
        self.validate()?;

        let decoder_defaults = DecoderConfig::default();
        let logging_defaults = LoggingConfig::default();
        let decoder = self.decoder.unwrap_or_default();
        let logging = self.logging.unwrap_or_default();

        Ok(RendererConfig {
            decoder: DecoderConfig {
                input_buffer_count: decoder
                    .input_buffer_count
                    .unwrap_or(decoder_defaults.input_buffer_count),
                output_buffer_count: decoder
                    .output_buffer_count
                    .unwrap_or(decoder_defaults.output_buffer_count),
            },
            timestamps: TimestampConfig {
                max_adjusters: self.timestamps.and_then(|t| t.max_adjusters),
            },
            logging: LoggingConfig {
                level: logging.level.unwrap_or(logging_defaults.level),
                format: logging.format.unwrap_or(logging_defaults.format),
            },
        })
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    ConfigFile::default_config().to_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default_config().into_renderer_config().unwrap();
        assert_eq!(config, RendererConfig::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[timestamps]\nmax_adjusters = 4\n\n[logging]\nformat = \"json\"").unwrap();

        let config = ConfigFile::from_file(temp_file.path())
            .unwrap()
            .into_renderer_config()
            .unwrap();
        assert_eq!(config.timestamps.max_adjusters, Some(4));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.decoder.output_buffer_count, 2);
    }

    #[test]
    fn test_zero_buffers_rejected() {
        let config = ConfigFile {
            decoder: Some(DecoderSettings {
                input_buffer_count: Some(0),
                output_buffer_count: None,
            }),
            ..Default::default()
        };
        assert!(matches!(
            config.into_renderer_config(),
            Err(PlaybackError::Config(_))
        ));
    }

    #[test]
    fn test_single_output_buffer_rejected() {
        let config = ConfigFile {
            decoder: Some(DecoderSettings {
                input_buffer_count: None,
                output_buffer_count: Some(1),
            }),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PlaybackError::Config(m)) if m.contains("at least 2")));
    }

    #[test]
    fn test_zero_adjusters_rejected() {
        let config = ConfigFile {
            timestamps: Some(TimestampSettings {
                max_adjusters: Some(0),
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[decoder\ninput_buffer_count = ").unwrap();
        assert!(matches!(
            ConfigFile::from_file(temp_file.path()),
            Err(PlaybackError::Config(_))
        ));
    }

    #[test]
    fn test_generate_default_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        generate_default_config(&path).unwrap();

        let loaded = ConfigFile::from_file(&path).unwrap();
        assert_eq!(
            loaded.decoder.and_then(|d| d.input_buffer_count),
            Some(2)
        );
    }
}
