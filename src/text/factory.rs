//! Subtitle decoder selection by MIME type

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::DecoderConfig;
use crate::error::DecoderError;
use crate::format::Format;
use crate::text::decoder::{SimpleSubtitleDecoder, SubtitleDecoder, SubtitleParser};

/// Creates decoders for the formats it supports.
pub trait SubtitleDecoderFactory: Send + Sync {
    fn supports_format(&self, format: &Format) -> bool;

    fn create_decoder(&self, format: &Format) -> Result<Box<dyn SubtitleDecoder>, DecoderError>;
}

type DecoderConstructor =
    Arc<dyn Fn(&Format, &DecoderConfig) -> Result<Box<dyn SubtitleDecoder>, DecoderError> + Send + Sync>;

/// A [`SubtitleDecoderFactory`] backed by a table of constructors.
///
/// MIME types are matched case-insensitively. Registering a type twice
/// replaces the earlier constructor.
#[derive(Clone, Default)]
pub struct SubtitleDecoderRegistry {
    constructors: HashMap<String, DecoderConstructor>,
    config: DecoderConfig,
}

impl SubtitleDecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose decoders use the given buffer pool sizes
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            constructors: HashMap::new(),
            config,
        }
    }

    /// Register a decoder constructor for `mime_type`.
    pub fn register<F>(&mut self, mime_type: &str, constructor: F) -> &mut Self
    where
        F: Fn(&Format, &DecoderConfig) -> Result<Box<dyn SubtitleDecoder>, DecoderError>
            + Send
            + Sync
            + 'static,
    {
        let key = mime_type.trim().to_ascii_lowercase();
        if self.constructors.insert(key, Arc::new(constructor)).is_some() {
            tracing::debug!(mime_type, "replaced subtitle decoder registration");
        }
        self
    }

    /// Register a [`SimpleSubtitleDecoder`] around a fresh parser from
    /// `make_parser` for every decoder created.
    pub fn register_parser<P, F>(&mut self, mime_type: &str, make_parser: F) -> &mut Self
    where
        P: SubtitleParser + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        let name = format!("simple:{}", mime_type.trim().to_ascii_lowercase());
        self.register(mime_type, move |_format, config| {
            let decoder = SimpleSubtitleDecoder::new(&name, make_parser(), config);
            Ok(Box::new(decoder) as Box<dyn SubtitleDecoder>)
        })
    }

    /// Registered MIME types, sorted
    pub fn mime_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    fn lookup(&self, format: &Format) -> Option<&DecoderConstructor> {
        let key = format.mime_type().trim().to_ascii_lowercase();
        self.constructors.get(&key)
    }
}

impl SubtitleDecoderFactory for SubtitleDecoderRegistry {
    fn supports_format(&self, format: &Format) -> bool {
        self.lookup(format).is_some()
    }

    fn create_decoder(&self, format: &Format) -> Result<Box<dyn SubtitleDecoder>, DecoderError> {
        let constructor = self
            .lookup(format)
            .ok_or_else(|| DecoderError::UnsupportedFormat(format.mime_type().to_string()))?;
        let decoder = constructor(format, &self.config)?;
        tracing::debug!(
            decoder = decoder.name(),
            mime_type = format.mime_type(),
            "created subtitle decoder"
        );
        Ok(decoder)
    }
}

impl std::fmt::Debug for SubtitleDecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubtitleDecoderRegistry")
            .field("mime_types", &self.mime_types())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::mime;
    use crate::text::subtitle::{Subtitle, TimedCueSubtitle};

    fn empty_parser() -> impl SubtitleParser {
        |_data: &[u8], _reset: bool| -> Result<Box<dyn Subtitle>, DecoderError> {
            Ok(Box::new(TimedCueSubtitle::default()))
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut registry = SubtitleDecoderRegistry::new();
        registry.register_parser(mime::TEXT_VTT, empty_parser);

        assert!(registry.supports_format(&Format::text("TEXT/VTT")));
        assert!(!registry.supports_format(&Format::text(mime::APPLICATION_SUBRIP)));
        assert_eq!(registry.mime_types(), vec!["text/vtt"]);
    }

    #[test]
    fn test_create_decoder() {
        let mut registry = SubtitleDecoderRegistry::with_config(DecoderConfig {
            input_buffer_count: 1,
            output_buffer_count: 1,
        });
        registry.register_parser(mime::APPLICATION_SUBRIP, empty_parser);

        let mut decoder = registry
            .create_decoder(&Format::text(mime::APPLICATION_SUBRIP))
            .unwrap();
        assert_eq!(decoder.name(), "simple:application/x-subrip");
        let _input = decoder.dequeue_input_buffer().unwrap().unwrap();
    }

    #[test]
    fn test_unsupported_format() {
        let registry = SubtitleDecoderRegistry::new();
        let result = registry.create_decoder(&Format::text(mime::TEXT_VTT));
        assert!(matches!(result, Err(DecoderError::UnsupportedFormat(m)) if m == "text/vtt"));
    }

    #[test]
    fn test_constructor_error_is_returned() {
        let mut registry = SubtitleDecoderRegistry::new();
        registry.register(mime::TEXT_SSA, |_, _| {
            Err(DecoderError::Decode("missing header".to_string()))
        });
        assert!(matches!(
            registry.create_decoder(&Format::text(mime::TEXT_SSA)),
            Err(DecoderError::Decode(_))
        ));
    }
}
