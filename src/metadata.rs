//! Timed metadata decoding
//!
//! Metadata tracks (ID3 in MPEG-TS segments, emsg boxes) are decoded by a
//! [`MetadataDecoder`] chosen from a [`MetadataDecoderRegistry`] by MIME type.

use bytes::Bytes;
use std::sync::Arc;

use crate::error::MetadataDecoderError;

/// A single decoded metadata item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataEntry {
    /// A text frame, e.g. an ID3 `TXXX` frame
    Text {
        id: String,
        description: Option<String>,
        value: String,
    },
    /// Opaque data tagged with its owner, e.g. an ID3 `PRIV` frame
    Private { owner: String, data: Bytes },
    /// Any other frame, undecoded
    Binary { id: String, data: Bytes },
}

/// Metadata decoded from one sample
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub entries: Vec<MetadataEntry>,
}

impl Metadata {
    pub fn new(entries: Vec<MetadataEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The first text entry with the given frame id
    pub fn text(&self, frame_id: &str) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            MetadataEntry::Text { id, value, .. } if id == frame_id => Some(value.as_str()),
            _ => None,
        })
    }
}

/// Decodes metadata samples of the MIME types it accepts.
pub trait MetadataDecoder: Send + Sync {
    fn can_decode(&self, mime_type: &str) -> bool;

    fn decode(&self, data: &[u8]) -> Result<Metadata, MetadataDecoderError>;
}

/// Ordered list of metadata decoders. The first decoder that accepts a MIME
/// type wins.
#[derive(Clone, Default)]
pub struct MetadataDecoderRegistry {
    decoders: Vec<Arc<dyn MetadataDecoder>>,
}

impl MetadataDecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, decoder: impl MetadataDecoder + 'static) -> &mut Self {
        self.decoders.push(Arc::new(decoder));
        self
    }

    pub fn supports(&self, mime_type: &str) -> bool {
        self.decoder_for(mime_type).is_some()
    }

    pub fn decoder_for(&self, mime_type: &str) -> Option<Arc<dyn MetadataDecoder>> {
        self.decoders
            .iter()
            .find(|decoder| decoder.can_decode(mime_type))
            .cloned()
    }

    /// Decode `data` with the first decoder accepting `mime_type`.
    pub fn decode(&self, mime_type: &str, data: &[u8]) -> Result<Metadata, MetadataDecoderError> {
        let decoder = self
            .decoder_for(mime_type)
            .ok_or_else(|| MetadataDecoderError::UnsupportedType(mime_type.to_string()))?;
        let metadata = decoder.decode(data)?;
        tracing::trace!(mime_type, entries = metadata.len(), "decoded metadata");
        Ok(metadata)
    }
}

impl std::fmt::Debug for MetadataDecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataDecoderRegistry")
            .field("decoders", &self.decoders.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::mime;

    /// Decodes `ID=value` lines into text entries.
    struct KeyValueDecoder;

    impl MetadataDecoder for KeyValueDecoder {
        fn can_decode(&self, mime_type: &str) -> bool {
            mime_type == mime::APPLICATION_ID3
        }

        fn decode(&self, data: &[u8]) -> Result<Metadata, MetadataDecoderError> {
            let text = std::str::from_utf8(data)
                .map_err(|e| MetadataDecoderError::Decode(e.to_string()))?;
            let entries = text
                .lines()
                .map(|line| {
                    let (id, value) = line
                        .split_once('=')
                        .ok_or_else(|| MetadataDecoderError::Decode(format!("bad line: {}", line)))?;
                    Ok(MetadataEntry::Text {
                        id: id.to_string(),
                        description: None,
                        value: value.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, MetadataDecoderError>>()?;
            Ok(Metadata::new(entries))
        }
    }

    struct CatchAll;

    impl MetadataDecoder for CatchAll {
        fn can_decode(&self, _mime_type: &str) -> bool {
            true
        }

        fn decode(&self, data: &[u8]) -> Result<Metadata, MetadataDecoderError> {
            Ok(Metadata::new(vec![MetadataEntry::Binary {
                id: "RAW".to_string(),
                data: Bytes::copy_from_slice(data),
            }]))
        }
    }

    #[test]
    fn test_first_matching_decoder_wins() {
        let mut registry = MetadataDecoderRegistry::new();
        registry.register(KeyValueDecoder).register(CatchAll);

        let metadata = registry
            .decode(mime::APPLICATION_ID3, b"TIT2=Title\nTPE1=Artist")
            .unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.text("TPE1"), Some("Artist"));

        let raw = registry.decode("application/x-emsg", b"\x01\x02").unwrap();
        assert!(matches!(&raw.entries[0], MetadataEntry::Binary { id, .. } if id == "RAW"));
    }

    #[test]
    fn test_unsupported_type() {
        let mut registry = MetadataDecoderRegistry::new();
        registry.register(KeyValueDecoder);
        assert!(!registry.supports("application/x-emsg"));
        assert!(matches!(
            registry.decode("application/x-emsg", b""),
            Err(MetadataDecoderError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_decode_error() {
        let mut registry = MetadataDecoderRegistry::new();
        registry.register(KeyValueDecoder);
        assert!(matches!(
            registry.decode(mime::APPLICATION_ID3, b"no separator"),
            Err(MetadataDecoderError::Decode(_))
        ));
    }
}
