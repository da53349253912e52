use thiserror::Error;

/// Main error type for text playback
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// A fatal decoder fault, tagged with the index of the renderer that hit it
    #[error("Renderer {index} failed: {source}")]
    Renderer {
        index: usize,
        #[source]
        source: DecoderError,
    },

    /// A lifecycle method was called from a state that does not allow it
    #[error("Illegal renderer state: {0}")]
    IllegalState(String),

    /// The renderer was driven before a stream (and therefore a decoder) was set
    #[error("No decoder available")]
    NoDecoder,

    /// No decoder can be created for the given format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlaybackError {
    /// Wrap a decoder fault as a fatal error for the renderer at `index`.
    pub fn for_renderer(index: usize, source: DecoderError) -> Self {
        PlaybackError::Renderer { index, source }
    }

    /// Index of the renderer that produced this error, if any.
    pub fn renderer_index(&self) -> Option<usize> {
        match self {
            PlaybackError::Renderer { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Subtitle decoder errors
#[derive(Error, Debug)]
pub enum DecoderError {
    /// The sample data could not be decoded
    #[error("Failed to decode subtitle: {0}")]
    Decode(String),

    /// A buffer was handed to the decoder out of turn
    #[error("Illegal decoder state: {0}")]
    IllegalState(String),

    /// The decoder has already been released
    #[error("Decoder has been released")]
    Released,

    /// No decoder is registered for the format
    #[error("Unsupported subtitle format: {0}")]
    UnsupportedFormat(String),
}

/// Metadata decoder errors
#[derive(Error, Debug)]
pub enum MetadataDecoderError {
    /// The payload is malformed
    #[error("Failed to decode metadata: {0}")]
    Decode(String),

    /// No decoder accepts the MIME type
    #[error("Unsupported metadata type: {0}")]
    UnsupportedType(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, PlaybackError>;
