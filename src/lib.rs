//! Subtitle rendering for segmented (HLS) playback
//!
//! The [`TextRenderer`] pulls subtitle samples from a [`SampleStream`], decodes
//! them and pushes cue updates to a sink at the right presentation instants.
//! [`TimestampAdjuster`]s translate segment timestamps onto one presentation
//! clock per discontinuity sequence.

pub mod config;
pub mod config_file;
pub mod error;
pub mod format;
pub mod logging;
pub mod metadata;
pub mod renderer;
pub mod text;
pub mod timestamp;

#[cfg(test)]
pub(crate) mod tests;

pub use config::{DecoderConfig, LogFormat, LoggingConfig, RendererConfig, TimestampConfig};
pub use config_file::ConfigFile;
pub use error::{DecoderError, MetadataDecoderError, PlaybackError, Result};
pub use format::{mime, Format, FormatHolder, OFFSET_SAMPLE_RELATIVE};
pub use logging::init_logging;
pub use metadata::{Metadata, MetadataDecoder, MetadataDecoderRegistry, MetadataEntry};
pub use renderer::{
    FormatSupport, ReadResult, Renderer, RendererCore, RendererState, SampleStream, TrackType,
};
pub use text::{
    cue_channel, Cue, CueReceiver, CueSet, OutputDispatch, SimpleSubtitleDecoder, Subtitle,
    SubtitleDecoder, SubtitleDecoderFactory, SubtitleDecoderRegistry, SubtitleParser, TextOutput,
    TextRenderer, TimedCue, TimedCueSubtitle,
};
pub use timestamp::{SharedTimestampAdjuster, TimestampAdjuster, TimestampAdjusterProvider};
