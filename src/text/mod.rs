//! Subtitle decoding and rendering
//!
//! - Cues and immutable cue sets (`cue`)
//! - Time-indexed decoded subtitles (`subtitle`)
//! - Pooled decoder buffers (`buffer`)
//! - Decoder contract and the pooled synchronous decoder (`decoder`)
//! - Decoder selection by MIME type (`factory`)
//! - Cue delivery to the sink (`output`)
//! - The text renderer state machine (`renderer`)

pub mod buffer;
pub mod cue;
pub mod decoder;
pub mod factory;
pub mod output;
pub mod renderer;
pub mod subtitle;

pub use buffer::{BufferFlags, SubtitleInputBuffer, SubtitleOutputBuffer};
pub use cue::{Cue, CueSet};
pub use decoder::{SimpleSubtitleDecoder, SubtitleDecoder, SubtitleParser};
pub use factory::{SubtitleDecoderFactory, SubtitleDecoderRegistry};
pub use output::{cue_channel, CueReceiver, OutputDispatch, TextOutput};
pub use renderer::TextRenderer;
pub use subtitle::{Subtitle, TimedCue, TimedCueSubtitle};
