//! Decoder input and output buffers
//!
//! Buffers make a round trip: the decoder hands an empty input buffer to the
//! renderer, the renderer fills it from upstream and queues it back. Output
//! buffers go the other way and return to their pool through
//! [`SubtitleOutputBuffer::release`].

use bitflags::bitflags;
use bytes::{Bytes, BytesMut};
use std::sync::Weak;

use crate::format::OFFSET_SAMPLE_RELATIVE;
use crate::text::cue::CueSet;
use crate::text::subtitle::Subtitle;

bitflags! {
    /// Flags carried by input and output buffers.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct BufferFlags: u32 {
        /// The buffer is the last one of the stream and carries no data.
        const END_OF_STREAM = 1 << 2;
        /// The sample should be decoded but not presented.
        const DECODE_ONLY   = 1 << 31;
    }
}

/// Input buffer filled by the upstream source.
#[derive(Debug, Default)]
pub struct SubtitleInputBuffer {
    /// Write area used by the source
    data: BytesMut,
    /// Read view produced by `flip`
    payload: Bytes,
    /// Presentation timestamp of the sample
    pub time_us: i64,
    /// Offset shifting the decoded subtitle onto the presentation clock
    pub subsample_offset_us: i64,
    flags: BufferFlags,
}

impl SubtitleInputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Writable sample data
    pub fn data_mut(&mut self) -> &mut BytesMut {
        &mut self.data
    }

    /// Append sample data
    pub fn write(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Freeze the written data so the decoder can read it.
    pub fn flip(&mut self) {
        self.payload = self.data.split().freeze();
    }

    /// Data made readable by the last `flip`
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn flags(&self) -> BufferFlags {
        self.flags
    }

    pub fn add_flag(&mut self, flag: BufferFlags) {
        self.flags.insert(flag);
    }

    pub fn clear_flag(&mut self, flag: BufferFlags) {
        self.flags.remove(flag);
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.flags.contains(BufferFlags::END_OF_STREAM)
    }

    pub fn is_decode_only(&self) -> bool {
        self.flags.contains(BufferFlags::DECODE_ONLY)
    }

    /// Reset for reuse, keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.data.clear();
        self.payload = Bytes::new();
        self.time_us = 0;
        self.subsample_offset_us = 0;
        self.flags = BufferFlags::empty();
    }
}

/// Receives output buffers back from the renderer.
pub trait OutputBufferOwner: Send + Sync {
    fn release_output_buffer(&self, buffer: SubtitleOutputBuffer);
}

/// What an output buffer carries
#[derive(Debug, Default)]
pub enum OutputContent {
    /// Nothing yet; a pooled buffer
    #[default]
    Empty,
    /// A decoded subtitle whose internal timeline starts at `subsample_offset_us`
    Subtitle {
        subtitle: Box<dyn Subtitle>,
        subsample_offset_us: i64,
    },
    /// The decoder has emitted everything
    EndOfStream,
}

/// A decoded subtitle, or the end-of-stream marker, handed out by a decoder.
///
/// As a [`Subtitle`] it reports event times and cues on the global
/// presentation clock.
#[derive(Debug, Default)]
pub struct SubtitleOutputBuffer {
    /// Presentation time from which this subtitle applies
    pub time_us: i64,
    content: OutputContent,
    flags: BufferFlags,
    owner: Option<Weak<dyn OutputBufferOwner>>,
}

impl SubtitleOutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the pool this buffer returns to on release.
    pub fn set_owner(&mut self, owner: Weak<dyn OutputBufferOwner>) {
        self.owner = Some(owner);
    }

    /// Fill with a decoded subtitle. An offset of
    /// [`OFFSET_SAMPLE_RELATIVE`] places the subtitle's timeline at `time_us`.
    pub fn set_content(
        &mut self,
        time_us: i64,
        subtitle: Box<dyn Subtitle>,
        subsample_offset_us: i64,
    ) {
        self.time_us = time_us;
        let subsample_offset_us = if subsample_offset_us == OFFSET_SAMPLE_RELATIVE {
            time_us
        } else {
            subsample_offset_us
        };
        self.content = OutputContent::Subtitle {
            subtitle,
            subsample_offset_us,
        };
    }

    pub fn set_end_of_stream(&mut self) {
        self.content = OutputContent::EndOfStream;
        self.flags.insert(BufferFlags::END_OF_STREAM);
    }

    pub fn content(&self) -> &OutputContent {
        &self.content
    }

    pub fn flags(&self) -> BufferFlags {
        self.flags
    }

    pub fn add_flag(&mut self, flag: BufferFlags) {
        self.flags.insert(flag);
    }

    pub fn is_end_of_stream(&self) -> bool {
        matches!(self.content, OutputContent::EndOfStream)
    }

    pub fn is_decode_only(&self) -> bool {
        self.flags.contains(BufferFlags::DECODE_ONLY)
    }

    /// Drop the content so the buffer can be pooled. The owner is kept.
    pub fn clear(&mut self) {
        self.time_us = 0;
        self.content = OutputContent::Empty;
        self.flags = BufferFlags::empty();
    }

    /// Return the buffer to the decoder that produced it. Buffers whose
    /// decoder is gone are simply dropped.
    pub fn release(mut self) {
        let owner = self.owner.as_ref().and_then(Weak::upgrade);
        self.clear();
        if let Some(owner) = owner {
            owner.release_output_buffer(self);
        }
    }

    fn subtitle(&self) -> Option<(&dyn Subtitle, i64)> {
        match &self.content {
            OutputContent::Subtitle {
                subtitle,
                subsample_offset_us,
            } => Some((subtitle.as_ref(), *subsample_offset_us)),
            _ => None,
        }
    }
}

impl Subtitle for SubtitleOutputBuffer {
    fn next_event_time_index(&self, time_us: i64) -> Option<usize> {
        self.subtitle()
            .and_then(|(subtitle, offset)| subtitle.next_event_time_index(time_us - offset))
    }

    fn event_time_count(&self) -> usize {
        self.subtitle()
            .map_or(0, |(subtitle, _)| subtitle.event_time_count())
    }

    /// `i64::MAX` when the buffer holds no subtitle.
    fn event_time(&self, index: usize) -> i64 {
        self.subtitle()
            .map_or(i64::MAX, |(subtitle, offset)| subtitle.event_time(index) + offset)
    }

    fn cues(&self, time_us: i64) -> CueSet {
        self.subtitle()
            .map_or_else(CueSet::empty, |(subtitle, offset)| subtitle.cues(time_us - offset))
    }
}
