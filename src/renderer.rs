//! Renderer lifecycle shared by all track renderers
//!
//! A renderer is driven by the playback thread: `enable` attaches a stream,
//! `start`/`stop` toggle presentation, `render` is called periodically and
//! `disable` tears everything down. Implementors supply the `on_*` hooks and
//! `render`; the transitions themselves are provided by [`Renderer`].

use crate::error::{PlaybackError, Result};
use crate::format::{Format, FormatHolder, OFFSET_SAMPLE_RELATIVE};
use crate::text::buffer::{BufferFlags, SubtitleInputBuffer};

/// Kind of track a renderer consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackType {
    Audio,
    Video,
    Text,
    Metadata,
}

/// Renderer lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RendererState {
    #[default]
    Disabled,
    Enabled,
    Started,
}

/// How well a renderer handles a format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSupport {
    /// A decoder exists for the format
    Handled,
    /// The track type is right but no decoder handles this MIME type
    UnsupportedSubtype,
    /// Not a track type this renderer handles
    UnsupportedType,
}

/// Outcome of a non-blocking read from a [`SampleStream`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadResult {
    /// The buffer was filled
    BufferRead,
    /// The format holder was filled
    FormatRead,
    /// Nothing is available yet
    NothingRead,
    /// The stream has no more samples
    EndOfStream,
}

/// Upstream source of samples for one renderer.
pub trait SampleStream: Send {
    /// Whether a read would return data right now
    fn is_ready(&self) -> bool;

    /// Read a sample or format change without blocking. A stream may signal
    /// its end either by returning [`ReadResult::EndOfStream`] or with an
    /// end-of-stream flagged [`ReadResult::BufferRead`].
    fn read_data(
        &mut self,
        format_holder: &mut FormatHolder,
        buffer: &mut SubtitleInputBuffer,
    ) -> ReadResult;
}

/// Lifecycle bookkeeping embedded in every renderer
pub struct RendererCore {
    index: usize,
    state: RendererState,
    stream: Option<Box<dyn SampleStream>>,
    stream_offset_us: i64,
    stream_is_final: bool,
    read_end_of_stream: bool,
}

impl RendererCore {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            state: RendererState::Disabled,
            stream: None,
            stream_offset_us: 0,
            stream_is_final: false,
            read_end_of_stream: false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    /// Offset added to the timestamps of the current stream
    pub fn stream_offset_us(&self) -> i64 {
        self.stream_offset_us
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Whether the source can provide data, or has legitimately ended
    pub fn is_source_ready(&self) -> bool {
        if self.read_end_of_stream {
            return self.stream_is_final;
        }
        self.stream.as_ref().is_some_and(|s| s.is_ready())
    }

    /// Shift a stream format onto the renderer timeline.
    pub fn offset_format(&self, mut format: Format) -> Format {
        if format.subsample_offset_us != OFFSET_SAMPLE_RELATIVE {
            format.subsample_offset_us = format
                .subsample_offset_us
                .saturating_add(self.stream_offset_us);
        }
        format
    }

    /// Read from the current stream.
    ///
    /// Buffer timestamps and format offsets are shifted by the stream offset.
    /// End of stream is always reported as an end-of-stream flagged buffer, and
    /// only when the stream is final; otherwise it reads as nothing so a
    /// replacement stream can follow.
    pub fn read_source(
        &mut self,
        format_holder: &mut FormatHolder,
        buffer: &mut SubtitleInputBuffer,
    ) -> ReadResult {
        if self.stream.is_none() {
            return ReadResult::NothingRead;
        }
        if self.read_end_of_stream {
            return self.end_of_stream(buffer);
        }
        let result = match self.stream.as_mut() {
            Some(stream) => stream.read_data(format_holder, buffer),
            None => ReadResult::NothingRead,
        };

        match result {
            ReadResult::BufferRead if buffer.is_end_of_stream() => {
                self.read_end_of_stream = true;
                self.end_of_stream(buffer)
            }
            ReadResult::EndOfStream => {
                self.read_end_of_stream = true;
                self.end_of_stream(buffer)
            }
            ReadResult::BufferRead => {
                buffer.time_us = buffer.time_us.saturating_add(self.stream_offset_us);
                ReadResult::BufferRead
            }
            ReadResult::FormatRead => {
                if let Some(format) = format_holder.format.take() {
                    format_holder.format = Some(self.offset_format(format));
                }
                ReadResult::FormatRead
            }
            ReadResult::NothingRead => ReadResult::NothingRead,
        }
    }

    fn end_of_stream(&self, buffer: &mut SubtitleInputBuffer) -> ReadResult {
        if !self.stream_is_final {
            return ReadResult::NothingRead;
        }
        buffer.add_flag(BufferFlags::END_OF_STREAM);
        ReadResult::BufferRead
    }
}

impl std::fmt::Debug for RendererCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererCore")
            .field("index", &self.index)
            .field("state", &self.state)
            .field("has_stream", &self.stream.is_some())
            .field("stream_offset_us", &self.stream_offset_us)
            .field("stream_is_final", &self.stream_is_final)
            .field("read_end_of_stream", &self.read_end_of_stream)
            .finish()
    }
}

fn illegal_state(operation: &str, state: RendererState) -> PlaybackError {
    PlaybackError::IllegalState(format!("cannot {} a renderer in state {:?}", operation, state))
}

/// A track renderer driven by the playback thread.
pub trait Renderer: Send {
    fn track_type(&self) -> TrackType;

    fn core(&self) -> &RendererCore;

    fn core_mut(&mut self) -> &mut RendererCore;

    fn supports_format(&self, format: &Format) -> FormatSupport;

    /// One periodic tick. Must not block.
    fn render(&mut self, position_us: i64, elapsed_realtime_us: i64) -> Result<()>;

    fn is_ready(&self) -> bool;

    fn is_ended(&self) -> bool;

    fn on_enabled(&mut self, _joining: bool) -> Result<()> {
        Ok(())
    }

    fn on_stream_changed(&mut self, _formats: &[Format], _offset_us: i64) -> Result<()> {
        Ok(())
    }

    fn on_position_reset(&mut self, _position_us: i64, _joining: bool) -> Result<()> {
        Ok(())
    }

    fn on_started(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_stopped(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_disabled(&mut self) {}

    fn index(&self) -> usize {
        self.core().index()
    }

    fn state(&self) -> RendererState {
        self.core().state()
    }

    /// Attach a stream and move from disabled to enabled.
    fn enable(
        &mut self,
        formats: &[Format],
        stream: Box<dyn SampleStream>,
        position_us: i64,
        joining: bool,
        offset_us: i64,
    ) -> Result<()> {
        let state = self.state();
        if state != RendererState::Disabled {
            return Err(illegal_state("enable", state));
        }
        tracing::debug!(index = self.index(), position_us, offset_us, "enabling renderer");
        self.core_mut().state = RendererState::Enabled;
        self.on_enabled(joining)?;
        self.replace_stream(formats, stream, offset_us)?;
        self.on_position_reset(position_us, joining)
    }

    /// Switch to the next stream, continuing from the current position.
    fn replace_stream(
        &mut self,
        formats: &[Format],
        stream: Box<dyn SampleStream>,
        offset_us: i64,
    ) -> Result<()> {
        let core = self.core_mut();
        if core.stream_is_final {
            return Err(PlaybackError::IllegalState(
                "cannot replace a stream marked final".to_string(),
            ));
        }
        core.stream = Some(stream);
        core.read_end_of_stream = false;
        core.stream_offset_us = offset_us;
        self.on_stream_changed(formats, offset_us)
    }

    fn start(&mut self) -> Result<()> {
        let state = self.state();
        if state != RendererState::Enabled {
            return Err(illegal_state("start", state));
        }
        self.core_mut().state = RendererState::Started;
        self.on_started()
    }

    fn stop(&mut self) -> Result<()> {
        let state = self.state();
        if state != RendererState::Started {
            return Err(illegal_state("stop", state));
        }
        self.core_mut().state = RendererState::Enabled;
        self.on_stopped()
    }

    fn disable(&mut self) -> Result<()> {
        let state = self.state();
        if state != RendererState::Enabled {
            return Err(illegal_state("disable", state));
        }
        let core = self.core_mut();
        core.state = RendererState::Disabled;
        core.stream = None;
        core.stream_is_final = false;
        core.read_end_of_stream = false;
        self.on_disabled();
        tracing::debug!(index = self.index(), "disabled renderer");
        Ok(())
    }

    /// Seek: drop everything in flight and continue from `position_us`.
    fn reset_position(&mut self, position_us: i64) -> Result<()> {
        let core = self.core_mut();
        core.stream_is_final = false;
        core.read_end_of_stream = false;
        self.on_position_reset(position_us, false)
    }

    /// No stream will follow the current one.
    fn set_current_stream_final(&mut self) {
        self.core_mut().stream_is_final = true;
    }

    fn is_current_stream_final(&self) -> bool {
        self.core().stream_is_final
    }

    /// Whether the current stream has been read to its end
    fn has_read_stream_to_end(&self) -> bool {
        self.core().read_end_of_stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::mime;
    use std::collections::VecDeque;

    struct ScriptedStream(VecDeque<(ReadResult, Option<i64>)>);

    impl SampleStream for ScriptedStream {
        fn is_ready(&self) -> bool {
            !self.0.is_empty()
        }

        fn read_data(
            &mut self,
            format_holder: &mut FormatHolder,
            buffer: &mut SubtitleInputBuffer,
        ) -> ReadResult {
            match self.0.pop_front() {
                Some((ReadResult::FormatRead, offset)) => {
                    format_holder.format =
                        Some(Format::text(mime::TEXT_VTT).with_subsample_offset_us(offset.unwrap_or(0)));
                    ReadResult::FormatRead
                }
                Some((result, time_us)) => {
                    if let Some(time_us) = time_us {
                        buffer.time_us = time_us;
                    }
                    result
                }
                None => ReadResult::NothingRead,
            }
        }
    }

    #[derive(Default)]
    struct Probe {
        core: Option<RendererCore>,
        resets: Vec<i64>,
        stream_changes: usize,
        disabled: bool,
    }

    impl Probe {
        fn new() -> Self {
            Probe {
                core: Some(RendererCore::new(3)),
                ..Default::default()
            }
        }
    }

    impl Renderer for Probe {
        fn track_type(&self) -> TrackType {
            TrackType::Text
        }

        fn core(&self) -> &RendererCore {
            self.core.as_ref().unwrap()
        }

        fn core_mut(&mut self) -> &mut RendererCore {
            self.core.as_mut().unwrap()
        }

        fn supports_format(&self, _format: &Format) -> FormatSupport {
            FormatSupport::Handled
        }

        fn render(&mut self, _position_us: i64, _elapsed_realtime_us: i64) -> Result<()> {
            Ok(())
        }

        fn is_ready(&self) -> bool {
            true
        }

        fn is_ended(&self) -> bool {
            false
        }

        fn on_stream_changed(&mut self, _formats: &[Format], _offset_us: i64) -> Result<()> {
            self.stream_changes += 1;
            Ok(())
        }

        fn on_position_reset(&mut self, position_us: i64, _joining: bool) -> Result<()> {
            self.resets.push(position_us);
            Ok(())
        }

        fn on_disabled(&mut self) {
            self.disabled = true;
        }
    }

    fn stream(items: Vec<(ReadResult, Option<i64>)>) -> Box<dyn SampleStream> {
        Box::new(ScriptedStream(items.into()))
    }

    #[test]
    fn test_lifecycle() {
        let mut probe = Probe::new();
        assert_eq!(probe.state(), RendererState::Disabled);
        assert_eq!(probe.index(), 3);

        probe.enable(&[], stream(vec![]), 1_000, false, 0).unwrap();
        assert_eq!(probe.state(), RendererState::Enabled);
        assert_eq!(probe.stream_changes, 1);
        assert_eq!(probe.resets, vec![1_000]);

        probe.start().unwrap();
        assert_eq!(probe.state(), RendererState::Started);
        probe.stop().unwrap();
        probe.disable().unwrap();
        assert!(probe.disabled);
        assert!(!probe.core().has_stream());
    }

    #[test]
    fn test_illegal_transitions() {
        let mut probe = Probe::new();
        assert!(matches!(probe.start(), Err(PlaybackError::IllegalState(_))));
        assert!(matches!(probe.stop(), Err(PlaybackError::IllegalState(_))));
        assert!(matches!(probe.disable(), Err(PlaybackError::IllegalState(_))));

        probe.enable(&[], stream(vec![]), 0, false, 0).unwrap();
        assert!(matches!(
            probe.enable(&[], stream(vec![]), 0, false, 0),
            Err(PlaybackError::IllegalState(_))
        ));

        probe.start().unwrap();
        assert!(matches!(probe.disable(), Err(PlaybackError::IllegalState(_))));
    }

    #[test]
    fn test_read_source_applies_stream_offset() {
        let mut probe = Probe::new();
        let items = vec![
            (ReadResult::FormatRead, Some(100)),
            (ReadResult::BufferRead, Some(5)),
        ];
        probe.enable(&[], stream(items), 0, false, 1_000).unwrap();

        let mut holder = FormatHolder::default();
        let mut buffer = SubtitleInputBuffer::new();
        let core = probe.core_mut();
        assert_eq!(core.read_source(&mut holder, &mut buffer), ReadResult::FormatRead);
        assert_eq!(holder.format.as_ref().map(|f| f.subsample_offset_us), Some(1_100));
        assert_eq!(core.read_source(&mut holder, &mut buffer), ReadResult::BufferRead);
        assert_eq!(buffer.time_us, 1_005);
    }

    #[test]
    fn test_sample_relative_format_is_not_offset() {
        let core = RendererCore::new(0);
        let format = Format::text(mime::TEXT_VTT).with_subsample_offset_us(OFFSET_SAMPLE_RELATIVE);
        assert_eq!(core.offset_format(format).subsample_offset_us, OFFSET_SAMPLE_RELATIVE);
    }

    #[test]
    fn test_end_of_stream_only_when_final() {
        let mut probe = Probe::new();
        probe
            .enable(&[], stream(vec![(ReadResult::EndOfStream, None)]), 0, false, 0)
            .unwrap();

        let mut holder = FormatHolder::default();
        let mut buffer = SubtitleInputBuffer::new();
        assert_eq!(
            probe.core_mut().read_source(&mut holder, &mut buffer),
            ReadResult::NothingRead
        );
        assert!(probe.has_read_stream_to_end());
        assert!(!probe.core().is_source_ready());

        probe.set_current_stream_final();
        assert!(probe.core().is_source_ready());
        assert_eq!(
            probe.core_mut().read_source(&mut holder, &mut buffer),
            ReadResult::BufferRead
        );
        assert!(buffer.is_end_of_stream());
    }

    #[test]
    fn test_replace_final_stream_is_illegal() {
        let mut probe = Probe::new();
        probe.enable(&[], stream(vec![]), 0, false, 0).unwrap();
        probe.set_current_stream_final();
        assert!(probe.replace_stream(&[], stream(vec![]), 0).is_err());

        probe.reset_position(0).unwrap();
        assert!(!probe.is_current_stream_final());
        probe.replace_stream(&[], stream(vec![]), 0).unwrap();
        assert_eq!(probe.stream_changes, 2);
    }
}
