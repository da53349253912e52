//! Text track renderer
//!
//! Pumps subtitle samples from the source through a [`SubtitleDecoder`] and
//! pushes cue updates to the sink whenever playback crosses an event time.
//!
//! Each `render` tick:
//! 1. prefetches the next decoded subtitle (also while paused),
//! 2. returns early unless the renderer is started,
//! 3. advances past the event times of the current subtitle,
//! 4. promotes the next subtitle once its time is reached, or finishes on
//!    end of stream,
//! 5. emits the visible cues if anything changed,
//! 6. feeds the decoder from the source until it is starved.

use std::sync::Arc;

use crate::error::{DecoderError, PlaybackError, Result};
use crate::format::{mime, Format, FormatHolder};
use crate::renderer::{
    FormatSupport, ReadResult, Renderer, RendererCore, RendererState, TrackType,
};
use crate::text::buffer::{BufferFlags, SubtitleInputBuffer, SubtitleOutputBuffer};
use crate::text::cue::CueSet;
use crate::text::decoder::SubtitleDecoder;
use crate::text::factory::SubtitleDecoderFactory;
use crate::text::output::OutputDispatch;
use crate::text::subtitle::Subtitle;

/// Renders a text track to an [`OutputDispatch`].
pub struct TextRenderer {
    core: RendererCore,
    output: OutputDispatch,
    decoder_factory: Arc<dyn SubtitleDecoderFactory>,
    format_holder: FormatHolder,
    decoder: Option<Box<dyn SubtitleDecoder>>,
    input_stream_ended: bool,
    output_stream_ended: bool,
    next_input_buffer: Option<SubtitleInputBuffer>,
    subtitle: Option<SubtitleOutputBuffer>,
    next_subtitle: Option<SubtitleOutputBuffer>,
    /// Index of the next event time of `subtitle` that changes the cues
    next_subtitle_event_index: Option<usize>,
}

impl TextRenderer {
    pub fn new(
        index: usize,
        output: OutputDispatch,
        decoder_factory: Arc<dyn SubtitleDecoderFactory>,
    ) -> Self {
        Self {
            core: RendererCore::new(index),
            output,
            decoder_factory,
            format_holder: FormatHolder::default(),
            decoder: None,
            input_stream_ended: false,
            output_stream_ended: false,
            next_input_buffer: None,
            subtitle: None,
            next_subtitle: None,
            next_subtitle_event_index: None,
        }
    }

    /// Name of the current decoder, if any
    pub fn decoder_name(&self) -> Option<&str> {
        self.decoder.as_deref().map(|d| d.name())
    }

    fn fatal(&self, error: DecoderError) -> PlaybackError {
        tracing::error!(index = self.core.index(), error = %error, "subtitle decoder failed");
        PlaybackError::for_renderer(self.core.index(), error)
    }

    /// Time of the next cue change in the current subtitle. `None` when there
    /// is no subtitle or its events are exhausted.
    fn next_event_time(&self) -> Option<i64> {
        let subtitle = self.subtitle.as_ref()?;
        let index = self.next_subtitle_event_index?;
        (index < subtitle.event_time_count()).then(|| subtitle.event_time(index))
    }

    fn update_output(&mut self, cues: CueSet) {
        tracing::trace!(index = self.core.index(), cues = ?cues.texts(), "cue update");
        self.output.dispatch(cues);
    }

    fn clear_output(&mut self) {
        self.update_output(CueSet::empty());
    }

    fn reset_buffers(&mut self) {
        self.next_input_buffer = None;
        self.next_subtitle_event_index = None;
        if let Some(subtitle) = self.subtitle.take() {
            subtitle.release();
        }
        if let Some(next_subtitle) = self.next_subtitle.take() {
            next_subtitle.release();
        }
    }

    fn release_decoder(&mut self) {
        if let Some(mut decoder) = self.decoder.take() {
            decoder.release();
            tracing::debug!(index = self.core.index(), decoder = decoder.name(), "released decoder");
        }
    }

    /// Queue samples from the source until the source or the decoder's input
    /// pool runs dry.
    fn feed_decoder(&mut self) -> Result<()> {
        let index = self.core.index();
        let Some(decoder) = self.decoder.as_mut() else {
            return Err(PlaybackError::NoDecoder);
        };

        while !self.input_stream_ended {
            let mut buffer = match self.next_input_buffer.take() {
                Some(buffer) => buffer,
                None => match decoder
                    .dequeue_input_buffer()
                    .map_err(|e| PlaybackError::for_renderer(index, e))?
                {
                    Some(buffer) => buffer,
                    None => return Ok(()),
                },
            };

            match self.core.read_source(&mut self.format_holder, &mut buffer) {
                ReadResult::BufferRead => {
                    // Subtitles stay visible past their start, so late samples
                    // are still presented.
                    buffer.clear_flag(BufferFlags::DECODE_ONLY);
                    if buffer.is_end_of_stream() {
                        self.input_stream_ended = true;
                        tracing::debug!(index, "text input reached end of stream");
                    } else {
                        buffer.subsample_offset_us = self
                            .format_holder
                            .format
                            .as_ref()
                            .map_or(0, |f| f.subsample_offset_us);
                        buffer.flip();
                    }
                    decoder
                        .queue_input_buffer(buffer)
                        .map_err(|e| PlaybackError::for_renderer(index, e))?;
                }
                ReadResult::FormatRead => {
                    tracing::debug!(
                        index,
                        mime_type = self.format_holder.format.as_ref().map(|f| f.mime_type()),
                        "text format changed"
                    );
                    self.next_input_buffer = Some(buffer);
                }
                ReadResult::NothingRead | ReadResult::EndOfStream => {
                    self.next_input_buffer = Some(buffer);
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

impl Renderer for TextRenderer {
    fn track_type(&self) -> TrackType {
        TrackType::Text
    }

    fn core(&self) -> &RendererCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RendererCore {
        &mut self.core
    }

    fn supports_format(&self, format: &Format) -> FormatSupport {
        if self.decoder_factory.supports_format(format) {
            FormatSupport::Handled
        } else if mime::is_text(format.mime_type()) {
            FormatSupport::UnsupportedSubtype
        } else {
            FormatSupport::UnsupportedType
        }
    }

    fn on_stream_changed(&mut self, formats: &[Format], _offset_us: i64) -> Result<()> {
        let format = formats
            .first()
            .ok_or_else(|| PlaybackError::UnsupportedFormat("no formats".to_string()))?;

        if self.decoder.is_some() {
            self.release_decoder();
            self.next_input_buffer = None;
        }
        let decoder = self
            .decoder_factory
            .create_decoder(format)
            .map_err(|e| self.fatal(e))?;
        tracing::debug!(
            index = self.core.index(),
            decoder = decoder.name(),
            mime_type = format.mime_type(),
            "text stream changed"
        );
        self.decoder = Some(decoder);
        self.format_holder.format = Some(self.core.offset_format(format.clone()));
        Ok(())
    }

    fn on_position_reset(&mut self, position_us: i64, _joining: bool) -> Result<()> {
        tracing::debug!(index = self.core.index(), position_us, "text position reset");
        self.clear_output();
        self.reset_buffers();
        self.input_stream_ended = false;
        self.output_stream_ended = false;
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.flush();
        }
        Ok(())
    }

    fn on_disabled(&mut self) {
        self.clear_output();
        self.reset_buffers();
        self.release_decoder();
        self.format_holder.format = None;
    }

    fn render(&mut self, position_us: i64, _elapsed_realtime_us: i64) -> Result<()> {
        if self.output_stream_ended || self.state() == RendererState::Disabled {
            return Ok(());
        }

        if self.next_subtitle.is_none() {
            let decoder = self.decoder.as_mut().ok_or(PlaybackError::NoDecoder)?;
            decoder.set_position_us(position_us);
            let next = decoder.dequeue_output_buffer();
            self.next_subtitle = next.map_err(|e| self.fatal(e))?;
        }

        if self.state() != RendererState::Started {
            return Ok(());
        }

        let mut needs_update = false;
        while let Some(event_time_us) = self.next_event_time() {
            if event_time_us > position_us {
                break;
            }
            self.next_subtitle_event_index = self.next_subtitle_event_index.map(|i| i + 1);
            needs_update = true;
        }

        if let Some(next_subtitle) = self.next_subtitle.take() {
            if next_subtitle.is_end_of_stream() {
                if !needs_update && self.next_event_time().is_none() {
                    if let Some(subtitle) = self.subtitle.take() {
                        subtitle.release();
                    }
                    next_subtitle.release();
                    self.output_stream_ended = true;
                    tracing::debug!(index = self.core.index(), "text output reached end of stream");
                    return Ok(());
                }
                self.next_subtitle = Some(next_subtitle);
            } else if next_subtitle.time_us <= position_us {
                if let Some(subtitle) = self.subtitle.take() {
                    subtitle.release();
                }
                self.next_subtitle_event_index = next_subtitle.next_event_time_index(position_us);
                self.subtitle = Some(next_subtitle);
                needs_update = true;
            } else {
                self.next_subtitle = Some(next_subtitle);
            }
        }

        if needs_update {
            if let Some(cues) = self.subtitle.as_ref().map(|s| s.cues(position_us)) {
                self.update_output(cues);
            }
        }

        if self.input_stream_ended {
            return Ok(());
        }
        self.feed_decoder()
    }

    /// Subtitles never hold up playback.
    fn is_ready(&self) -> bool {
        true
    }

    fn is_ended(&self) -> bool {
        self.output_stream_ended
    }
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("core", &self.core)
            .field("decoder", &self.decoder_name())
            .field("input_stream_ended", &self.input_stream_ended)
            .field("output_stream_ended", &self.output_stream_ended)
            .field("next_subtitle_event_index", &self.next_subtitle_event_index)
            .finish()
    }
}
