//! Subtitle decoder contract and a pooled synchronous implementation

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use crate::config::DecoderConfig;
use crate::error::DecoderError;
use crate::text::buffer::{
    BufferFlags, OutputBufferOwner, SubtitleInputBuffer, SubtitleOutputBuffer,
};
use crate::text::subtitle::Subtitle;

/// Buffer-in, buffer-out subtitle transcoder.
///
/// Every method must return promptly. `None` from a dequeue means nothing is
/// available right now and the caller should try again on its next tick.
pub trait SubtitleDecoder: Send {
    /// Decoder name, for logging
    fn name(&self) -> &str;

    /// Advise the decoder of the playback position.
    fn set_position_us(&mut self, position_us: i64);

    /// Take an empty input buffer to fill.
    fn dequeue_input_buffer(&mut self) -> Result<Option<SubtitleInputBuffer>, DecoderError>;

    /// Hand back a filled (or end-of-stream) input buffer.
    fn queue_input_buffer(&mut self, buffer: SubtitleInputBuffer) -> Result<(), DecoderError>;

    /// Take the next decoded subtitle, in presentation order.
    fn dequeue_output_buffer(&mut self) -> Result<Option<SubtitleOutputBuffer>, DecoderError>;

    /// Drop all in-flight work. Any input buffer currently held by the caller
    /// is forfeited and replaced.
    fn flush(&mut self);

    /// Tear the decoder down.
    fn release(&mut self);
}

/// Format-specific hook used by [`SimpleSubtitleDecoder`].
pub trait SubtitleParser: Send {
    /// Parse one sample. `reset` is set for the first sample after a flush.
    fn parse(&mut self, data: &[u8], reset: bool) -> Result<Box<dyn Subtitle>, DecoderError>;
}

impl<F> SubtitleParser for F
where
    F: FnMut(&[u8], bool) -> Result<Box<dyn Subtitle>, DecoderError> + Send,
{
    fn parse(&mut self, data: &[u8], reset: bool) -> Result<Box<dyn Subtitle>, DecoderError> {
        self(data, reset)
    }
}

/// Fewest output buffers a decoder runs with
pub const MIN_OUTPUT_BUFFERS: usize = 2;

/// Pool of idle output buffers, shared with every buffer it hands out.
struct OutputPool {
    buffers: Mutex<Vec<SubtitleOutputBuffer>>,
}

impl OutputBufferOwner for OutputPool {
    fn release_output_buffer(&self, buffer: SubtitleOutputBuffer) {
        self.buffers.lock().push(buffer);
    }
}

/// A [`SubtitleDecoder`] that decodes one queued sample per output request.
///
/// Buffers come from fixed-size pools. When every output buffer is held by
/// the caller, `dequeue_output_buffer` returns `None` until one is released.
pub struct SimpleSubtitleDecoder<P> {
    name: String,
    parser: P,
    input_buffer_count: usize,
    available_inputs: Vec<SubtitleInputBuffer>,
    queued_inputs: VecDeque<SubtitleInputBuffer>,
    input_dequeued: bool,
    outputs: Arc<OutputPool>,
    reset_pending: bool,
    position_us: i64,
    error: Option<String>,
    released: bool,
}

impl<P: SubtitleParser> SimpleSubtitleDecoder<P> {
    /// The renderer holds the current subtitle while it waits for the next
    /// one, so at least two output buffers are allocated.
    pub fn new(name: &str, parser: P, config: &DecoderConfig) -> Self {
        let input_buffer_count = config.input_buffer_count.max(1);
        let output_buffer_count = config.output_buffer_count.max(MIN_OUTPUT_BUFFERS);

        Self {
            name: name.to_string(),
            parser,
            input_buffer_count,
            available_inputs: (0..input_buffer_count)
                .map(|_| SubtitleInputBuffer::new())
                .collect(),
            queued_inputs: VecDeque::with_capacity(input_buffer_count),
            input_dequeued: false,
            outputs: Arc::new(OutputPool {
                buffers: Mutex::new(
                    (0..output_buffer_count)
                        .map(|_| SubtitleOutputBuffer::new())
                        .collect(),
                ),
            }),
            reset_pending: false,
            position_us: 0,
            error: None,
            released: false,
        }
    }

    /// Last position passed to `set_position_us`
    pub fn position_us(&self) -> i64 {
        self.position_us
    }

    /// Number of samples queued but not yet decoded
    pub fn pending_input_count(&self) -> usize {
        self.queued_inputs.len()
    }

    fn check_usable(&self) -> Result<(), DecoderError> {
        if self.released {
            return Err(DecoderError::Released);
        }
        match &self.error {
            Some(message) => Err(DecoderError::Decode(message.clone())),
            None => Ok(()),
        }
    }

    fn recycle_input(&mut self, mut buffer: SubtitleInputBuffer) {
        buffer.clear();
        self.available_inputs.push(buffer);
    }

    /// Decode one queued sample into `output`. Returns `false` when the
    /// output should be recycled instead of handed out.
    fn decode(
        &mut self,
        input: &SubtitleInputBuffer,
        output: &mut SubtitleOutputBuffer,
    ) -> Result<bool, DecoderError> {
        if input.is_end_of_stream() {
            output.set_end_of_stream();
            return Ok(true);
        }

        let reset = std::mem::take(&mut self.reset_pending);
        let subtitle = self.parser.parse(input.payload(), reset)?;
        output.set_content(input.time_us, subtitle, input.subsample_offset_us);
        if input.is_decode_only() {
            output.add_flag(BufferFlags::DECODE_ONLY);
            return Ok(false);
        }
        Ok(true)
    }
}

impl<P: SubtitleParser> SubtitleDecoder for SimpleSubtitleDecoder<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_position_us(&mut self, position_us: i64) {
        self.position_us = position_us;
    }

    fn dequeue_input_buffer(&mut self) -> Result<Option<SubtitleInputBuffer>, DecoderError> {
        self.check_usable()?;
        if self.input_dequeued {
            return Err(DecoderError::IllegalState(
                "an input buffer is already dequeued".to_string(),
            ));
        }

        let buffer = self.available_inputs.pop();
        self.input_dequeued = buffer.is_some();
        Ok(buffer)
    }

    fn queue_input_buffer(&mut self, buffer: SubtitleInputBuffer) -> Result<(), DecoderError> {
        self.check_usable()?;
        if !self.input_dequeued {
            return Err(DecoderError::IllegalState(
                "queued an input buffer that was not dequeued".to_string(),
            ));
        }

        self.input_dequeued = false;
        tracing::trace!(
            decoder = %self.name,
            time_us = buffer.time_us,
            end_of_stream = buffer.is_end_of_stream(),
            "queued subtitle sample"
        );
        self.queued_inputs.push_back(buffer);
        Ok(())
    }

    fn dequeue_output_buffer(&mut self) -> Result<Option<SubtitleOutputBuffer>, DecoderError> {
        self.check_usable()?;

        while !self.queued_inputs.is_empty() {
            let Some(mut output) = self.outputs.buffers.lock().pop() else {
                return Ok(None);
            };
            let Some(input) = self.queued_inputs.pop_front() else {
                break;
            };

            let decoded = self.decode(&input, &mut output);
            self.recycle_input(input);

            match decoded {
                Ok(true) => {
                    let owner: Weak<OutputPool> = Arc::downgrade(&self.outputs);
                    output.set_owner(owner);
                    return Ok(Some(output));
                }
                Ok(false) => {
                    tracing::trace!(decoder = %self.name, "skipped decode-only subtitle");
                    output.clear();
                    self.outputs.release_output_buffer(output);
                }
                Err(e) => {
                    output.clear();
                    self.outputs.release_output_buffer(output);
                    tracing::warn!(decoder = %self.name, error = %e, "subtitle decode failed");
                    self.error = Some(e.to_string());
                    return Err(e);
                }
            }
        }
        Ok(None)
    }

    fn flush(&mut self) {
        if self.released {
            return;
        }
        while let Some(buffer) = self.queued_inputs.pop_front() {
            self.recycle_input(buffer);
        }
        if self.input_dequeued {
            self.available_inputs.push(SubtitleInputBuffer::new());
            self.input_dequeued = false;
        }
        debug_assert_eq!(self.available_inputs.len(), self.input_buffer_count);
        self.reset_pending = true;
        tracing::debug!(decoder = %self.name, "flushed subtitle decoder");
    }

    fn release(&mut self) {
        self.released = true;
        self.available_inputs.clear();
        self.queued_inputs.clear();
        self.outputs.buffers.lock().clear();
        tracing::debug!(decoder = %self.name, "released subtitle decoder");
    }
}
