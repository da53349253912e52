//! Source-to-presentation timestamp translation
//!
//! A `TimestampAdjuster` anchors the first sample it sees to a presentation
//! time and shifts every later sample by the same offset. Timestamps carried
//! in MPEG-TS are 33-bit 90 kHz values that wrap roughly every 26.5 hours; each
//! sample is placed in whichever wrap period puts it closest to its
//! predecessor.

/// One past the largest 33-bit PTS value.
pub const MAX_PTS_PLUS_ONE: i64 = 1 << 33;

/// The 33-bit wrap period expressed in microseconds.
pub const PTS_WRAP_US: i64 = MAX_PTS_PLUS_ONE * 1_000_000 / 90_000;

/// Convert a 90 kHz timestamp to microseconds.
pub fn pts_to_us(pts: i64) -> i64 {
    pts * 1_000_000 / 90_000
}

/// Convert microseconds to a 90 kHz timestamp.
pub fn us_to_pts(us: i64) -> i64 {
    us * 90_000 / 1_000_000
}

/// Translates source timestamps into the presentation clock.
///
/// Single-threaded per instance; share it through
/// [`TimestampAdjusterProvider`](super::TimestampAdjusterProvider).
#[derive(Debug, Clone)]
pub struct TimestampAdjuster {
    /// Presentation time assigned to the first sample
    first_presentation_time_us: i64,
    /// Source timestamp of the first sample, once seen
    first_sample_timestamp_us: Option<i64>,
    /// Last source timestamp, with wraps applied
    last_source_timestamp_us: Option<i64>,
    /// Last value returned
    last_adjusted_timestamp_us: Option<i64>,
    /// Offset added to unwrapped source timestamps
    offset_us: i64,
}

impl TimestampAdjuster {
    /// Anchor value that disables offsetting: timestamps pass through
    /// unchanged, apart from wrap correction.
    pub const DO_NOT_OFFSET: i64 = i64::MAX;

    /// Create an adjuster that maps the first sample onto `first_presentation_time_us`.
    pub fn new(first_presentation_time_us: i64) -> Self {
        Self {
            first_presentation_time_us,
            first_sample_timestamp_us: None,
            last_source_timestamp_us: None,
            last_adjusted_timestamp_us: None,
            offset_us: 0,
        }
    }

    /// The anchor this adjuster was created with.
    pub fn first_presentation_time_us(&self) -> i64 {
        self.first_presentation_time_us
    }

    /// Source timestamp of the first sample, if any sample was adjusted yet.
    pub fn first_sample_timestamp_us(&self) -> Option<i64> {
        self.first_sample_timestamp_us
    }

    /// The most recently returned presentation timestamp.
    pub fn last_adjusted_timestamp_us(&self) -> Option<i64> {
        self.last_adjusted_timestamp_us
    }

    /// Offset applied to unwrapped source timestamps, once known.
    pub fn timestamp_offset_us(&self) -> Option<i64> {
        self.first_sample_timestamp_us.map(|_| self.offset_us)
    }

    /// Whether the first sample has been seen.
    pub fn is_initialized(&self) -> bool {
        self.first_sample_timestamp_us.is_some()
    }

    /// Forget every processed sample. The anchor is kept, so the next sample
    /// re-establishes the offset against it.
    pub fn reset(&mut self) {
        self.first_sample_timestamp_us = None;
        self.last_source_timestamp_us = None;
        self.last_adjusted_timestamp_us = None;
        self.offset_us = 0;
    }

    /// Adjust a 90 kHz MPEG-TS timestamp, returning microseconds.
    pub fn adjust_ts_timestamp(&mut self, pts: i64) -> i64 {
        let pts = match self.last_source_timestamp_us {
            Some(last_us) => closest_in_wrap(pts, us_to_pts(last_us), MAX_PTS_PLUS_ONE),
            None => pts,
        };
        self.adjust_unwrapped(pts_to_us(pts))
    }

    /// Adjust a sample timestamp in microseconds.
    pub fn adjust_sample_timestamp(&mut self, time_us: i64) -> i64 {
        let time_us = match self.last_source_timestamp_us {
            Some(last_us) => closest_in_wrap(time_us, last_us, PTS_WRAP_US),
            None => time_us,
        };
        self.adjust_unwrapped(time_us)
    }

    fn adjust_unwrapped(&mut self, time_us: i64) -> i64 {
        if self.first_sample_timestamp_us.is_none() {
            self.first_sample_timestamp_us = Some(time_us);
            self.offset_us = if self.first_presentation_time_us == Self::DO_NOT_OFFSET {
                0
            } else {
                self.first_presentation_time_us.saturating_sub(time_us)
            };
            tracing::debug!(
                first_sample_us = time_us,
                offset_us = self.offset_us,
                "timestamp adjuster initialized"
            );
        }

        if let Some(last) = self.last_source_timestamp_us {
            if time_us.div_euclid(PTS_WRAP_US) != last.div_euclid(PTS_WRAP_US) {
                tracing::debug!(
                    last_us = last,
                    time_us,
                    "timestamp crossed a wrap boundary"
                );
            }
        }
        self.last_source_timestamp_us = Some(time_us);
        let adjusted = time_us.saturating_add(self.offset_us);
        self.last_adjusted_timestamp_us = Some(adjusted);
        adjusted
    }
}

/// Shift `value` by whole `period`s so it lands closest to `last`, choosing
/// between the wrap period of `last` and the one below it.
fn closest_in_wrap(value: i64, last: i64, period: i64) -> i64 {
    let value = value.rem_euclid(period);
    let closest_wraps = last.saturating_add(period / 2).div_euclid(period);
    let above = value.saturating_add(closest_wraps.saturating_mul(period));
    let below = above.saturating_sub(period);
    if below.abs_diff(last) < above.abs_diff(last) {
        below
    } else {
        above
    }
}
