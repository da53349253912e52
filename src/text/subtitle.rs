//! Decoded subtitles
//!
//! A [`Subtitle`] is a time-queryable set of cues with a strictly increasing
//! list of event times: the instants at which the visible cue set may change.

use std::fmt;

use crate::text::cue::{Cue, CueSet};

/// A decoded, time-indexed subtitle.
pub trait Subtitle: Send + fmt::Debug {
    /// Index of the first event time strictly after `time_us`, or `None` if
    /// every event is at or before `time_us`.
    fn next_event_time_index(&self, time_us: i64) -> Option<usize>;

    /// Number of event times.
    fn event_time_count(&self) -> usize;

    /// The event time at `index`. `index` must be below
    /// [`event_time_count`](Self::event_time_count).
    fn event_time(&self, index: usize) -> i64;

    /// The cues visible at `time_us`.
    fn cues(&self, time_us: i64) -> CueSet;
}

/// A cue with its display interval
#[derive(Debug, Clone, PartialEq)]
pub struct TimedCue {
    pub start_us: i64,
    /// Exclusive end; `None` keeps the cue visible indefinitely
    pub end_us: Option<i64>,
    pub cue: Cue,
}

impl TimedCue {
    pub fn new(start_us: i64, end_us: i64, cue: Cue) -> Self {
        Self {
            start_us,
            end_us: Some(end_us),
            cue,
        }
    }

    pub fn open_ended(start_us: i64, cue: Cue) -> Self {
        Self {
            start_us,
            end_us: None,
            cue,
        }
    }

    fn is_visible_at(&self, time_us: i64) -> bool {
        self.start_us <= time_us && self.end_us.map_or(true, |end| time_us < end)
    }
}

/// A [`Subtitle`] over a list of independently timed cues.
///
/// Event times are the distinct start and end times of all cues. Cues are
/// reported in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TimedCueSubtitle {
    cues: Vec<TimedCue>,
    event_times: Vec<i64>,
}

impl TimedCueSubtitle {
    pub fn new(cues: Vec<TimedCue>) -> Self {
        let (cues, empty): (Vec<_>, Vec<_>) = cues
            .into_iter()
            .partition(|c| c.end_us.map_or(true, |end| end > c.start_us));
        if !empty.is_empty() {
            tracing::warn!(dropped = empty.len(), "dropping cues with empty display interval");
        }

        let mut event_times: Vec<i64> = cues
            .iter()
            .flat_map(|c| std::iter::once(c.start_us).chain(c.end_us))
            .collect();
        event_times.sort_unstable();
        event_times.dedup();

        Self { cues, event_times }
    }

    pub fn event_times(&self) -> &[i64] {
        &self.event_times
    }
}

impl Subtitle for TimedCueSubtitle {
    fn next_event_time_index(&self, time_us: i64) -> Option<usize> {
        let index = self.event_times.partition_point(|&t| t <= time_us);
        (index < self.event_times.len()).then_some(index)
    }

    fn event_time_count(&self) -> usize {
        self.event_times.len()
    }

    fn event_time(&self, index: usize) -> i64 {
        self.event_times[index]
    }

    fn cues(&self, time_us: i64) -> CueSet {
        let visible: Vec<Cue> = self
            .cues
            .iter()
            .filter(|c| c.is_visible_at(time_us))
            .map(|c| c.cue.clone())
            .collect();
        CueSet::new(visible)
    }
}
