//! Renderer test suite
//!
//! End-to-end tests for the text renderer:
//! - Cue timing against playback position
//! - Seeking, pausing and end of stream
//! - Stream and subsample offsets
//! - Decoder faults and lifecycle errors
//! - Posted delivery through a cue channel
