//! Presentation clock reconciliation for segmented streams
//!
//! - Wrap-aware translation of source timestamps (`adjuster`)
//! - One shared adjuster per discontinuity sequence (`provider`)

pub mod adjuster;
pub mod provider;

pub use adjuster::{pts_to_us, us_to_pts, TimestampAdjuster, MAX_PTS_PLUS_ONE, PTS_WRAP_US};
pub use provider::{SharedTimestampAdjuster, TimestampAdjusterProvider};
