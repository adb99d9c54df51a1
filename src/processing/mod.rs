//! Per-channel signal processing: continuity correction, timeline
//! flattening and count-rate statistics.

pub mod continuity;
pub mod light_curve;
pub mod timeline;

pub use continuity::{correct, count_violations, CorrectionReport};
pub use light_curve::{IntervalHistogram, LightCurve, RateStatistics, INTERVAL_BIN_SECS};
pub use timeline::{build_timeline, events_from_decimal, reset_index, ChannelTimeline};
