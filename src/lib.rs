//! Cosmic Timeline: cosmic-ray telescope timestamp analysis
//!
//! Turns the raw hexadecimal detector timestamps of a multi-telescope array
//! into a corrected, time-ordered event timeline and finds coincidences
//! (near-simultaneous detections on distinct telescopes).
//!
//! ## Architecture
//!
//! - **Acquisition**: hex record decoding, GPS reference sentence detection
//! - **Reference**: GPS start-time reconciliation and ranking
//! - **Processing**: continuity correction, timeline flattening, light curves
//! - **Coincidence**: widening-window coincidence scan and perimeter cut
//! - **Pipeline**: per-channel parallel analysis and whole-run orchestration

pub mod acquisition;
pub mod coincidence;
pub mod config;
pub mod pipeline;
pub mod processing;
pub mod reference;
pub mod types;

// Re-export run configuration
pub use config::{ConfigError, RunConfig};

// Re-export commonly used types
pub use types::{
    ChannelId, ClockSample, ClockScale, Coincidence, Event, RankedStartTime, ReferenceCandidate,
    ResolvedStartTime,
};

// Re-export the main entry points
pub use acquisition::{decode_stream, DecodeError, DecodedStream};
pub use coincidence::{exclude_perimeter, scan};
pub use pipeline::{analyze_channel, analyze_run, ChannelInput, ChannelReport, PipelineError, RunReport};
pub use processing::{build_timeline, correct, CorrectionReport};
pub use reference::{resolve, ReconcileError, ReferenceRanking};
