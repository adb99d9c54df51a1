//! Analysis Pipeline
//!
//! ```text
//! per channel (parallel, rayon):
//!   raw lines → decode → reconcile GPS references → trim to last reset
//!             → continuity correction → light curve / interval histogram
//! whole run (sequential):
//!   flatten channels + offsets → coincidence scan → perimeter cut
//! ```
//!
//! Channels never share state until the timeline is built, so the per-channel
//! stage runs on the rayon pool. The coincidence scan depends on the result of
//! every previous pass and stays on the calling thread.

use crate::acquisition::{decode_stream, DecodeError};
use crate::coincidence::{exclude_perimeter, scan};
use crate::config::RunConfig;
use crate::processing::{
    build_timeline, correct, reset_index, ChannelTimeline, CorrectionReport, IntervalHistogram,
    LightCurve,
};
use crate::reference::{resolve, ReferenceRanking};
use crate::types::{ChannelId, Coincidence};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("run has {given} channel inputs but run.channel_count is {expected}")]
    ChannelCountMismatch { given: usize, expected: usize },

    #[error("channel {channel} is outside 0..{channel_count}")]
    UnknownChannel { channel: ChannelId, channel_count: u16 },

    #[error("channel {0} was supplied more than once")]
    DuplicateChannel(ChannelId),
}

/// Raw records of one channel, as read by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInput {
    pub channel: ChannelId,
    pub lines: Vec<String>,
}

impl ChannelInput {
    pub fn new(channel: ChannelId, lines: Vec<String>) -> Self {
        Self { channel, lines }
    }
}

/// Everything learned about one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelReport {
    pub channel: ChannelId,
    /// Lines that could not be decoded
    pub decode_errors: Vec<DecodeError>,
    /// Samples whose fine counter overran the second
    pub rollovers: usize,
    pub references: ReferenceRanking,
    /// Samples dropped because they precede the last clock reset
    pub trimmed: usize,
    pub correction: CorrectionReport,
    pub light_curve: LightCurve,
    pub intervals: IntervalHistogram,
}

impl ChannelReport {
    pub fn timeline(&self) -> ChannelTimeline {
        ChannelTimeline::new(self.channel, self.correction.samples.clone())
    }
}

/// Result of a whole multi-channel run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Per-channel reports, ordered by channel id
    pub channels: Vec<ChannelReport>,
    /// Events on the merged timeline
    pub events: usize,
    pub coincidences: Vec<Coincidence>,
    /// Coincidences left after the perimeter cut, when a perimeter is configured
    pub interior: Option<Vec<Coincidence>>,
}

/// Decode, reconcile, trim and correct one channel.
pub fn analyze_channel<S: AsRef<str>>(channel: ChannelId, lines: &[S], config: &RunConfig) -> ChannelReport {
    let scale = config.scale();
    let stream = decode_stream(lines);
    let rollovers = stream.rollovers(scale);
    if rollovers > 0 {
        warn!(channel, rollovers, "Fine counter overran the second on some samples");
    }

    let references = resolve(&stream.references);

    let trimmed = reset_index(&stream.samples);
    let timeline = ChannelTimeline::new(channel, stream.samples).since_reset();
    let correction = correct(&timeline.samples, scale);

    let times: Vec<f64> = correction.samples.iter().map(|s| s.seconds(scale)).collect();
    let dead_time = config.dead_time_secs();
    let light_curve = LightCurve::build(&times, config.light_curve.bin_duration_secs, dead_time);
    let intervals = IntervalHistogram::build(&times, dead_time, config.light_curve.max_interval_secs);

    info!(
        channel,
        samples = correction.samples.len(),
        malformed = stream.errors.len(),
        trimmed,
        repairs = correction.repairs,
        residual_violations = correction.residual_violations,
        "Channel analysed"
    );

    ChannelReport {
        channel,
        decode_errors: stream.errors,
        rollovers,
        references,
        trimmed,
        correction,
        light_curve,
        intervals,
    }
}

fn check_inputs(inputs: &[ChannelInput], config: &RunConfig) -> Result<(), PipelineError> {
    let expected = usize::from(config.run.channel_count);
    if inputs.len() != expected {
        return Err(PipelineError::ChannelCountMismatch {
            given: inputs.len(),
            expected,
        });
    }
    let mut seen = HashSet::new();
    for input in inputs {
        if input.channel >= config.run.channel_count {
            return Err(PipelineError::UnknownChannel {
                channel: input.channel,
                channel_count: config.run.channel_count,
            });
        }
        if !seen.insert(input.channel) {
            return Err(PipelineError::DuplicateChannel(input.channel));
        }
    }
    Ok(())
}

/// Analyse every channel in parallel, then scan the merged timeline.
pub fn analyze_run(inputs: &[ChannelInput], config: &RunConfig) -> Result<RunReport, PipelineError> {
    check_inputs(inputs, config)?;
    let started = Instant::now();
    let scale = config.scale();

    let mut channels: Vec<ChannelReport> = inputs
        .par_iter()
        .map(|input| analyze_channel(input.channel, &input.lines, config))
        .collect();
    channels.sort_by_key(|c| c.channel);

    let timelines: Vec<ChannelTimeline> = channels.iter().map(ChannelReport::timeline).collect();
    let events = build_timeline(&timelines, &config.channels.offsets_secs, scale);
    let coincidences = scan(&events, config.run.max_window_steps, scale);

    let interior = (!config.channels.perimeter.is_empty())
        .then(|| exclude_perimeter(&coincidences, &config.channels.perimeter));

    info!(
        channels = channels.len(),
        events = events.len(),
        coincidences = coincidences.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Run analysed"
    );

    Ok(RunReport {
        channels,
        events: events.len(),
        coincidences,
        interior,
    })
}
