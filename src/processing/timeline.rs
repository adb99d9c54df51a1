//! Flattening corrected channels into one multi-channel event timeline.

use crate::types::{sort_events, ChannelId, ClockSample, ClockScale, Event};
use serde::Serialize;

/// Index of the first sample recorded after a device clock reset.
///
/// A reset shows up as a sample with `coarse == 0`; everything before it
/// belongs to an earlier counting session. Returns 0 when the clock never reset.
pub fn reset_index(samples: &[ClockSample]) -> usize {
    samples.iter().position(|s| s.coarse == 0).unwrap_or(0)
}

/// One channel's (corrected) samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelTimeline {
    pub channel: ChannelId,
    pub samples: Vec<ClockSample>,
}

impl ChannelTimeline {
    pub fn new(channel: ChannelId, samples: Vec<ClockSample>) -> Self {
        Self { channel, samples }
    }

    /// Drop samples that precede the device clock reset.
    pub fn since_reset(mut self) -> Self {
        let start = reset_index(&self.samples);
        self.samples.drain(..start);
        self
    }

    /// Real-valued times in seconds, shifted by `offset`.
    pub fn seconds(&self, scale: ClockScale, offset: f64) -> Vec<f64> {
        self.samples
            .iter()
            .map(|s| s.seconds(scale) + offset)
            .collect()
    }
}

fn offset_for(offsets: &[f64], channel: ChannelId) -> f64 {
    offsets.get(usize::from(channel)).copied().unwrap_or(0.0)
}

/// Merge all channels into a single time-ordered event list.
///
/// `offsets[c]` (seconds) is added to every time on channel `c`; channels
/// without an offset are left as-is.
pub fn build_timeline(channels: &[ChannelTimeline], offsets: &[f64], scale: ClockScale) -> Vec<Event> {
    let mut events: Vec<Event> = channels
        .iter()
        .flat_map(|ch| {
            let offset = offset_for(offsets, ch.channel);
            ch.samples
                .iter()
                .map(move |s| Event::new(s.seconds(scale) + offset, ch.channel))
        })
        .collect();
    sort_events(&mut events);
    events
}

/// Build a timeline from already-converted decimal series, one per channel.
///
/// The position of each series is its channel id.
pub fn events_from_decimal(times_by_channel: &[Vec<f64>], offsets: &[f64]) -> Vec<Event> {
    let mut events: Vec<Event> = times_by_channel
        .iter()
        .zip(0..)
        .flat_map(|(times, channel): (&Vec<f64>, ChannelId)| {
            let offset = offset_for(offsets, channel);
            times.iter().map(move |&t| Event::new(t + offset, channel))
        })
        .collect();
    sort_events(&mut events);
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_index_finds_first_zero() {
        let samples = vec![
            ClockSample::new(900, 1),
            ClockSample::new(901, 1),
            ClockSample::new(0, 7),
            ClockSample::new(1, 0),
        ];
        assert_eq!(reset_index(&samples), 2);
        assert_eq!(reset_index(&samples[3..]), 0);
        assert_eq!(reset_index(&[]), 0);
    }

    #[test]
    fn test_since_reset_trims_earlier_session() {
        let ch = ChannelTimeline::new(
            1,
            vec![ClockSample::new(50, 0), ClockSample::new(0, 3), ClockSample::new(2, 0)],
        )
        .since_reset();
        assert_eq!(ch.samples, vec![ClockSample::new(0, 3), ClockSample::new(2, 0)]);
    }

    #[test]
    fn test_build_timeline_applies_offsets_and_sorts() {
        let a = ChannelTimeline::new(0, vec![ClockSample::new(1, 0), ClockSample::new(3, 0)]);
        let b = ChannelTimeline::new(1, vec![ClockSample::new(1, 0)]);
        let c = ChannelTimeline::new(2, vec![ClockSample::new(1, 0)]);
        let events = build_timeline(&[a, b, c], &[0.0, 1.5], ClockScale::Lm555);

        let flat: Vec<(f64, ChannelId)> = events.iter().map(|e| (e.time, e.channel)).collect();
        assert_eq!(flat, vec![(1.0, 0), (1.0, 2), (2.5, 1), (3.0, 0)]);
    }

    #[test]
    fn test_events_from_decimal_uses_position_as_channel() {
        let events = events_from_decimal(&[vec![2.0, 0.5], vec![1.0]], &[]);
        let channels: Vec<ChannelId> = events.iter().map(|e| e.channel).collect();
        assert_eq!(channels, vec![0, 1, 0]);
        assert!((events[0].time - 0.5).abs() < 1e-12);
    }
}
