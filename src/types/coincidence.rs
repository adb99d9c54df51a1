//! Coincidence clusters produced by the scanning engine.

use super::clock::{ChannelId, Event};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A group of near-simultaneous detections from distinct channels.
///
/// Every channel appears at most once, so `size()` equals the number of
/// channels. The engine never emits a coincidence with fewer than two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coincidence {
    /// Earliest detection time in the cluster (seconds)
    pub start_time: f64,
    /// Latest minus earliest detection time (seconds, >= 0)
    pub span: f64,
    /// Channels that fired
    pub channels: BTreeSet<ChannelId>,
}

impl Coincidence {
    /// Cluster holding a single seed event.
    pub fn seed(event: Event) -> Self {
        Self {
            start_time: event.time,
            span: 0.0,
            channels: BTreeSet::from([event.channel]),
        }
    }

    pub fn size(&self) -> usize {
        self.channels.len()
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.span
    }

    pub fn has_channel(&self, channel: ChannelId) -> bool {
        self.channels.contains(&channel)
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.channels.is_disjoint(&other.channels)
    }

    /// True when the cluster shares at least one channel with `set`.
    pub fn touches_any(&self, set: &[ChannelId]) -> bool {
        set.iter().any(|c| self.channels.contains(c))
    }

    /// Absorb an event from a channel not yet in the cluster.
    pub(crate) fn absorb(&mut self, event: Event) {
        let end = self.end_time().max(event.time);
        self.start_time = self.start_time.min(event.time);
        self.span = end - self.start_time;
        self.channels.insert(event.channel);
    }

    /// Fold another (channel-disjoint) cluster into this one.
    pub(crate) fn merge(&mut self, other: &Self) {
        let end = self.end_time().max(other.end_time());
        self.start_time = self.start_time.min(other.start_time);
        self.span = end - self.start_time;
        self.channels.extend(other.channels.iter().copied());
    }

    /// Span this cluster would have after merging `other`.
    pub(crate) fn merged_span(&self, other: &Self) -> f64 {
        self.end_time().max(other.end_time()) - self.start_time.min(other.start_time)
    }
}

impl fmt::Display for Coincidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels: Vec<String> = self.channels.iter().map(ToString::to_string).collect();
        write!(
            f,
            "{}, {:.6}, {:.6}, [{}]",
            self.size(),
            self.start_time,
            self.span,
            channels.join(", ")
        )
    }
}
