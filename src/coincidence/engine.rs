//! Widening-window coincidence scan.
//!
//! Starting from a tolerance of zero ticks, each pass widens the window by
//! one tick and runs three steps over the state left by the previous pass:
//!
//! 1. extend existing clusters with leftover events from new channels;
//! 2. merge neighbouring clusters with disjoint channel sets;
//! 3. greedily cluster the remaining leftover events.
//!
//! Tight coincidences therefore form first and are never broken up by a
//! wider window; wider windows only add to them.

use crate::types::{sort_events, ClockScale, Coincidence, Event};
use tracing::{debug, info};

/// Added to every tolerance to absorb floating-point noise in `fine / scale`.
pub const WINDOW_EPSILON: f64 = 1e-4;

/// Real tolerance (seconds) of window step `window_step`.
pub fn tolerance(window_step: u32, scale: ClockScale) -> f64 {
    scale.ticks_to_seconds(f64::from(window_step)) + WINDOW_EPSILON
}

/// Clusters found so far plus the events none of them claimed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanState {
    pub clusters: Vec<Coincidence>,
    /// Unclaimed events in timeline order
    pub leftover: Vec<Event>,
}

impl ScanState {
    pub fn new(mut events: Vec<Event>) -> Self {
        sort_events(&mut events);
        Self {
            clusters: Vec::new(),
            leftover: events,
        }
    }

    /// A pass can only change anything with at least two work items.
    fn has_work(&self) -> bool {
        self.clusters.len() + self.leftover.len() >= 2
    }
}

/// Let each cluster absorb leftover events that fall within `tol` of both its ends.
fn extend_clusters(mut clusters: Vec<Coincidence>, leftover: Vec<Event>, tol: f64) -> (Vec<Coincidence>, Vec<Event>) {
    let mut consumed = vec![false; leftover.len()];

    for cluster in &mut clusters {
        let first = leftover.partition_point(|e| e.time < cluster.end_time() - tol);
        for (i, event) in leftover.iter().enumerate().skip(first) {
            if event.time - cluster.start_time > tol {
                break;
            }
            if consumed[i]
                || cluster.has_channel(event.channel)
                || cluster.end_time() - event.time > tol
            {
                continue;
            }
            cluster.absorb(*event);
            consumed[i] = true;
        }
    }

    let leftover = leftover
        .into_iter()
        .zip(consumed)
        .filter_map(|(event, used)| (!used).then_some(event))
        .collect();
    (clusters, leftover)
}

/// Fold neighbouring clusters together when the result still fits in `tol`.
fn merge_clusters(mut clusters: Vec<Coincidence>, tol: f64) -> Vec<Coincidence> {
    clusters.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let mut merged: Vec<Coincidence> = Vec::with_capacity(clusters.len());
    let mut rest = clusters.into_iter();
    let Some(mut group) = rest.next() else {
        return merged;
    };

    for cluster in rest {
        if cluster.start_time - group.start_time <= tol
            && group.is_disjoint(&cluster)
            && group.merged_span(&cluster) <= tol
        {
            group.merge(&cluster);
        } else {
            merged.push(std::mem::replace(&mut group, cluster));
        }
    }
    merged.push(group);
    merged
}

/// Greedy clustering of leftover events; singletons go back to the pool.
fn cluster_leftovers(leftover: Vec<Event>, tol: f64) -> (Vec<Coincidence>, Vec<Event>) {
    let mut fresh = Vec::new();
    let mut unclaimed = Vec::new();
    let mut current: Option<(Coincidence, Event)> = None;

    let mut close = |cluster: Coincidence, seed: Event| {
        if cluster.size() > 1 {
            fresh.push(cluster);
        } else {
            unclaimed.push(seed);
        }
    };

    for event in leftover {
        current = match current {
            Some((mut cluster, seed))
                if !cluster.has_channel(event.channel) && event.time - cluster.start_time <= tol =>
            {
                cluster.absorb(event);
                Some((cluster, seed))
            }
            Some((cluster, seed)) => {
                close(cluster, seed);
                Some((Coincidence::seed(event), event))
            }
            None => Some((Coincidence::seed(event), event)),
        };
    }
    if let Some((cluster, seed)) = current {
        close(cluster, seed);
    }

    (fresh, unclaimed)
}

/// One widening pass at tolerance `tol`.
pub fn widen(state: ScanState, tol: f64) -> ScanState {
    let (clusters, leftover) = extend_clusters(state.clusters, state.leftover, tol);
    let mut clusters = merge_clusters(clusters, tol);
    let (fresh, leftover) = cluster_leftovers(leftover, tol);
    clusters.extend(fresh);
    ScanState { clusters, leftover }
}

/// Find coincidences among `events`, widening the window up to `max_window_steps` ticks.
///
/// The result is ordered by start time; clusters starting together keep the
/// order in which they were found.
pub fn scan(events: &[Event], max_window_steps: u32, scale: ClockScale) -> Vec<Coincidence> {
    let mut state = ScanState::new(events.to_vec());
    let mut passes = 0u32;

    for window_step in 0..=max_window_steps {
        if !state.has_work() {
            break;
        }
        let tol = tolerance(window_step, scale);
        state = widen(state, tol);
        passes += 1;
        debug!(
            window_step,
            tolerance = tol,
            clusters = state.clusters.len(),
            leftover = state.leftover.len(),
            "Coincidence pass complete"
        );
    }

    let mut clusters = state.clusters;
    clusters.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    info!(
        events = events.len(),
        coincidences = clusters.len(),
        passes,
        unmatched = state.leftover.len(),
        "Coincidence scan finished"
    );
    clusters
}
