//! Count-rate light curve and inter-arrival interval histogram for one channel.
//!
//! Bins with fewer than a quarter of the mean count are treated as dead
//! periods (telescope unplugged, cable fault) and excluded from the rate
//! statistics.

use serde::Serialize;
use statrs::statistics::Statistics;

/// Width of one interval-histogram bin: one crystal-board tick.
pub const INTERVAL_BIN_SECS: f64 = 1.0 / 244.1;

/// Summary statistics over the live bins of a light curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateStatistics {
    /// Live bins times bin duration (s)
    pub observation_secs: f64,
    /// Detections in live bins
    pub total_counts: u64,
    /// Detections per second of live time
    pub count_rate: f64,
    /// Dead-time-corrected rate; `None` when the detector is saturated
    pub true_rate: Option<f64>,
    /// Mean count over all full bins
    pub mean: f64,
    /// Mean count over live bins
    pub adjusted_mean: f64,
    /// Sample standard deviation of live bin counts
    pub std_dev: f64,
    pub live_bins: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightCurve {
    pub bin_duration: f64,
    /// Counts per full bin; bin `k` covers `[k·d, (k+1)·d)`
    pub counts: Vec<u64>,
    /// `None` when there is not a single full bin
    pub stats: Option<RateStatistics>,
}

impl LightCurve {
    /// Bin detection times (seconds from the channel origin).
    ///
    /// Only full bins are kept: a trailing partial bin would understate the rate.
    pub fn build(times: &[f64], bin_duration: f64, dead_time: f64) -> Self {
        let max_time = times.iter().copied().fold(0.0_f64, f64::max);
        let n_bins = if bin_duration > 0.0 {
            (max_time / bin_duration).floor() as usize
        } else {
            0
        };

        let mut counts = vec![0u64; n_bins];
        for &t in times {
            if t < 0.0 {
                continue;
            }
            let k = (t / bin_duration).floor() as usize;
            if let Some(slot) = counts.get_mut(k) {
                *slot += 1;
            }
        }

        let stats = rate_statistics(&counts, bin_duration, dead_time);
        Self {
            bin_duration,
            counts,
            stats,
        }
    }

    /// Bin duration that lets an `n_bins`-point spectrum resolve `target_hz`
    /// exactly.
    ///
    /// The binned span must be a whole number of target periods, fewer than
    /// `n_bins` of them, and shorter than the observation. The largest such
    /// span wins. `None` when not even one period fits.
    pub fn bin_duration_for_frequency(
        target_hz: f64,
        observation_secs: f64,
        n_bins: usize,
    ) -> Option<f64> {
        if !(target_hz > 0.0 && observation_secs > 0.0) || n_bins < 2 {
            return None;
        }
        let period = 1.0 / target_hz;
        // Largest k with k·period strictly below the observation
        let fitting = ((observation_secs / period).ceil() as usize).saturating_sub(1);
        let periods = fitting.min(n_bins - 1);
        (periods > 0).then(|| periods as f64 * period / n_bins as f64)
    }

    /// True when any full bin is empty (worth flagging next to the statistics).
    pub fn has_empty_bins(&self) -> bool {
        self.counts.iter().any(|&c| c == 0)
    }
}

fn rate_statistics(counts: &[u64], bin_duration: f64, dead_time: f64) -> Option<RateStatistics> {
    if counts.is_empty() {
        return None;
    }
    let all: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    let mean = all.iter().mean();
    let live: Vec<f64> = all.iter().copied().filter(|&c| c > mean / 4.0).collect();
    if live.is_empty() {
        return None;
    }

    let total_counts = live.iter().sum::<f64>() as u64;
    let observation_secs = bin_duration * live.len() as f64;
    let count_rate = total_counts as f64 / observation_secs;
    let denominator = 1.0 - count_rate * dead_time;
    let true_rate = (denominator > 0.0).then(|| count_rate / denominator);
    let std_dev = if live.len() > 1 { live.iter().std_dev() } else { 0.0 };

    Some(RateStatistics {
        observation_secs,
        total_counts,
        count_rate,
        true_rate,
        mean,
        adjusted_mean: total_counts as f64 / live.len() as f64,
        std_dev,
        live_bins: live.len(),
    })
}

/// Histogram of dead-time-adjusted gaps between consecutive detections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalHistogram {
    /// Counts per `INTERVAL_BIN_SECS` bin; bin `k` covers `(k·w, (k+1)·w]`
    pub counts: Vec<u64>,
    /// Intervals shorter than the dead time (timing faults), not binned
    pub negative: usize,
}

impl IntervalHistogram {
    pub fn build(times: &[f64], dead_time: f64, max_interval: f64) -> Self {
        let n_bins = (max_interval / INTERVAL_BIN_SECS).floor().max(0.0) as usize;
        let mut counts = vec![0u64; n_bins];
        let mut negative = 0usize;

        for pair in times.windows(2) {
            let interval = pair[1] - pair[0] - dead_time;
            if interval < 0.0 {
                negative += 1;
                continue;
            }
            // Upper-inclusive bins; a zero interval falls below the first bin
            let k = (interval / INTERVAL_BIN_SECS).ceil() as i64 - 1;
            if let Some(slot) = usize::try_from(k).ok().and_then(|k| counts.get_mut(k)) {
                *slot += 1;
            }
        }

        if negative > 0 {
            tracing::debug!(negative, "Negative intervals excluded from histogram");
        }

        Self { counts, negative }
    }

    /// Upper edge of each bin in seconds.
    pub fn bin_edges(&self) -> Vec<f64> {
        (1..=self.counts.len())
            .map(|k| k as f64 * INTERVAL_BIN_SECS)
            .collect()
    }
}
