//! Continuity correction for a single channel's clock samples.
//!
//! The counting board's coarse seconds counter and its fine tick counter are
//! latched separately, so a detection landing on a second boundary sometimes
//! gets the previous (or next) second's coarse value. That shows up as a
//! one-sample dip in an otherwise increasing sequence.
//!
//! One forward pass looks at each window `(i, i+1, i+2)` with lookahead `i+3`
//! and repairs the dip by borrowing the coarse value of an adjacent sample.
//! Windows where the lookahead is itself out of order are left alone: guessing
//! there risks rewriting good data. Whatever is still out of order after the
//! pass is counted, not fixed.
//!
//! The pass is not idempotent in general. Borrowing the predecessor's second
//! for a dip at `i+2` can leave a new backward step between `i+1` and `i+2`,
//! which a later pass sees from window `i-1` and repairs. Only when a pass
//! leaves no residual violations is its output a fixed point.

use crate::types::{ClockSample, ClockScale};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Result of one correction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorrectionReport {
    /// Corrected samples (same length and order as the input)
    pub samples: Vec<ClockSample>,
    /// Samples whose coarse value was changed
    pub repairs: usize,
    /// Adjacent pairs still out of order after the pass
    pub residual_violations: usize,
    /// Window start indices with a dip that could not be safely resolved
    pub deferred: Vec<usize>,
}

impl fmt::Display for CorrectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} repairs, {} residual violations",
            self.repairs, self.residual_violations
        )
    }
}

/// Borrow `coarse` into `samples[index]`; returns whether anything changed.
fn borrow_coarse(samples: &mut [ClockSample], index: usize, coarse: u32) -> bool {
    if samples[index].coarse == coarse {
        return false;
    }
    debug!(
        index,
        from = samples[index].coarse,
        to = coarse,
        "Repairing coarse time"
    );
    samples[index].coarse = coarse;
    true
}

/// Count adjacent pairs where the later sample reads earlier.
pub fn count_violations(samples: &[ClockSample], scale: ClockScale) -> usize {
    samples
        .windows(2)
        .filter(|pair| pair[1].seconds(scale) < pair[0].seconds(scale))
        .count()
}

/// Run the single-pass continuity correction.
pub fn correct(samples: &[ClockSample], scale: ClockScale) -> CorrectionReport {
    let mut out = samples.to_vec();
    let mut repairs = 0usize;
    let mut deferred = Vec::new();

    for i in 0..out.len().saturating_sub(3) {
        let a = out[i].seconds(scale);
        let b = out[i + 1].seconds(scale);
        let c = out[i + 2].seconds(scale);
        let d = out[i + 3].seconds(scale);

        if a < b && c < b {
            // Dip at i+2
            if d < c {
                deferred.push(i);
                continue;
            }
            let target_b = a + (d - a) / 3.0;
            let target_c = a + 2.0 * (d - a) / 3.0;
            let diff_b = b - target_b;
            let diff_c = target_c - c;

            if diff_c > diff_b {
                let coarse = out[i + 3].coarse;
                repairs += usize::from(borrow_coarse(&mut out, i + 2, coarse));
            } else if diff_b > diff_c {
                let coarse = out[i].coarse;
                repairs += usize::from(borrow_coarse(&mut out, i + 1, coarse));
            }
        } else if b < a && c > b {
            // Dip at i+1
            let coarse = if out[i].coarse > out[i + 1].coarse && out[i].fine < out[i + 1].fine {
                out[i].coarse
            } else {
                out[i + 2].coarse
            };
            repairs += usize::from(borrow_coarse(&mut out, i + 1, coarse));
        }
    }

    let residual_violations = count_violations(&out, scale);
    if repairs > 0 || residual_violations > 0 || !deferred.is_empty() {
        info!(
            samples = out.len(),
            repairs,
            residual_violations,
            deferred = deferred.len(),
            "Continuity correction finished"
        );
    }

    CorrectionReport {
        samples: out,
        repairs,
        residual_violations,
        deferred,
    }
}
