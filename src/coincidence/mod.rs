//! Coincidence detection across telescope channels.
//!
//! [`engine::scan`] finds clusters of near-simultaneous detections on the
//! merged event timeline. [`exclude_perimeter`] applies the anti-coincidence
//! cut: showers that touched a perimeter telescope may have entered from the
//! side of the array and are dropped.

pub mod engine;

pub use engine::{scan, tolerance, widen, ScanState, WINDOW_EPSILON};

use crate::types::{ChannelId, Coincidence};

/// Keep only coincidences that involve none of the `perimeter` channels.
pub fn exclude_perimeter(coincidences: &[Coincidence], perimeter: &[ChannelId]) -> Vec<Coincidence> {
    let kept: Vec<Coincidence> = coincidences
        .iter()
        .filter(|c| !c.touches_any(perimeter))
        .cloned()
        .collect();
    tracing::info!(
        total = coincidences.len(),
        kept = kept.len(),
        perimeter = ?perimeter,
        "Applied perimeter anti-coincidence cut"
    );
    kept
}
