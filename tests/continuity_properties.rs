//! Continuity Correction Property Tests
//!
//! Seeded random recordings with late coarse latches, checked for the
//! guarantees a single correction pass gives.

use cosmic_timeline::processing::{correct, count_violations};
use cosmic_timeline::types::{ClockSample, ClockScale};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SCALE: ClockScale = ClockScale::Lm555;

/// Increasing detections with every few samples latching the previous second.
fn glitched_recording(seed: u64, len: usize) -> Vec<ClockSample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut t = 5.0_f64;
    let mut samples: Vec<ClockSample> = (0..len)
        .map(|_| {
            t += rng.gen_range(0.05..0.6);
            let coarse = t.floor();
            ClockSample::new(coarse as u32, ((t - coarse) * 255.0).floor() as u8)
        })
        .collect();

    let mut i = rng.gen_range(1..4);
    while i + 1 < len {
        samples[i].coarse -= 1;
        i += rng.gen_range(6..10);
    }
    samples
}

#[test]
fn ordered_recordings_pass_through() {
    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut t = 0.0_f64;
        let input: Vec<ClockSample> = (0..40)
            .map(|_| {
                t += rng.gen_range(0.01..2.0);
                let coarse = t.floor();
                ClockSample::new(coarse as u32, ((t - coarse) * 255.0).floor() as u8)
            })
            .collect();
        let report = correct(&input, SCALE);
        assert_eq!(report.samples, input, "seed {seed}");
        assert_eq!(report.repairs, 0);
        assert_eq!(report.residual_violations, 0);
    }
}

#[test]
fn only_coarse_values_are_rewritten() {
    for seed in 0..200 {
        let input = glitched_recording(seed, 40);
        let report = correct(&input, SCALE);
        assert_eq!(report.samples.len(), input.len());
        assert!(input.iter().zip(&report.samples).all(|(a, b)| a.fine == b.fine), "seed {seed}");
        let changed = input.iter().zip(&report.samples).filter(|(a, b)| a != b).count();
        assert!(changed <= report.repairs, "seed {seed}");
    }
}

#[test]
fn clean_pass_is_a_fixed_point() {
    let mut clean = 0;
    for seed in 0..200 {
        let first = correct(&glitched_recording(seed, 40), SCALE);
        assert_eq!(first.residual_violations, count_violations(&first.samples, SCALE));
        if first.residual_violations > 0 {
            continue;
        }
        clean += 1;
        let second = correct(&first.samples, SCALE);
        assert_eq!(second.repairs, 0, "seed {seed}");
        assert_eq!(second.samples, first.samples, "seed {seed}");
    }
    assert!(clean > 0, "no recording was fully repaired");
}
