//! Coincidence Engine Property Tests
//!
//! Runs the scan over seeded random timelines and checks the structural
//! guarantees every result must satisfy, plus the fixed scenarios the engine
//! is calibrated against.

use cosmic_timeline::coincidence::{scan, tolerance};
use cosmic_timeline::types::{sort_events, ChannelId, ClockScale, Coincidence, Event};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SCALE: ClockScale = ClockScale::Lm555;

/// Random timeline: background singles plus a few injected showers.
fn random_timeline(seed: u64, channels: ChannelId, singles: usize, showers: usize) -> Vec<Event> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut events = Vec::with_capacity(singles + showers * usize::from(channels));

    for _ in 0..singles {
        events.push(Event::new(rng.gen_range(0.0..600.0), rng.gen_range(0..channels)));
    }
    for _ in 0..showers {
        let t0: f64 = rng.gen_range(0.0..600.0);
        for ch in 0..channels {
            if rng.gen_bool(0.7) {
                events.push(Event::new(t0 + rng.gen_range(0.0..0.03), ch));
            }
        }
    }
    sort_events(&mut events);
    events
}

/// Every cluster of `small` is contained in some cluster of `large` starting no later.
fn is_refined_by(small: &[Coincidence], large: &[Coincidence]) -> bool {
    small.iter().all(|s| {
        large
            .iter()
            .any(|l| s.channels.is_subset(&l.channels) && l.start_time <= s.start_time + 1e-12)
    })
}

// ============================================================================
// Structural Properties
// ============================================================================

#[test]
fn clusters_never_repeat_a_channel_or_stand_alone() {
    for seed in 0..20 {
        let events = random_timeline(seed, 4, 400, 30);
        for c in scan(&events, 20, SCALE) {
            assert!(c.size() >= 2, "seed {seed}: singleton {c}");
            assert_eq!(c.size(), c.channels.len());
            assert!(c.span >= 0.0);
            assert!(c.span <= tolerance(20, SCALE) + 1e-9, "seed {seed}: span too wide {c}");
        }
    }
}

#[test]
fn every_event_is_used_at_most_once() {
    for seed in 0..10 {
        let events = random_timeline(seed, 3, 300, 20);
        let found = scan(&events, 15, SCALE);
        let claimed: usize = found.iter().map(Coincidence::size).sum();
        assert!(claimed <= events.len());
    }
}

#[test]
fn output_is_ordered_by_start_time() {
    let events = random_timeline(7, 5, 500, 40);
    let found = scan(&events, 25, SCALE);
    assert!(found.windows(2).all(|w| w[0].start_time <= w[1].start_time));
}

#[test]
fn wider_window_only_grows_clusters() {
    for seed in 0..10 {
        let events = random_timeline(seed, 4, 300, 25);
        let narrow = scan(&events, 5, SCALE);
        let wide = scan(&events, 15, SCALE);
        assert!(is_refined_by(&narrow, &wide), "seed {seed}");
    }
}

#[test]
fn scan_is_deterministic() {
    let events = random_timeline(99, 4, 200, 10);
    assert_eq!(scan(&events, 12, SCALE), scan(&events, 12, SCALE));
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn three_telescope_shower() {
    let events = vec![Event::new(1.00, 0), Event::new(1.02, 1), Event::new(1.03, 2)];
    // 13 ticks at 255/s covers 0.05 s
    let found = scan(&events, 13, SCALE);
    assert_eq!(found.len(), 1);
    let c = &found[0];
    assert_eq!(c.size(), 3);
    assert!((c.start_time - 1.00).abs() < 1e-9);
    assert!((c.span - 0.03).abs() < 1e-9);
    assert_eq!(c.channels.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[test]
fn separated_events_never_coincide_within_their_gap() {
    // 0.2 s apart = 51 ticks
    let events = vec![Event::new(10.0, 0), Event::new(10.2, 1)];
    for window in [0, 1, 10, 50] {
        assert!(scan(&events, window, SCALE).is_empty(), "window {window}");
    }
    assert_eq!(scan(&events, 52, SCALE).len(), 1);
}

#[test]
fn one_channel_never_coincides() {
    let events: Vec<Event> = (0..50).map(|i| Event::new(f64::from(i) * 0.001, 2)).collect();
    assert!(scan(&events, 100, SCALE).is_empty());
}

#[test]
fn tight_pair_is_not_absorbed_by_later_neighbour() {
    // 0 and 1 coincide at once; channel 0 again 20 ms later must stay out
    let events = vec![Event::new(5.000, 0), Event::new(5.000, 1), Event::new(5.020, 0)];
    let found = scan(&events, 10, SCALE);
    assert_eq!(found.len(), 1);
    assert!(found[0].span.abs() < 1e-12);
}

#[test]
fn crystal_scale_changes_tolerance() {
    // 0.0041 s: one tick at 244.1/s plus noise, just over one tick at 255/s
    let events = vec![Event::new(3.0, 0), Event::new(3.0041, 1)];
    assert_eq!(scan(&events, 1, ClockScale::Crystal).len(), 1);
    assert!(scan(&events, 1, ClockScale::Lm555).is_empty());
}
