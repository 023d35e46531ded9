// Black-box coverage for Property P5 (success-rate convergence), spec §4.C8
// "Metadata update on execute", invariant I3.

use navbrain::model::{LearnedBy, PathMetadata};

#[test]
fn success_rate_converges_to_the_mean_of_recorded_outcomes() {
    let mut metadata = PathMetadata::new(LearnedBy::Vlm);
    let outcomes = [true, true, false, true, false, false, true];

    for outcome in outcomes {
        metadata.record_execution(outcome, 250.0);
    }

    let expected_mean =
        outcomes.iter().filter(|o| **o).count() as f64 / outcomes.len() as f64;
    assert!((metadata.success_rate - expected_mean).abs() < 1e-9);
    assert_eq!(metadata.usage_count, outcomes.len() as u64);
}

#[test]
fn all_successes_converge_to_one() {
    let mut metadata = PathMetadata::new(LearnedBy::Recorded);
    for _ in 0..5 {
        metadata.record_execution(true, 100.0);
    }
    assert!((metadata.success_rate - 1.0).abs() < 1e-9);
}

#[test]
fn average_duration_tracks_the_mean_too() {
    let mut metadata = PathMetadata::new(LearnedBy::Manual);
    metadata.record_execution(true, 100.0);
    metadata.record_execution(true, 300.0);
    assert!((metadata.average_duration_ms - 200.0).abs() < 1e-9);
}
