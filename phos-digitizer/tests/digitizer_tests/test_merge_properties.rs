//! Test Suite 2: Conservation and time derivation across inputs

use super::helpers::*;
use phos_digitizer::{
    ClassParameters, DigitizerWarning, LinearCalibration, MemorySink, SessionBuilder,
};
use phos_digitizer::noise::FixedNoise;

#[tokio::test]
async fn test_amplitude_conserved_over_inputs() {
    let mut session = two_class_session(MemorySink::new());
    session.begin(&input_names(3)).await.unwrap();

    let a = vec![rec(1, 0.25, 1e-9, 0), rec(4, 2.0, 1e-9, 1)];
    let b = vec![rec(1, 0.5, 1e-9, 0), rec(5, 1.0, 1e-9, 1)];
    let c = vec![rec(4, 3.0, 1e-9, 0)];

    let event = session.digitize(0, &[&a, &b, &c]).unwrap();
    let total_in: f64 = [&a, &b, &c]
        .iter()
        .flat_map(|recs| recs.iter())
        .map(|r| r.amplitude)
        .sum();
    let total_out: f64 = event.digits.iter().map(|d| d.amplitude).sum();

    assert_eq!(total_out, total_in);
    assert_eq!(event.contributions, 5);
    assert_eq!(event.merged_channels, 6);
}

#[tokio::test]
async fn test_equal_split_sums_to_ten() {
    let mut session = SessionBuilder::new(OUTPUT)
        .channel_table(phos_digitizer::ChannelTable::from_counts(&[("EMC", 12)]).unwrap())
        .class("EMC", ClassParameters::new(0.0, 0.0), LinearCalibration::identity())
        .noise(FixedNoise(0.0))
        .sink(MemorySink::new())
        .build()
        .unwrap();
    session.begin(&input_names(2)).await.unwrap();

    let a = vec![rec(10, 5.0, 3e-9, 0)];
    let b = vec![rec(10, 5.0, 3e-9, 0)];
    let event = session.digitize(0, &[&a, &b]).unwrap();

    let digit = event.digits.iter().find(|d| d.channel == 10).unwrap();
    assert_eq!(digit.amplitude, 10.0);
    assert_eq!(digit.provenance.len(), 2);
}

#[tokio::test]
async fn test_earliest_arrival_wins() {
    let mut session = two_class_session(MemorySink::new());
    session.begin(&input_names(3)).await.unwrap();

    let a = vec![rec(2, 1.0, 7.0, 0)];
    let b = vec![rec(2, 1.0, 3.0, 0)];
    let c = vec![rec(2, 1.0, 9.0, 0)];
    let event = session.digitize(0, &[&a, &b, &c]).unwrap();

    assert_eq!(event.digits[0].channel, 2);
    assert_eq!(event.digits[0].time, 3.0);
}

#[tokio::test]
async fn test_arrivals_after_default_noise_time_still_win() {
    let config = phos_common::DigitizerConfig::default();
    assert_eq!(config.noise_time, 1.0);
    let mut session = SessionBuilder::from_config(&config)
        .unwrap()
        .sink(MemorySink::new())
        .build()
        .unwrap();

    // 1e7 raw = 1.0 calibrated, far above the EMC threshold
    let records = vec![rec(2, 1e7, 7.0, 0), rec(2, 1e7, 3.0, 1), rec(2, 1e7, 9.0, 2)];
    let event = session.digitize(0, &[&records]).unwrap();

    let digit = event.digits.iter().find(|d| d.channel == 2).unwrap();
    assert_eq!(digit.time, 3.0);
    assert_eq!(digit.provenance.len(), 3);
}

#[tokio::test]
async fn test_noise_only_digits_carry_noise_time() {
    let mut session = SessionBuilder::new(OUTPUT)
        .channel_table(two_class_table())
        .class("A", ClassParameters::new(0.01, 0.0), LinearCalibration::identity())
        .class("B", ClassParameters::new(0.01, 0.0), LinearCalibration::identity())
        .noise(FixedNoise(0.02))
        .noise_time(1.0)
        .sink(MemorySink::new())
        .build()
        .unwrap();
    session.begin(&input_names(1)).await.unwrap();

    let event = session.digitize(0, &[&[]]).unwrap();
    assert_eq!(channels(&event.digits), vec![1, 2, 3, 4, 5, 6]);
    assert!(event.digits.iter().all(|d| d.time == 1.0));
    assert!(event.digits.iter().all(|d| d.amplitude == 0.02));
    assert!(event.digits.iter().all(|d| d.provenance.is_empty()));
}

#[tokio::test]
async fn test_explicit_masks_offset_provenance() {
    let mut session = two_class_builder(0.0)
        .masks(vec![0, 5_000])
        .sink(MemorySink::new())
        .build()
        .unwrap();
    session.begin(&input_names(2)).await.unwrap();

    let a = vec![rec(2, 1.0, 1e-9, 3)];
    let b = vec![rec(2, 1.0, 1e-9, 3)];
    let event = session.digitize(0, &[&a, &b]).unwrap();

    let origins: Vec<_> = event.digits[0].provenance.iter().map(|p| p.origin_id).collect();
    assert_eq!(origins, vec![3, 5_003]);
    assert!(!event
        .warnings
        .iter()
        .any(|w| matches!(w, DigitizerWarning::ProvenanceOverflow { .. })));
}

#[tokio::test]
async fn test_seeded_gaussian_noise_reproducible() {
    let config = phos_common::DigitizerConfig {
        seed: Some(42),
        ..Default::default()
    };

    let mut first = SessionBuilder::from_config(&config)
        .unwrap()
        .sink(MemorySink::new())
        .build()
        .unwrap();
    let mut second = SessionBuilder::from_config(&config)
        .unwrap()
        .sink(MemorySink::new())
        .build()
        .unwrap();

    let records = vec![rec(100, 1e7, 1e-9, 0)];
    let a = first.digitize(0, &[&records]).unwrap();
    let b = second.digitize(0, &[&records]).unwrap();
    assert_eq!(a.digits, b.digits);
    assert!(a.digits.iter().any(|d| d.channel == 100));
}
