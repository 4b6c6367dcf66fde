//! Test Suite 1: Full event through merge, timing, threshold and storage

use super::helpers::*;
use phos_digitizer::{EventOutcome, InputSource, MemorySink, RunInputs};

#[tokio::test]
async fn test_two_class_event() {
    let sink = MemorySink::new();
    let mut session = two_class_session(sink.clone());
    session.begin(&input_names(1)).await.unwrap();

    let records = vec![rec(2, 1.0, 2e-9, 7), rec(6, 0.5, 4e-9, 8)];
    let outcome = session.process_event(0, &[&records]).await.unwrap();
    assert!(outcome.is_stored());

    let digits = sink.event(OUTPUT, 0).await.unwrap();
    assert_eq!(channels(&digits), vec![2, 6]);
    assert_eq!(digits[0].amplitude, 1.0);
    assert_eq!(digits[0].list_index, Some(0));
    assert_eq!(digits[0].time, 2e-9);
    assert_eq!(digits[1].amplitude, 0.5);
    assert_eq!(digits[1].list_index, Some(1));
    assert_eq!(session.digits_in_run(), 2);
}

#[tokio::test]
async fn test_signal_and_background_mixed() {
    let sink = MemorySink::new();
    let mut session = two_class_session(sink.clone());

    let mut inputs = RunInputs::new(InputSource::new(
        "signal",
        vec![vec![rec(3, 0.4, 5e-9, 1)], vec![rec(1, 0.2, 1e-9, 2)]],
    ));
    inputs.mix_with(InputSource::new(
        "background",
        vec![vec![rec(3, 0.6, 2e-9, 1), rec(5, 0.3, 3e-9, 2)]],
    ));

    let summary = session.run(&inputs).await.unwrap();
    assert_eq!(summary.events, 2);
    assert_eq!(summary.stored, 2);
    assert!(summary.failed.is_empty());

    let first = sink.event(OUTPUT, 0).await.unwrap();
    assert_eq!(channels(&first), vec![3, 5]);
    assert_eq!(first[0].amplitude, 1.0);
    assert_eq!(first[0].time, 2e-9);
    let origins: Vec<_> = first[0].provenance.iter().map(|p| p.origin_id).collect();
    assert_eq!(origins, vec![1, 10_000_001]);

    // Background has only one event
    let second = sink.event(OUTPUT, 1).await.unwrap();
    assert_eq!(channels(&second), vec![1]);

    assert_eq!(summary.digits_in_run, 3);
    let stored = sink.output(OUTPUT).await.unwrap();
    assert_eq!(stored.parameters.inputs, vec!["signal", "background"]);
}

#[tokio::test]
async fn test_empty_event_stores_no_digits() {
    let sink = MemorySink::new();
    let mut session = two_class_session(sink.clone());
    session.begin(&input_names(2)).await.unwrap();

    match session.process_event(0, &[&[], &[]]).await.unwrap() {
        EventOutcome::Stored(summary) => {
            assert_eq!(summary.digits, 0);
            assert_eq!(summary.contributions, 0);
            // Both inputs are empty in both classes
            assert_eq!(summary.warnings.len(), 4);
        }
        EventOutcome::Failed(failed) => panic!("event failed: {}", failed.error),
    }
    assert_eq!(sink.event(OUTPUT, 0).await, Some(vec![]));
}

#[tokio::test]
async fn test_timing_disabled_class_keeps_noise_time() {
    let sink = MemorySink::new();
    let mut session = two_class_builder(0.0)
        .class(
            "B",
            phos_digitizer::ClassParameters::new(0.01, 0.09).without_timing(),
            phos_digitizer::LinearCalibration::identity(),
        )
        .noise_time(1.0)
        .sink(sink.clone())
        .build()
        .unwrap();
    session.begin(&input_names(1)).await.unwrap();

    let records = vec![rec(2, 1.0, 2e-9, 0), rec(6, 0.5, 4e-9, 1)];
    session.process_event(0, &[&records]).await.unwrap();

    let digits = sink.event(OUTPUT, 0).await.unwrap();
    assert_eq!(digits[0].time, 2e-9);
    assert_eq!(digits[1].time, 1.0);
}
