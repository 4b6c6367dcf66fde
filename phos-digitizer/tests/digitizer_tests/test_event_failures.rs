//! Test Suite 4: Event-scoped failures and session-fatal errors

use super::helpers::*;
use phos_digitizer::{
    Calibration, CalibrationDescription, ClassParameters, Error, EventOutcome, MemorySink,
};

/// Calibration whose energies are never usable
#[derive(Debug)]
struct NanCalibration;

impl Calibration for NanCalibration {
    fn calibrate(&self, _amplitude: f64) -> f64 {
        f64::NAN
    }

    fn digitize(&self, energy: f64) -> f64 {
        energy
    }

    fn describe(&self) -> CalibrationDescription {
        CalibrationDescription::Custom {
            name: "nan".to_string(),
        }
    }
}


#[tokio::test]
async fn test_unsorted_stream_fails_event_before_any_digit() {
    let sink = MemorySink::new();
    let mut session = two_class_session(sink.clone());
    session.begin(&input_names(1)).await.unwrap();

    let records = vec![rec(5, 1.0, 1e-9, 0), rec(3, 1.0, 1e-9, 1), rec(7, 1.0, 1e-9, 2)];
    match session.process_event(0, &[&records]).await.unwrap() {
        EventOutcome::Failed(failed) => {
            assert!(matches!(failed.error, Error::StreamOrdering { source_index: 0, .. }));
            assert!(failed.retained.is_empty());
        }
        EventOutcome::Stored(_) => panic!("unsorted stream was digitized"),
    }
    assert_eq!(sink.event(OUTPUT, 0).await, None);
}

#[tokio::test]
async fn test_channel_beyond_table_fails_event() {
    let sink = MemorySink::new();
    let mut session = two_class_session(sink.clone());
    session.begin(&input_names(1)).await.unwrap();

    let records = vec![rec(2, 1.0, 1e-9, 0), rec(9, 1.0, 1e-9, 1)];
    match session.process_event(0, &[&records]).await.unwrap() {
        EventOutcome::Failed(failed) => {
            assert!(failed.error.is_event_scoped());
            // Both classes were merged before the leftover was found
            assert_eq!(failed.retained.len(), 2);
        }
        EventOutcome::Stored(_) => panic!("out-of-range record was accepted"),
    }
    assert_eq!(sink.event_count(OUTPUT).await, 0);
}

#[tokio::test]
async fn test_compaction_failure_keeps_merged_classes() {
    let sink = MemorySink::new();
    let mut session = two_class_builder(0.0)
        .class("B", ClassParameters::new(0.01, 0.09), NanCalibration)
        .sink(sink.clone())
        .build()
        .unwrap();
    session.begin(&input_names(1)).await.unwrap();

    let records = vec![rec(2, 1.0, 1e-9, 0), rec(6, 1.0, 1e-9, 1)];
    match session.process_event(0, &[&records]).await.unwrap() {
        EventOutcome::Failed(failed) => {
            assert!(matches!(failed.error, Error::Configuration(_)));
            assert_eq!(failed.retained.len(), 2);
            assert_eq!(channels(&failed.retained[0].digits), vec![1, 2, 3, 4]);
            assert_eq!(channels(&failed.retained[1].digits), vec![5, 6]);
            assert_eq!(failed.retained[1].digits[1].amplitude, 1.0);
        }
        EventOutcome::Stored(_) => panic!("unusable calibration was accepted"),
    }
    assert_eq!(sink.event_count(OUTPUT).await, 0);
}

#[tokio::test]
async fn test_failed_event_leaves_earlier_events_stored() {
    let sink = MemorySink::new();
    let mut session = two_class_session(sink.clone());
    session.begin(&input_names(1)).await.unwrap();

    let good = vec![rec(2, 1.0, 1e-9, 0)];
    let bad = vec![rec(2, f64::NAN, 1e-9, 0)];

    assert!(session.process_event(0, &[&good]).await.unwrap().is_stored());
    let outcome = session.process_event(1, &[&bad]).await.unwrap();
    assert!(matches!(
        outcome,
        EventOutcome::Failed(ref f) if matches!(f.error, Error::InvalidRecord { .. })
    ));
    assert!(session.process_event(2, &[&good]).await.unwrap().is_stored());

    assert_eq!(sink.event_count(OUTPUT).await, 2);
    assert!(sink.event(OUTPUT, 1).await.is_none());
    assert_eq!(session.digits_in_run(), 2);
}

#[tokio::test]
async fn test_duplicate_output_refused() {
    let sink = MemorySink::new();
    let mut first = two_class_session(sink.clone());
    first.begin(&input_names(1)).await.unwrap();

    let mut second = two_class_session(sink.clone());
    let result = second.begin(&input_names(1)).await;
    assert!(matches!(result, Err(Error::DuplicateOutput(ref name)) if name == OUTPUT));

    // Same session cannot register twice either
    assert!(matches!(
        first.begin(&input_names(1)).await,
        Err(Error::DuplicateOutput(_))
    ));
}

#[tokio::test]
async fn test_input_count_mismatch_is_fatal() {
    let mut session = two_class_session(MemorySink::new());
    session.begin(&input_names(2)).await.unwrap();

    let result = session.process_event(0, &[&[]]).await;
    assert!(matches!(result, Err(Error::Configuration(_))));
}
