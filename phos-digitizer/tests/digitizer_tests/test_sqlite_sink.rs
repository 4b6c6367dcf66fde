//! Test Suite 5: Digits persisted through SQLite

use super::helpers::*;
use phos_digitizer::{CalibrationDescription, DigitSink, Error, SqliteSink};

#[tokio::test]
async fn test_event_round_trips_through_sqlite() {
    let sink = SqliteSink::in_memory().await.unwrap();
    let mut session = two_class_session(sink.clone());
    session.begin(&input_names(2)).await.unwrap();

    let a = vec![rec(2, 1.0, 2e-9, 7)];
    let b = vec![rec(2, 0.5, 1e-9, 9), rec(6, 0.5, 4e-9, 1)];
    assert!(session.process_event(0, &[&a, &b]).await.unwrap().is_stored());

    let digits = sink.load_event(OUTPUT, 0).await.unwrap();
    assert_eq!(channels(&digits), vec![2, 6]);
    assert_eq!(digits[0].amplitude, 1.5);
    assert_eq!(digits[0].time, 1e-9);
    assert_eq!(digits[0].list_index, Some(0));
    let origins: Vec<_> = digits[0].provenance.iter().map(|p| p.origin_id).collect();
    assert_eq!(origins, vec![7, 10_000_009]);
    assert_eq!(digits[1].list_index, Some(1));

    let parameters = sink.load_parameters(OUTPUT).await.unwrap().unwrap();
    assert_eq!(parameters.classes.len(), 2);
    assert_eq!(parameters.classes[1].parameters.threshold, 0.09);
    assert_eq!(
        parameters.classes[1].calibration,
        CalibrationDescription::Linear {
            pedestal: 0.0,
            slope: 1.0
        }
    );
    assert_eq!(sink.event_count(OUTPUT).await.unwrap(), 1);
}

#[tokio::test]
async fn test_sqlite_refuses_second_run_into_same_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("digits.db");

    {
        let sink = SqliteSink::open(&path).await.unwrap();
        let mut session = two_class_session(sink);
        session.begin(&input_names(1)).await.unwrap();
        session
            .process_event(0, &[&[rec(2, 1.0, 1e-9, 0)]])
            .await
            .unwrap();
    }

    let sink = SqliteSink::open(&path).await.unwrap();
    assert!(sink.output_exists(OUTPUT).await.unwrap());

    let mut session = two_class_session(sink.clone());
    let result = session.begin(&input_names(1)).await;
    assert!(matches!(result, Err(Error::DuplicateOutput(_))));

    // First run's digits are untouched
    assert_eq!(sink.load_event(OUTPUT, 0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_event_not_persisted() {
    let sink = SqliteSink::in_memory().await.unwrap();
    let mut session = two_class_session(sink.clone());
    session.begin(&input_names(1)).await.unwrap();

    let unsorted = vec![rec(4, 1.0, 1e-9, 0), rec(1, 1.0, 1e-9, 0)];
    assert!(!session.process_event(0, &[&unsorted]).await.unwrap().is_stored());

    assert_eq!(sink.event_count(OUTPUT).await.unwrap(), 0);
    assert!(sink.load_event(OUTPUT, 0).await.unwrap().is_empty());
}
