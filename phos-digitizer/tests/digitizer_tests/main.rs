//! Digitizer integration tests
//!
//! Drive [`DigitizationSession`](phos_digitizer::DigitizationSession)
//! end to end with fixed noise, checking the digit content the merge,
//! timing and threshold stages must produce.

mod helpers;

mod test_end_to_end;
mod test_event_failures;
mod test_merge_properties;
mod test_sqlite_sink;
