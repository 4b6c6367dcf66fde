//! Test helpers for digitizer integration tests

use phos_digitizer::{
    ChannelId, ChannelTable, ClassParameters, ContributionRecord, DigitSink, DigitizationSession,
    LinearCalibration, SessionBuilder,
};
use phos_digitizer::noise::FixedNoise;

pub const OUTPUT: &str = "Default";

/// Class A: channels 1..=4, class B: channels 5..=6
pub fn two_class_table() -> ChannelTable {
    ChannelTable::from_counts(&[("A", 4), ("B", 2)]).unwrap()
}

/// Two-class builder with noise fixed at `noise`, identity calibration,
/// thresholds 0.01 (A) and 0.09 (B)
pub fn two_class_builder(noise: f64) -> SessionBuilder {
    SessionBuilder::new(OUTPUT)
        .channel_table(two_class_table())
        .class("A", ClassParameters::new(0.01, 0.01), LinearCalibration::identity())
        .class("B", ClassParameters::new(0.01, 0.09), LinearCalibration::identity())
        .noise(FixedNoise(noise))
}

/// Two-class session writing into `sink`
pub fn two_class_session(sink: impl DigitSink + 'static) -> DigitizationSession {
    two_class_builder(0.0).sink(sink).build().unwrap()
}

/// Shorthand for a contribution record
pub fn rec(channel: ChannelId, amplitude: f64, time: f64, origin_id: i64) -> ContributionRecord {
    ContributionRecord::new(channel, amplitude, time, origin_id)
}

/// Names for `n` inputs
pub fn input_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("input-{}", i)).collect()
}

/// Channels of a digit list, in list order
pub fn channels(digits: &[phos_digitizer::Digit]) -> Vec<ChannelId> {
    digits.iter().map(|d| d.channel).collect()
}
