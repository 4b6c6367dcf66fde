//! # PHOS Digitizer Library (phos-digitizer)
//!
//! Turns summable digits (per-channel energy contributions from simulated
//! particles) into detector digits.
//!
//! **Pipeline:** every channel is seeded with electronics noise, the
//! contributions of all mixed inputs (signal plus any number of background
//! events) are merged in channel order, each digit gets the arrival time of
//! its earliest contribution, and channels under their class threshold are
//! dropped before the surviving digits are indexed and stored.
//!
//! Collaborators (channel table, noise sampler, calibration, digit sink) are
//! injected into [`DigitizationSession`] through its builder.

pub mod calibration;
pub mod channel;
pub mod compact;
pub mod digit;
pub mod error;
pub mod input;
pub mod merge;
pub mod noise;
pub mod params;
pub mod provenance;
pub mod session;
pub mod sink;
pub mod stream;

pub use calibration::{Calibration, CalibrationDescription, LinearCalibration};
pub use channel::{ChannelClass, ChannelId, ChannelTable};
pub use digit::{ContributionRecord, Digit, Provenance};
pub use error::{DigitizerWarning, Error, Result};
pub use input::{InputSource, RunInputs};
pub use params::{ClassParameters, ParameterSnapshot};
pub use session::{
    DigitizationSession, DigitizedEvent, EventOutcome, EventSummary, FailedEvent, RunSummary,
    SessionBuilder,
};
pub use sink::{DigitSink, MemorySink, SqliteSink};
