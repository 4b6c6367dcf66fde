//! Contribution records and digits

use crate::channel::ChannelId;
use serde::{Deserialize, Serialize};

/// One input's deposit on one channel (a summable digit)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionRecord {
    /// Channel receiving the deposit
    pub channel: ChannelId,

    /// Deposited amplitude (raw units)
    pub amplitude: f64,

    /// Arrival time (seconds)
    pub time: f64,

    /// Particle that produced the deposit, numbered within its input
    pub origin_id: i64,

    /// Share of the deposit attributed to that particle
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl ContributionRecord {
    pub fn new(channel: ChannelId, amplitude: f64, time: f64, origin_id: i64) -> Self {
        Self {
            channel,
            amplitude,
            time,
            origin_id,
            weight: 1.0,
        }
    }
}

/// Particle provenance entry of a digit, with a session-wide unique origin id
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub origin_id: i64,
    pub weight: f64,
}

/// Detector digit: all contributions to one channel plus noise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digit {
    pub channel: ChannelId,

    /// Noise plus the sum of all contribution amplitudes (raw units)
    pub amplitude: f64,

    /// Earliest contribution time, or the noise time when there is none
    pub time: f64,

    /// Contributing particles in merge order
    pub provenance: Vec<Provenance>,

    /// Position in the final digit list, assigned by compaction
    pub list_index: Option<usize>,
}

impl Digit {
    /// A digit carrying only noise
    pub fn noise(channel: ChannelId, amplitude: f64, time: f64) -> Self {
        Self {
            channel,
            amplitude,
            time,
            provenance: Vec::new(),
            list_index: None,
        }
    }

    /// True when no particle contributed to this digit
    pub fn is_noise_only(&self) -> bool {
        self.provenance.is_empty()
    }
}
