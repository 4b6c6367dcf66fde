//! Digitization parameters and the snapshot stored with every output

use crate::calibration::CalibrationDescription;
use crate::channel::ChannelClass;
use crate::provenance::OffsetPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-class digitization parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassParameters {
    /// Electronics noise sigma (calibrated units)
    pub noise_sigma: f64,

    /// Digits with calibrated amplitude strictly below this are dropped
    pub threshold: f64,

    /// Give digits the time of their earliest contribution
    pub derive_time: bool,
}

impl ClassParameters {
    pub fn new(noise_sigma: f64, threshold: f64) -> Self {
        Self {
            noise_sigma,
            threshold,
            derive_time: true,
        }
    }

    /// Same parameters with time derivation switched off
    pub fn without_timing(mut self) -> Self {
        self.derive_time = false;
        self
    }
}

/// One class in the parameter snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSnapshot {
    #[serde(flatten)]
    pub class: ChannelClass,
    #[serde(flatten)]
    pub parameters: ClassParameters,
    /// Calibration in effect, as reported by the calibration itself
    pub calibration: CalibrationDescription,
}

/// Everything needed to reproduce or interpret a digitization output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    pub run_id: Uuid,
    pub output_name: String,
    pub created_at: DateTime<Utc>,
    pub noise_time: f64,
    pub seed: Option<u64>,
    pub provenance: OffsetPolicy,
    pub classes: Vec<ClassSnapshot>,
    pub inputs: Vec<String>,
}
