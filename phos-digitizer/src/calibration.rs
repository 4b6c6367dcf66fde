//! Amplitude calibration
//!
//! Digits accumulate amplitudes in raw (ADC-like) units. Thresholds are in
//! calibrated energy, so the compactor converts each amplitude through the
//! class [`Calibration`] before comparing. Noise is drawn in energy and goes
//! the other way, through [`Calibration::digitize`].

use serde::{Deserialize, Serialize};

/// Monotonic conversion between raw amplitude and calibrated energy
pub trait Calibration: Send + Sync + std::fmt::Debug {
    /// Raw amplitude to calibrated energy
    fn calibrate(&self, amplitude: f64) -> f64;

    /// Calibrated energy to raw amplitude
    fn digitize(&self, energy: f64) -> f64;

    /// Stable description stored in the parameter snapshot
    fn describe(&self) -> CalibrationDescription;
}

/// Serializable record of the calibration a class used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum CalibrationDescription {
    Linear { pedestal: f64, slope: f64 },

    /// Calibrations outside this crate, by name
    Custom { name: String },
}

/// `energy = (amplitude - pedestal) / slope`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearCalibration {
    pub pedestal: f64,
    pub slope: f64,
}

impl LinearCalibration {
    pub fn new(pedestal: f64, slope: f64) -> Self {
        Self { pedestal, slope }
    }

    /// Raw units equal calibrated units
    pub fn identity() -> Self {
        Self {
            pedestal: 0.0,
            slope: 1.0,
        }
    }
}

impl Calibration for LinearCalibration {
    fn calibrate(&self, amplitude: f64) -> f64 {
        (amplitude - self.pedestal) / self.slope
    }

    fn digitize(&self, energy: f64) -> f64 {
        self.pedestal + energy * self.slope
    }

    fn describe(&self) -> CalibrationDescription {
        CalibrationDescription::Linear {
            pedestal: self.pedestal,
            slope: self.slope,
        }
    }
}
