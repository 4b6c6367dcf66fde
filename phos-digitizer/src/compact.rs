//! Threshold suppression and list indexing
//!
//! After all classes are merged, digits whose calibrated amplitude is below
//! their class threshold are dropped. Survivors keep their order and get a
//! dense `list_index` from 0; the digit sink uses that index as the digit's
//! identity.

use crate::calibration::Calibration;
use crate::channel::{ChannelClass, ChannelId};
use crate::digit::Digit;
use crate::error::{Error, Result};

/// Threshold and calibration applied to one class
#[derive(Debug, Clone, Copy)]
pub struct ClassCut<'a> {
    pub class: &'a ChannelClass,

    /// Minimum calibrated amplitude a digit needs to survive
    pub threshold: f64,

    pub calibration: &'a dyn Calibration,
}

/// Drops sub-threshold digits and assigns dense list indices
#[derive(Debug, Clone)]
pub struct ThresholdCompactor<'a> {
    cuts: Vec<ClassCut<'a>>,
}

impl<'a> ThresholdCompactor<'a> {
    pub fn new(mut cuts: Vec<ClassCut<'a>>) -> Self {
        cuts.sort_by_key(|cut| cut.class.first);
        Self { cuts }
    }

    fn cut_for(&self, channel: ChannelId) -> Option<&ClassCut<'a>> {
        let idx = self.cuts.partition_point(|cut| cut.class.last < channel);
        self.cuts.get(idx).filter(|cut| cut.class.contains(channel))
    }

    /// True when `digit` passes its class threshold
    pub fn passes(&self, digit: &Digit) -> Result<bool> {
        let cut = self.cut_for(digit.channel).ok_or_else(|| {
            Error::Configuration(format!("no threshold for channel {}", digit.channel))
        })?;
        let energy = cut.calibration.calibrate(digit.amplitude);
        if !energy.is_finite() {
            return Err(Error::Configuration(format!(
                "calibration of {} gave {} for amplitude {} on channel {}",
                cut.class.name, energy, digit.amplitude, digit.channel
            )));
        }
        Ok(energy >= cut.threshold)
    }

    /// Drop sub-threshold digits and index the survivors
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when a digit's channel belongs to no class or
    /// its calibrated amplitude is not finite.
    pub fn compact(&self, digits: Vec<Digit>) -> Result<Vec<Digit>> {
        let mut survivors = Vec::with_capacity(digits.len());
        for digit in digits {
            if self.passes(&digit)? {
                survivors.push(digit);
            }
        }

        for (index, digit) in survivors.iter_mut().enumerate() {
            digit.list_index = Some(index);
        }

        Ok(survivors)
    }
}
