//! Digit merge engine
//!
//! Builds one digit per channel of a class by merging the noise seed with
//! every input's contributions.
//!
//! # Algorithm
//!
//! Channels are visited in ascending order. Each channel is first seeded
//! with a noise digit (amplitude from the class noise, time = noise time),
//! so channels without signal need no second pass. The inputs are merged
//! k-way: a min-heap keyed by `(next channel, stream position)` yields the
//! next channel carrying signal. When the visited channel reaches it, every
//! stream positioned there is drained completely (several records per
//! input are allowed), in stream order:
//!
//! - the origin id is remapped into the input's offset space,
//! - the amplitude is added to the digit,
//! - `(remapped id, weight)` is appended to the provenance,
//! - the arrival time is collected.
//!
//! The digit time is then the earliest collected arrival. The noise time only
//! stays on channels without any contribution. Streams never move backwards, so the heap is
//! touched once per (stream, channel) pair instead of rescanning every
//! stream for every channel.

use crate::calibration::Calibration;
use crate::channel::{ChannelClass, ChannelId};
use crate::digit::{Digit, Provenance};
use crate::error::{DigitizerWarning, Error, Result};
use crate::noise::NoiseSampler;
use crate::params::ClassParameters;
use crate::provenance::ProvenanceRemapper;
use crate::stream::ContributionStream;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::{debug, trace};

/// Digits of one merged class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMerge {
    /// Class name
    pub class: String,

    /// One digit per channel, ascending
    pub digits: Vec<Digit>,

    /// Recoverable conditions met while merging
    pub warnings: Vec<DigitizerWarning>,

    /// Contribution records folded into digits
    pub contributions: usize,
}

/// Earliest arrival among `arrivals`; `noise_time` when there is none
///
/// The noise time never competes with real arrivals, whatever its value.
pub fn front_edge_time(noise_time: f64, arrivals: &[f64]) -> f64 {
    arrivals
        .iter()
        .copied()
        .reduce(f64::min)
        .unwrap_or(noise_time)
}

/// Merges noise and contribution streams into digits, one class at a time
#[derive(Debug, Clone, Copy)]
pub struct DigitMergeEngine<'r> {
    remapper: &'r ProvenanceRemapper,
    noise_time: f64,
}

impl<'r> DigitMergeEngine<'r> {
    pub fn new(remapper: &'r ProvenanceRemapper, noise_time: f64) -> Self {
        Self {
            remapper,
            noise_time,
        }
    }

    pub fn noise_time(&self) -> f64 {
        self.noise_time
    }

    /// Merge every stream's records for `class` into one digit per channel
    ///
    /// Streams are left positioned after the class. Classes must be merged
    /// in ascending channel order with the same streams.
    ///
    /// # Errors
    ///
    /// - [`Error::StreamOrdering`] when a stream still holds records below the
    ///   class range (checked before any digit is built)
    /// - [`Error::MergeInvariant`] if the signal tracking loses a channel
    /// - [`Error::Configuration`] if an input has no provenance offset
    pub fn merge_class(
        &self,
        class: &ChannelClass,
        params: &ClassParameters,
        calibration: &dyn Calibration,
        noise: &mut dyn NoiseSampler,
        streams: &mut [ContributionStream<'_>],
    ) -> Result<ClassMerge> {
        for stream in streams.iter() {
            if let Some(channel) = stream.peek_channel_id() {
                if channel < class.first {
                    return Err(Error::StreamOrdering {
                        source_index: stream.source_index(),
                        detail: format!(
                            "channel {} lies below class {} ({}..={})",
                            channel, class.name, class.first, class.last
                        ),
                    });
                }
            }
        }

        let mut warnings = Vec::new();
        let range = class.range();
        for stream in streams.iter() {
            if stream.count_in(&range) == 0 {
                debug!(
                    "Input {} has no contributions in class {}",
                    stream.source_index(),
                    class.name
                );
                warnings.push(DigitizerWarning::EmptyInput {
                    source_index: stream.source_index(),
                    class: class.name.clone(),
                });
            }
        }

        // Next channel with signal, per stream position
        let mut pending: BinaryHeap<Reverse<(ChannelId, usize)>> = streams
            .iter()
            .enumerate()
            .filter_map(|(pos, stream)| {
                stream
                    .peek_channel_id()
                    .filter(|channel| *channel <= class.last)
                    .map(|channel| Reverse((channel, pos)))
            })
            .collect();

        let mut digits = Vec::with_capacity(class.len());
        let mut arrivals: Vec<f64> = Vec::new();
        let mut contributions = 0;

        for channel in range {
            let energy = noise.sample(params.noise_sigma);
            let seed = calibration.digitize(energy).max(0.0);
            let mut digit = Digit::noise(channel, seed, self.noise_time);

            let next_signal = pending.peek().map(|Reverse((next, _))| *next);
            match next_signal {
                Some(next) if next < channel => {
                    return Err(Error::MergeInvariant(format!(
                        "signal on channel {} skipped while visiting channel {}",
                        next, channel
                    )));
                }
                Some(next) if next == channel => {
                    arrivals.clear();

                    while let Some(&Reverse((next, pos))) = pending.peek() {
                        if next != channel {
                            break;
                        }
                        pending.pop();

                        let stream = &mut streams[pos];
                        let source_index = stream.source_index();
                        for record in stream.drain_channel(channel) {
                            let remapped = self.remapper.remap(source_index, record.origin_id)?;
                            if remapped.overflow {
                                warnings.push(DigitizerWarning::ProvenanceOverflow {
                                    source_index,
                                    channel,
                                    origin_id: record.origin_id,
                                    remapped: remapped.origin_id,
                                });
                            }
                            digit.amplitude += record.amplitude;
                            digit.provenance.push(Provenance {
                                origin_id: remapped.origin_id,
                                weight: record.weight,
                            });
                            arrivals.push(record.time);
                        }

                        if let Some(following) = stream.peek_channel_id() {
                            if following <= class.last {
                                pending.push(Reverse((following, pos)));
                            }
                        }
                    }

                    if arrivals.is_empty() {
                        return Err(Error::MergeInvariant(format!(
                            "channel {} flagged for signal but no input held a record for it",
                            channel
                        )));
                    }
                    contributions += arrivals.len();

                    if params.derive_time {
                        digit.time = front_edge_time(self.noise_time, &arrivals);
                    }

                    trace!(
                        "Channel {}: {} contributions, amplitude {}, time {}",
                        channel,
                        arrivals.len(),
                        digit.amplitude,
                        digit.time
                    );
                }
                _ => {}
            }

            digits.push(digit);
        }

        debug!(
            "Merged class {}: {} digits, {} contributions",
            class.name,
            digits.len(),
            contributions
        );

        Ok(ClassMerge {
            class: class.name.clone(),
            digits,
            warnings,
            contributions,
        })
    }
}
