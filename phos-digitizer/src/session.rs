//! Digitization session
//!
//! Orchestrates a run: registers the output with the sink, then for every
//! event builds one contribution stream per input, merges the channel
//! classes in ascending order, compacts the digits once across all classes
//! and hands them to the sink.
//!
//! # Failure scope
//!
//! - Session-fatal (returned as `Err`): missing collaborators, duplicate
//!   output name, input count not matching the registration, sink errors.
//! - Event-fatal (returned as [`EventOutcome::Failed`]): unsorted or
//!   out-of-range streams, invalid records, merge invariant violations,
//!   calibrations that give no finite energy.
//!   Classes merged before the failure are kept on the [`FailedEvent`], but
//!   nothing of the event is stored. Earlier stored events stay valid.

use crate::calibration::{Calibration, LinearCalibration};
use crate::channel::{ChannelClass, ChannelTable};
use crate::compact::{ClassCut, ThresholdCompactor};
use crate::digit::{ContributionRecord, Digit};
use crate::error::{DigitizerWarning, Error, Result};
use crate::input::RunInputs;
use crate::merge::{ClassMerge, DigitMergeEngine};
use crate::noise::{GaussianNoise, NoiseSampler};
use crate::params::{ClassParameters, ClassSnapshot, ParameterSnapshot};
use crate::provenance::ProvenanceRemapper;
use crate::sink::DigitSink;
use crate::stream::ContributionStream;
use phos_common::config::{DigitizerConfig, DEFAULT_NOISE_TIME};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// A class with its parameters and calibration
#[derive(Debug)]
struct ClassSetup {
    class: ChannelClass,
    parameters: ClassParameters,
    calibration: Box<dyn Calibration>,
}

/// Digits of one successfully digitized event
#[derive(Debug, Clone, PartialEq)]
pub struct DigitizedEvent {
    pub event: usize,

    /// Compacted digits, indexed from 0
    pub digits: Vec<Digit>,

    /// Digits before threshold suppression (one per channel)
    pub merged_channels: usize,

    /// Contribution records folded in
    pub contributions: usize,

    pub warnings: Vec<DigitizerWarning>,
}

/// An event whose digitization was abandoned
#[derive(Debug)]
pub struct FailedEvent {
    pub event: usize,
    pub error: Error,

    /// Classes fully merged before the failure
    pub retained: Vec<ClassMerge>,
}

/// What was stored for an event
#[derive(Debug, Clone, PartialEq)]
pub struct EventSummary {
    pub event: usize,
    pub digits: usize,
    pub contributions: usize,
    pub warnings: Vec<DigitizerWarning>,
}

/// Result of processing one event
#[derive(Debug)]
pub enum EventOutcome {
    Stored(EventSummary),
    Failed(FailedEvent),
}

impl EventOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, EventOutcome::Stored(_))
    }
}

/// Totals of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub events: usize,
    pub stored: usize,
    pub failed: Vec<usize>,
    pub digits_in_run: usize,
}

/// Collects the session's collaborators and parameters
pub struct SessionBuilder {
    output_name: String,
    table: Option<ChannelTable>,
    classes: Vec<(String, ClassParameters, Box<dyn Calibration>)>,
    noise: Option<Box<dyn NoiseSampler>>,
    sink: Option<Box<dyn DigitSink>>,
    masks: Option<Vec<i64>>,
    noise_time: f64,
    seed: Option<u64>,
}

impl SessionBuilder {
    pub fn new(output_name: impl Into<String>) -> Self {
        Self {
            output_name: output_name.into(),
            table: None,
            classes: Vec::new(),
            noise: None,
            sink: None,
            masks: None,
            noise_time: DEFAULT_NOISE_TIME,
            seed: None,
        }
    }

    /// Builder pre-filled from a configuration file: channel table, class
    /// parameters with linear calibrations, masks, and seeded Gaussian
    /// noise. Only the sink is left to add.
    pub fn from_config(config: &DigitizerConfig) -> Result<Self> {
        config.validate()?;

        let counts: Vec<(&str, u32)> = config
            .classes
            .iter()
            .map(|c| (c.name.as_str(), c.channels))
            .collect();
        let table = ChannelTable::from_counts(&counts)?;

        let mut builder = Self::new(config.output_name.clone())
            .channel_table(table)
            .noise(GaussianNoise::new(config.seed))
            .noise_time(config.noise_time)
            .seed(config.seed);

        for class in &config.classes {
            builder = builder.class(
                &class.name,
                ClassParameters {
                    noise_sigma: class.noise_sigma,
                    threshold: class.threshold,
                    derive_time: class.derive_time,
                },
                LinearCalibration::new(class.pedestal, class.slope),
            );
        }

        if let Some(masks) = &config.masks {
            builder = builder.masks(masks.clone());
        }

        Ok(builder)
    }

    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    pub fn channel_table(mut self, table: ChannelTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Parameters and calibration of the class called `name`
    pub fn class(
        mut self,
        name: &str,
        parameters: ClassParameters,
        calibration: impl Calibration + 'static,
    ) -> Self {
        let calibration: Box<dyn Calibration> = Box::new(calibration);
        self.classes.retain(|(n, _, _)| n != name);
        self.classes.push((name.to_string(), parameters, calibration));
        self
    }

    pub fn noise(mut self, sampler: impl NoiseSampler + 'static) -> Self {
        self.noise = Some(Box::new(sampler));
        self
    }

    pub fn sink(mut self, sink: impl DigitSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Explicit per-input origin-id offsets
    pub fn masks(mut self, masks: Vec<i64>) -> Self {
        self.masks = Some(masks);
        self
    }

    pub fn noise_time(mut self, noise_time: f64) -> Self {
        self.noise_time = noise_time;
        self
    }

    /// Seed of the noise generator, recorded in the parameter snapshot
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Check that every collaborator is present and consistent
    pub fn build(self) -> Result<DigitizationSession> {
        if self.output_name.trim().is_empty() {
            return Err(Error::Configuration("output name must not be empty".to_string()));
        }
        let table = self
            .table
            .ok_or_else(|| Error::Configuration("no channel table supplied".to_string()))?;
        let noise = self
            .noise
            .ok_or_else(|| Error::Configuration("no noise sampler supplied".to_string()))?;
        let sink = self
            .sink
            .ok_or_else(|| Error::Configuration("no digit sink supplied".to_string()))?;
        if !self.noise_time.is_finite() {
            return Err(Error::Configuration("noise time must be finite".to_string()));
        }

        let mut remaining = self.classes;
        let mut classes = Vec::with_capacity(table.classes().len());
        for class in table.classes() {
            let pos = remaining
                .iter()
                .position(|(name, _, _)| *name == class.name)
                .ok_or_else(|| {
                    Error::Configuration(format!(
                        "no parameters or calibration for class {}",
                        class.name
                    ))
                })?;
            let (_, parameters, calibration) = remaining.swap_remove(pos);
            classes.push(ClassSetup {
                class: class.clone(),
                parameters,
                calibration,
            });
        }
        if let Some((name, _, _)) = remaining.first() {
            return Err(Error::Configuration(format!(
                "parameters given for unknown class {}",
                name
            )));
        }

        let remapper = ProvenanceRemapper::for_masks(self.masks)?;

        Ok(DigitizationSession {
            output_name: self.output_name,
            table,
            classes,
            noise,
            sink,
            remapper,
            noise_time: self.noise_time,
            seed: self.seed,
            registered: None,
            digits_in_run: 0,
        })
    }
}

/// Digitizes events into one named output
pub struct DigitizationSession {
    output_name: String,
    table: ChannelTable,
    classes: Vec<ClassSetup>,
    noise: Box<dyn NoiseSampler>,
    sink: Box<dyn DigitSink>,
    remapper: ProvenanceRemapper,
    noise_time: f64,
    seed: Option<u64>,
    registered: Option<ParameterSnapshot>,
    digits_in_run: usize,
}

impl DigitizationSession {
    pub fn builder(output_name: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(output_name)
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn table(&self) -> &ChannelTable {
        &self.table
    }

    pub fn remapper(&self) -> &ProvenanceRemapper {
        &self.remapper
    }

    /// Digits stored so far in this run
    pub fn digits_in_run(&self) -> usize {
        self.digits_in_run
    }

    /// Snapshot registered with the sink, once [`begin`](Self::begin) succeeded
    pub fn registered(&self) -> Option<&ParameterSnapshot> {
        self.registered.as_ref()
    }

    /// Parameters of this session for a run over `inputs`
    pub fn parameter_snapshot(&self, inputs: &[String]) -> ParameterSnapshot {
        ParameterSnapshot {
            run_id: Uuid::new_v4(),
            output_name: self.output_name.clone(),
            created_at: chrono::Utc::now(),
            noise_time: self.noise_time,
            seed: self.seed,
            provenance: self.remapper.policy().clone(),
            classes: self
                .classes
                .iter()
                .map(|setup| ClassSnapshot {
                    class: setup.class.clone(),
                    parameters: setup.parameters,
                    calibration: setup.calibration.describe(),
                })
                .collect(),
            inputs: inputs.to_vec(),
        }
    }

    /// Claim the output name with the sink for a run over `inputs`
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateOutput`] when the sink already holds the name
    ///   (including a second `begin` on this session)
    /// - [`Error::Configuration`] when there are no inputs or more inputs
    ///   than provenance masks
    pub async fn begin(&mut self, inputs: &[String]) -> Result<()> {
        if self.registered.is_some() {
            return Err(Error::DuplicateOutput(self.output_name.clone()));
        }
        if inputs.is_empty() {
            return Err(Error::Configuration("a run needs at least one input".to_string()));
        }
        if let Some(capacity) = self.remapper.capacity() {
            if inputs.len() > capacity {
                return Err(Error::Configuration(format!(
                    "{} inputs but only {} provenance masks",
                    inputs.len(),
                    capacity
                )));
            }
        }

        if self.sink.output_exists(&self.output_name).await? {
            warn!("Digits output '{}' already exists", self.output_name);
            return Err(Error::DuplicateOutput(self.output_name.clone()));
        }

        let snapshot = self.parameter_snapshot(inputs);
        self.sink.register_output(&snapshot).await?;
        info!(
            "Registered digits output '{}' (run {}) with {} inputs",
            self.output_name,
            snapshot.run_id,
            inputs.len()
        );
        self.registered = Some(snapshot);
        Ok(())
    }

    /// Digitize one event without storing it
    ///
    /// `sources[i]` are the records of input `i`, sorted by channel.
    pub fn digitize(
        &mut self,
        event: usize,
        sources: &[&[ContributionRecord]],
    ) -> std::result::Result<DigitizedEvent, FailedEvent> {
        let mut streams = Vec::with_capacity(sources.len());
        for (source_index, records) in sources.iter().enumerate() {
            match ContributionStream::new(source_index, records) {
                Ok(stream) => streams.push(stream),
                Err(error) => {
                    return Err(FailedEvent {
                        event,
                        error,
                        retained: Vec::new(),
                    })
                }
            }
        }

        let engine = DigitMergeEngine::new(&self.remapper, self.noise_time);
        let mut merged: Vec<ClassMerge> = Vec::with_capacity(self.classes.len());
        for setup in &self.classes {
            match engine.merge_class(
                &setup.class,
                &setup.parameters,
                setup.calibration.as_ref(),
                self.noise.as_mut(),
                &mut streams,
            ) {
                Ok(class_merge) => merged.push(class_merge),
                Err(error) => {
                    return Err(FailedEvent {
                        event,
                        error,
                        retained: merged,
                    })
                }
            }
        }

        // Anything left lies beyond the last class
        if let Some(stream) = streams.iter().find(|s| !s.is_exhausted()) {
            let channel = stream.peek_channel_id().unwrap_or_default();
            return Err(FailedEvent {
                event,
                error: Error::StreamOrdering {
                    source_index: stream.source_index(),
                    detail: format!(
                        "channel {} beyond the last channel {}",
                        channel,
                        self.table.last_channel()
                    ),
                },
                retained: merged,
            });
        }

        let merged_channels = merged.iter().map(|m| m.digits.len()).sum();
        let contributions = merged.iter().map(|m| m.contributions).sum();
        // Copies, so the merged classes stay intact if compaction fails
        let warnings: Vec<DigitizerWarning> = merged
            .iter()
            .flat_map(|m| m.warnings.iter().cloned())
            .collect();
        let digits: Vec<Digit> = merged
            .iter()
            .flat_map(|m| m.digits.iter().cloned())
            .collect();

        let compactor = ThresholdCompactor::new(
            self.classes
                .iter()
                .map(|setup| ClassCut {
                    class: &setup.class,
                    threshold: setup.parameters.threshold,
                    calibration: setup.calibration.as_ref(),
                })
                .collect(),
        );
        let digits = match compactor.compact(digits) {
            Ok(digits) => digits,
            Err(error) => {
                return Err(FailedEvent {
                    event,
                    error,
                    retained: merged,
                })
            }
        };

        debug!(
            "Event {}: {} of {} channels above threshold, {} contributions",
            event,
            digits.len(),
            merged_channels,
            contributions
        );

        Ok(DigitizedEvent {
            event,
            digits,
            merged_channels,
            contributions,
            warnings,
        })
    }

    /// Digitize one event and store it under the registered output
    ///
    /// Event-scoped failures come back as [`EventOutcome::Failed`] and leave
    /// the sink untouched; only session-fatal problems are `Err`.
    pub async fn process_event(
        &mut self,
        event: usize,
        sources: &[&[ContributionRecord]],
    ) -> Result<EventOutcome> {
        let expected = match &self.registered {
            Some(snapshot) => snapshot.inputs.len(),
            None => {
                return Err(Error::Configuration(format!(
                    "output '{}' not registered; call begin first",
                    self.output_name
                )))
            }
        };
        if sources.len() != expected {
            return Err(Error::Configuration(format!(
                "event {} has {} inputs, run was registered with {}",
                event,
                sources.len(),
                expected
            )));
        }

        match self.digitize(event, sources) {
            Ok(digitized) => {
                for warning in &digitized.warnings {
                    warn!("Event {}: {}", event, warning);
                }
                self.sink
                    .store_event(&self.output_name, event, &digitized.digits)
                    .await?;
                self.digits_in_run += digitized.digits.len();

                info!(
                    "Event {}: stored {} digits ({} contributions)",
                    event,
                    digitized.digits.len(),
                    digitized.contributions
                );
                Ok(EventOutcome::Stored(EventSummary {
                    event,
                    digits: digitized.digits.len(),
                    contributions: digitized.contributions,
                    warnings: digitized.warnings,
                }))
            }
            Err(failed) => {
                error!(
                    "Event {} abandoned after {} merged classes: {}",
                    event,
                    failed.retained.len(),
                    failed.error
                );
                Ok(EventOutcome::Failed(failed))
            }
        }
    }

    /// Register the output and digitize every event of `inputs`
    pub async fn run(&mut self, inputs: &RunInputs) -> Result<RunSummary> {
        self.begin(&inputs.names()).await?;

        let mut summary = RunSummary {
            events: inputs.event_count(),
            ..RunSummary::default()
        };

        for event in 0..inputs.event_count() {
            let sources = inputs.event_records(event);
            match self.process_event(event, &sources).await? {
                EventOutcome::Stored(_) => summary.stored += 1,
                EventOutcome::Failed(failed) => summary.failed.push(failed.event),
            }
        }

        summary.digits_in_run = self.digits_in_run;
        info!(
            "Digitized {} events into '{}': {} stored, {} failed, {} digits",
            summary.events,
            self.output_name,
            summary.stored,
            summary.failed.len(),
            summary.digits_in_run
        );
        Ok(summary)
    }
}
