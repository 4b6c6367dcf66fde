//! Summable digit inputs
//!
//! A run has one primary (signal) input and any number of inputs mixed into
//! it (background). Each input holds the contribution records of its events,
//! sorted by channel. Event `n` of the run is built from event `n` of every
//! input; an input with fewer events contributes nothing to the later ones.
//!
//! On disk an input is a JSON document:
//!
//! ```json
//! { "events": [ [ { "channel": 2, "amplitude": 1.0, "time": 1e-9, "origin_id": 5 } ] ] }
//! ```

use crate::digit::ContributionRecord;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

/// On-disk layout of an input file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummableDigitsFile {
    pub events: Vec<Vec<ContributionRecord>>,
}

/// One input's events
#[derive(Debug, Clone, PartialEq)]
pub struct InputSource {
    pub name: String,
    pub events: Vec<Vec<ContributionRecord>>,
}

impl InputSource {
    pub fn new(name: impl Into<String>, events: Vec<Vec<ContributionRecord>>) -> Self {
        Self {
            name: name.into(),
            events,
        }
    }

    /// Read an input file; the input is named after its path
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Input(format!("cannot open {}: {}", path.display(), e)))?;
        let parsed: SummableDigitsFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Input(format!("cannot parse {}: {}", path.display(), e)))?;

        info!(
            "Loaded {} events of summable digits from {}",
            parsed.events.len(),
            path.display()
        );
        Ok(Self::new(path.display().to_string(), parsed.events))
    }

    /// Records of one event, empty when the input has no such event
    pub fn event(&self, event: usize) -> &[ContributionRecord] {
        self.events.get(event).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Primary input plus mixed inputs, in input-index order
#[derive(Debug, Clone, PartialEq)]
pub struct RunInputs {
    sources: Vec<InputSource>,
}

impl RunInputs {
    pub fn new(primary: InputSource) -> Self {
        Self {
            sources: vec![primary],
        }
    }

    /// Mix another input into every event
    ///
    /// An input whose name is already registered is not added again;
    /// returns whether it was added.
    pub fn mix_with(&mut self, source: InputSource) -> bool {
        if self.sources.iter().any(|s| s.name == source.name) {
            warn!("Input {} already registered, not added again", source.name);
            return false;
        }
        info!("Mixing input {} as input {}", source.name, self.sources.len());
        self.sources.push(source);
        true
    }

    pub fn sources(&self) -> &[InputSource] {
        &self.sources
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name.clone()).collect()
    }

    /// Number of inputs (never zero)
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Events in the run, taken from the primary input
    pub fn event_count(&self) -> usize {
        self.sources.first().map(|s| s.events.len()).unwrap_or(0)
    }

    /// Every input's records for `event`, in input-index order
    pub fn event_records(&self, event: usize) -> Vec<&[ContributionRecord]> {
        self.sources.iter().map(|s| s.event(event)).collect()
    }
}
