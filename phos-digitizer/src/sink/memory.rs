//! In-memory digit sink, for tests and dry runs

use super::DigitSink;
use crate::digit::Digit;
use crate::error::{Error, Result};
use crate::params::ParameterSnapshot;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One registered output
#[derive(Debug, Clone, PartialEq)]
pub struct StoredOutput {
    pub parameters: ParameterSnapshot,
    pub events: BTreeMap<usize, Vec<Digit>>,
}

/// Keeps outputs in memory; clones share the same store
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    outputs: Arc<RwLock<HashMap<String, StoredOutput>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of a registered output
    pub async fn output(&self, name: &str) -> Option<StoredOutput> {
        self.outputs.read().await.get(name).cloned()
    }

    /// Digits stored for one event of an output
    pub async fn event(&self, name: &str, event: usize) -> Option<Vec<Digit>> {
        self.outputs
            .read()
            .await
            .get(name)
            .and_then(|output| output.events.get(&event).cloned())
    }

    /// Number of events stored under an output
    pub async fn event_count(&self, name: &str) -> usize {
        self.outputs
            .read()
            .await
            .get(name)
            .map(|output| output.events.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DigitSink for MemorySink {
    async fn output_exists(&self, name: &str) -> Result<bool> {
        Ok(self.outputs.read().await.contains_key(name))
    }

    async fn register_output(&self, parameters: &ParameterSnapshot) -> Result<()> {
        let mut outputs = self.outputs.write().await;
        if outputs.contains_key(&parameters.output_name) {
            return Err(Error::DuplicateOutput(parameters.output_name.clone()));
        }
        outputs.insert(
            parameters.output_name.clone(),
            StoredOutput {
                parameters: parameters.clone(),
                events: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn store_event(&self, name: &str, event: usize, digits: &[Digit]) -> Result<()> {
        let mut outputs = self.outputs.write().await;
        let output = outputs
            .get_mut(name)
            .ok_or_else(|| Error::Configuration(format!("output '{}' is not registered", name)))?;
        output.events.insert(event, digits.to_vec());
        Ok(())
    }
}
