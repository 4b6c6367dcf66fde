//! Digit sinks
//!
//! A sink receives the finished digits of each event together with the
//! parameter snapshot of the run. The output name is the sink's idempotency
//! key: registering a name the sink already holds fails with
//! [`Error::DuplicateOutput`](crate::Error::DuplicateOutput).

use crate::digit::Digit;
use crate::error::Result;
use crate::params::ParameterSnapshot;
use async_trait::async_trait;

pub mod memory;
pub mod sqlite;

pub use memory::MemorySink;
pub use sqlite::SqliteSink;

/// Destination for finished digits
#[async_trait]
pub trait DigitSink: Send + Sync {
    /// Whether an output with this name already exists
    async fn output_exists(&self, name: &str) -> Result<bool>;

    /// Claim `parameters.output_name` and store the parameter snapshot
    ///
    /// Fails with `DuplicateOutput` when the name is taken.
    async fn register_output(&self, parameters: &ParameterSnapshot) -> Result<()>;

    /// Store the compacted digits of one event under a registered output
    async fn store_event(&self, name: &str, event: usize, digits: &[Digit]) -> Result<()>;
}
