//! Error and warning types for phos-digitizer
//!
//! Errors abort either the whole session (configuration, duplicate output,
//! persistence) or a single event (stream ordering, invalid records, merge
//! invariants). Warnings never abort anything; they are collected on the
//! event result and logged.

use crate::channel::ChannelId;
use thiserror::Error;

/// Main error type for phos-digitizer
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or inconsistent collaborator or parameter
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The sink already holds an output under this name
    #[error("Output '{0}' already exists")]
    DuplicateOutput(String),

    /// A contribution stream is unsorted or reaches outside the channel table
    #[error("Stream ordering violation in input {source_index}: {detail}")]
    StreamOrdering { source_index: usize, detail: String },

    /// A contribution record carries a value the merge cannot use
    #[error("Invalid record {position} in input {source_index}: {detail}")]
    InvalidRecord {
        source_index: usize,
        position: usize,
        detail: String,
    },

    /// Internal merge bookkeeping went wrong
    #[error("Merge invariant violated: {0}")]
    MergeInvariant(String),

    /// Summable digit input could not be read
    #[error("Input error: {0}")]
    Input(String),

    /// Database errors from the SQLite sink
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from phos-common (config, database init)
    #[error(transparent)]
    Common(#[from] phos_common::Error),
}

impl Error {
    /// True for errors that only invalidate the current event
    pub fn is_event_scoped(&self) -> bool {
        matches!(
            self,
            Error::StreamOrdering { .. } | Error::InvalidRecord { .. } | Error::MergeInvariant(_)
        )
    }
}

/// Convenience Result type using the phos-digitizer Error
pub type Result<T> = std::result::Result<T, Error>;

/// Recoverable conditions found while digitizing an event
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DigitizerWarning {
    /// A remapped origin id left its input's offset space or the sane bound
    #[error(
        "origin id {origin_id} from input {source_index} on channel {channel} remapped to {remapped} outside its offset space"
    )]
    ProvenanceOverflow {
        source_index: usize,
        channel: ChannelId,
        origin_id: i64,
        remapped: i64,
    },

    /// An input has no records at all for a channel class (pure noise there)
    #[error("input {source_index} has no contributions in class {class}")]
    EmptyInput { source_index: usize, class: String },
}
