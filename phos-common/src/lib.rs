//! # PHOS Common Library
//!
//! Shared code for the PHOS digitization tools:
//! - Error types
//! - Digitizer configuration (TOML) and its built-in defaults
//! - SQLite database initialization for the digit store

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;

pub use config::{ChannelClassConfig, DigitizerConfig, LoggingConfig};
pub use error::{Error, Result};
