//! Database initialization for the digit store

pub mod init;

pub use init::*;
