//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Configuration file extension is not one of TOML, YAML or JSON.
    #[display("unsupported configuration format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// Sources could not be parsed or merged into a [`Config`](crate::Config).
    #[display("could not load configuration")]
    Load,
    /// Configuration parsed but holds unusable values.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    /// No storage root configured and no platform data directory to fall back to.
    #[display("cannot determine a data directory for storage")]
    NoDataDir,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Configuration is deterministic: fix the input, don't retry.
        false
    }
}
