//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source stream of an entry failed; the upstream error is the child
    /// frame of this one.
    #[display("entry source failed: {_0}")]
    Source(#[error(not(source))] String),
    /// Entry name cannot be represented in a ZIP header.
    #[display("invalid entry name: {_0}")]
    InvalidName(#[error(not(source))] String),
    /// A size, offset or entry count exceeds what a non-ZIP64 archive can
    /// address.
    #[display("archive too large: {_0}")]
    TooLarge(#[error(not(source))] String),
    /// The deflate encoder failed while writing.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io | ErrorKind::Source(_))
    }
}
