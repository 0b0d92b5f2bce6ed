//! Service Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Failures from storage, the archive
//! encoder or configuration are raised over their own error trees, which stay
//! attached as child frames.

use derive_more::{Display, Error};

/// A service error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Status signalled for content defects, for an HTTP layer to forward as-is.
pub const UNPROCESSABLE_ENTITY: u16 = 422;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A service was constructed with unusable arguments.
    #[display("invalid argument: {_0}")]
    InvalidArgument(#[error(not(source))] String),
    /// The submitted content is defective; ask for corrected input.
    #[display("unprocessable entity: {_0}")]
    UnprocessableEntity(#[error(not(source))] String),
    /// The cleaner rejected the markup.
    #[display("invalid markup")]
    InvalidMarkup,
    /// The storage backend failed.
    #[display("storage operation failed")]
    Storage,
    /// Outbound fetch of the given URL failed.
    #[display("fetch failed: {_0}")]
    Fetch(#[error(not(source))] String),
    /// A listed file has no public URL to fetch it from.
    #[display("entry has no public URL: {_0}")]
    Unaddressable(#[error(not(source))] String),
    /// No raster size was given and none could be read from the viewBox.
    #[display("cannot get dimensions from viewbox")]
    Dimensions,
    /// The rasterizer failed.
    #[display("rasterization failed")]
    Rasterize,
    /// A blocking task panicked or was cancelled.
    #[display("background task failed")]
    Task,
    /// Configuration could not be loaded.
    #[display("configuration error")]
    Config,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Task)
    }

    /// Fixed status for errors an HTTP layer should surface verbatim.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnprocessableEntity(_) => Some(UNPROCESSABLE_ENTITY),
            _ => None,
        }
    }
}
