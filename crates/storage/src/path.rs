//! Path validation and security utilities.
//!
//! This module provides functions to validate storage keys and prevent
//! security issues like path traversal attacks.

use crate::error::{ErrorKind, Result};

/// Validates a storage key for security and correctness.
/// Ensures that keys don't escape the storage root (no `..` traversal).
///
/// Keys are `/`-separated; backslashes are ordinary name characters. NUL
/// bytes are rejected.
///
/// # Returns
/// Returns the normalized, `/`-separated key if valid, or
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath) if invalid.
///
/// # Examples
///
/// ```
/// use iconvault_storage::validate_path;
/// // Valid keys
/// assert!(validate_path("icons/arrow.svg").is_ok());
/// assert!(validate_path("a/b/c/file.svg").is_ok());
/// assert!(validate_path("a/../file.svg").is_ok()); // (never leaves storage root)
/// // Invalid keys
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a/../../b").is_err()); // (leaves storage root)
/// assert!(validate_path("a\0b").is_err());
/// // Keys get resolved
/// assert_eq!(
///     validate_path("wrong/../still-wrong/.././correct//./icon.svg/").unwrap(),
///     "correct/icon.svg"
/// );
/// ```
pub fn validate(key: impl AsRef<str>) -> Result<String> {
    let key = key.as_ref();
    let invalid = || ErrorKind::InvalidPath(key.to_string());
    // NUL passes through as part of a segment but truncates C-based syscalls.
    if key.contains('\0') {
        exn::bail!(invalid());
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in key.split('/') {
        match segment {
            // Repeated, leading and trailing slashes collapse.
            "" | "." => {},
            ".." => {
                segments.pop().ok_or_else(invalid)?;
            },
            name => segments.push(name),
        }
    }
    if segments.is_empty() {
        exn::bail!(invalid());
    }
    Ok(segments.join("/"))
}

/// Segment-wise prefix match, `"icons/a"` is not a prefix of `"icons/ab.svg"`.
pub(crate) fn has_prefix(key: &str, prefix: Option<&str>) -> bool {
    prefix.is_none_or(|prefix| {
        let mut segments = key.split('/');
        prefix.split('/').all(|expected| segments.next() == Some(expected))
    })
}
