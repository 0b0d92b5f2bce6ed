//! Streaming ZIP archives.
//!
//! An [`ArchiveBuilder`] collects named entries whose content is a live byte
//! [`Stream`] (typically a storage download that has not started yet), and
//! [`finalize`](ArchiveBuilder::finalize) seals it into an [`Archive`]: itself
//! a [`Stream`] of ZIP bytes. Sealing happens immediately; the bytes are only
//! produced as the consumer polls, pulling each entry's source in turn.
//!
//! - Entries are deflated at the best compression level, prioritizing
//!   archive size over speed.
//! - Sizes and CRC-32 are not known up-front, so every entry uses a data
//!   descriptor (general purpose bit 3) and no entry is ever buffered whole.
//! - There is no ZIP64 support: archives are limited to 65 535 entries and
//!   4 GiB offsets, which is plenty for icon sets.

mod encode;
pub mod error;
mod records;

pub use crate::records::DosTimestamp;
use crate::error::{ErrorKind, Result};
use async_compression::Level;
use bytes::Bytes;
use exn::ResultExt;
use futures::{Stream, StreamExt, TryStreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use time::OffsetDateTime;

/// Boxed source of an entry's uncompressed bytes.
pub type EntrySource = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send + 'static>>;
type ArchiveStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send + 'static>>;

pub(crate) struct PendingEntry {
    name: String,
    source: EntrySource,
}

/// Collects entries for a streaming ZIP archive.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use futures::stream;
/// use iconvault_archive::{ArchiveBuilder, error::Error};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut builder = ArchiveBuilder::new();
/// builder.append("icons/a.svg", stream::iter([Ok::<_, Error>(Bytes::from_static(b"<svg/>"))]));
/// let archive = builder.finalize();
/// assert_eq!(archive.entry_count(), 1);
///
/// let bytes = archive.collect_vec().await.unwrap();
/// assert!(bytes.starts_with(b"PK\x03\x04"));
/// # Ok(())
/// # }
/// ```
pub struct ArchiveBuilder {
    entries: Vec<PendingEntry>,
    level: Level,
    modified: OffsetDateTime,
}
impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            level: Level::Best,
            modified: OffsetDateTime::now_utc(),
        }
    }

    /// Override the modification timestamp written for every entry.
    pub fn with_modified(mut self, modified: OffsetDateTime) -> Self {
        self.modified = modified;
        self
    }

    /// Append an entry. Nothing is read from `source` until the finalized
    /// archive is polled.
    ///
    /// A failing source fails the archive with [`ErrorKind::Source`] naming
    /// the entry, raised over the source's own error.
    pub fn append<S, E>(&mut self, name: impl Into<String>, source: S) -> &mut Self
    where
        S: Stream<Item = std::result::Result<Bytes, exn::Exn<E>>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let name = name.into();
        let entry = name.clone();
        let source = source.map(move |chunk| chunk.or_raise(|| ErrorKind::Source(entry.clone())));
        self.entries.push(PendingEntry {
            name,
            source: Box::pin(source),
        });
        self
    }

    /// Seal the archive: no more entries can be added, and the returned
    /// [`Archive`] must be read until it ends to obtain a complete file.
    pub fn finalize(self) -> Archive {
        let entries = self.entries.len();
        tracing::debug!(entries, "Archive finalized");
        Archive {
            entries,
            inner: Box::pin(encode::encode(self.entries, self.level, self.modified.into())),
        }
    }
}
impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A sealed, streaming ZIP archive.
///
/// The first error terminates the archive; bytes yielded before it form an
/// incomplete file and should be discarded by the consumer.
pub struct Archive {
    entries: usize,
    inner: ArchiveStream,
}
impl Archive {
    /// Number of entries sealed into this archive.
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Drain the archive into memory. Meant for tests and small archives;
    /// prefer forwarding the stream.
    pub async fn collect_vec(self) -> Result<Vec<u8>> {
        self.try_fold(Vec::new(), |mut buffer, chunk| async move {
            buffer.extend_from_slice(&chunk);
            Ok(buffer)
        })
        .await
    }
}
impl Stream for Archive {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}
impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive").field("entries", &self.entries).finish_non_exhaustive()
    }
}
