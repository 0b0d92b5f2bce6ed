//! The streaming encoder behind [`Archive`](crate::Archive).

use crate::error::{ErrorKind, Result};
use crate::records::{self, DosTimestamp, EntryRecord};
use crate::{EntrySource, PendingEntry};
use async_compression::Level;
use async_compression::futures::write::DeflateEncoder;
use async_stream::try_stream;
use bytes::Bytes;
use exn::ResultExt;
use futures::io::AsyncWriteExt;
use futures::{Stream, StreamExt};

/// Offsets and sizes in the base format are 32-bit, entry counts 16-bit.
fn narrow_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value).or_raise(|| ErrorKind::TooLarge(what.to_string()))
}

fn check_entry_count(count: usize) -> Result<()> {
    if count > usize::from(u16::MAX) {
        exn::bail!(ErrorKind::TooLarge(format!("{count} entries")));
    }
    Ok(())
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > usize::from(u16::MAX) {
        exn::bail!(ErrorKind::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Encode the sealed entry list into ZIP bytes.
///
/// Entries are written strictly in order. For each one the local header is
/// yielded first, then compressed data as soon as the deflate encoder hands
/// it over, then the data descriptor. Nothing but the encoder's internal
/// buffer and the central directory records is held in memory.
pub(crate) fn encode(
    entries: Vec<PendingEntry>,
    level: Level,
    stamp: DosTimestamp,
) -> impl Stream<Item = Result<Bytes>> + Send {
    try_stream! {
        check_entry_count(entries.len())?;
        let mut offset: u64 = 0;
        let mut directory: Vec<EntryRecord> = Vec::with_capacity(entries.len());

        for PendingEntry { name, source } in entries {
            check_name(&name)?;
            let header_offset = narrow_u32(offset, "header offset")?;
            let header = records::local_header(&name, stamp);
            offset += header.len() as u64;
            yield header;

            let mut written = WrittenEntry::default();
            let mut encoder = DeflateEncoder::with_quality(Vec::new(), level);
            let mut source: EntrySource = source;
            while let Some(chunk) = source.next().await {
                let chunk = chunk?;
                written.consume(&chunk);
                encoder.write_all(&chunk).await.or_raise(|| ErrorKind::Io)?;
                // The encoder flushes into the Vec whenever its own buffer
                // fills up; hand over whatever is there without forcing a
                // flush, which would cost compression ratio.
                let compressed = std::mem::take(encoder.get_mut());
                if !compressed.is_empty() {
                    written.compressed += compressed.len() as u64;
                    yield Bytes::from(compressed);
                }
            }
            encoder.close().await.or_raise(|| ErrorKind::Io)?;
            let tail = encoder.into_inner();
            if !tail.is_empty() {
                written.compressed += tail.len() as u64;
                yield Bytes::from(tail);
            }

            let record = EntryRecord {
                crc32: written.crc.clone().finalize(),
                compressed_size: narrow_u32(written.compressed, "compressed size")?,
                uncompressed_size: narrow_u32(written.uncompressed, "uncompressed size")?,
                header_offset,
                name,
            };
            tracing::debug!(
                entry = %record.name,
                uncompressed = record.uncompressed_size,
                compressed = record.compressed_size,
                "Archive entry written"
            );
            let descriptor = records::data_descriptor(&record);
            offset += written.compressed + descriptor.len() as u64;
            yield descriptor;
            directory.push(record);
        }

        let directory_offset = narrow_u32(offset, "central directory offset")?;
        let central = records::central_directory(&directory, stamp);
        let directory_size = narrow_u32(central.len() as u64, "central directory size")?;
        yield central;
        // Checked above, the count fits.
        let count = directory.len() as u16;
        yield records::end_of_central_directory(count, directory_size, directory_offset);
    }
}

#[derive(Default)]
struct WrittenEntry {
    crc: crc32fast::Hasher,
    uncompressed: u64,
    compressed: u64,
}
impl WrittenEntry {
    fn consume(&mut self, chunk: &[u8]) {
        self.crc.update(chunk);
        self.uncompressed += chunk.len() as u64;
    }
}
