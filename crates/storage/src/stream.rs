//! Helpers for working with [`ByteStream`]s.

use crate::backend::ByteStream;
use crate::error::Result;
use bytes::Bytes;
use futures::TryStreamExt;

/// A stream yielding `data` as a single chunk.
pub fn once(data: impl Into<Bytes>) -> ByteStream {
    let data = data.into();
    Box::pin(futures::stream::once(async move { Ok(data) }))
}

/// Drain a stream into one contiguous buffer.
pub async fn concat(stream: ByteStream) -> Result<Vec<u8>> {
    stream
        .try_fold(Vec::new(), |mut buffer, chunk| async move {
            buffer.extend_from_slice(&chunk);
            Ok(buffer)
        })
        .await
}
