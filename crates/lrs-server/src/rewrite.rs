//! Chunked file streaming.
//!
//! Files are read in fixed-size chunks through `tokio::fs`, which runs the
//! blocking reads on the runtime's blocking pool. HTML goes through an
//! [`InjectionCursor`]; everything else is streamed untouched.

use std::io;

use axum::body::Bytes;
use futures::Stream;
use futures::stream;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::inject::InjectionCursor;

/// Stream `reader` verbatim in chunks of `chunk_size` bytes.
pub(crate) fn stream_verbatim<R>(
    reader: R,
    chunk_size: usize,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static
where
    R: AsyncRead + Unpin + Send + 'static,
{
    stream::try_unfold(reader, move |mut reader| async move {
        let chunk = read_chunk(&mut reader, chunk_size).await?;
        if chunk.is_empty() {
            return Ok(None);
        }
        Ok(Some((chunk, reader)))
    })
}

/// Rewriter state carried between polls.
struct Rewrite<R> {
    reader: R,
    cursor: Option<InjectionCursor>,
    chunk_size: usize,
}

/// Stream `reader` with `payload` spliced in exactly once.
///
/// Chunks come out in file order. A read error ends the stream with that
/// error; by then the status line is already on the wire, so the transport
/// aborts the body.
pub(crate) fn stream_with_injection<R>(
    reader: R,
    payload: Bytes,
    chunk_size: usize,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let state = Rewrite {
        reader,
        cursor: Some(InjectionCursor::new(payload)),
        chunk_size,
    };

    stream::try_unfold(state, |mut state| async move {
        loop {
            let Some(mut cursor) = state.cursor.take() else {
                return Ok(None);
            };

            let chunk = read_chunk(&mut state.reader, state.chunk_size).await?;
            let out = if chunk.is_empty() {
                cursor.finish()
            } else {
                let out = cursor.push(chunk);
                state.cursor = Some(cursor);
                out
            };

            if !out.is_empty() {
                return Ok(Some((out, state)));
            }
        }
    })
}

/// Read up to `chunk_size` bytes, stopping early only at end of file.
async fn read_chunk<R>(reader: &mut R, chunk_size: usize) -> io::Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0; chunk_size];
    let mut filled = 0;
    while filled < chunk_size {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(Bytes::from(buf))
}
