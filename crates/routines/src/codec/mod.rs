//! Codec traits - turn byte streams into messages and back
//!
//! Decoders push messages into a queue and stop silently on cancellation.
//! Neither side closes pipes; that is the owning stage's job.

mod blob;
mod csv;
mod json;
mod line;

pub use blob::BlobCodec;
pub use self::csv::CsvCodec;
pub use json::{JsonCodec, JsonMode};
pub use line::LineCodec;

use contracts::{CancellationToken, Message, Payload, Queue, Result};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};

/// Read side of a codec
#[trait_variant::make(ReadCodec: Send)]
pub trait LocalReadCodec {
    /// Codec name (used for logging and errors)
    fn name(&self) -> &'static str;

    /// Decode `reader` into messages sent on `out`
    ///
    /// Returns the number of messages sent.
    async fn decode<R>(&self, ctx: &CancellationToken, reader: R, out: &Queue) -> Result<u64>
    where
        R: AsyncBufRead + Unpin + Send;
}

/// Write side of a codec
///
/// A fresh clone is used for every run, so implementations may buffer.
#[trait_variant::make(WriteCodec: Send)]
pub trait LocalWriteCodec {
    /// Codec name (used for logging and errors)
    fn name(&self) -> &'static str;

    /// Encode one message
    async fn encode<W>(&mut self, msg: &Message, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send;

    /// Write anything still buffered once input is exhausted
    async fn finish<W>(&mut self, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send;
}

/// Encode everything on `inbound` until it is closed or `ctx` is cancelled
///
/// Buffered output is finished and flushed in both cases.
pub(crate) async fn drain_into<C, W>(
    ctx: &CancellationToken,
    inbound: &Queue,
    codec: &mut C,
    writer: &mut W,
) -> Result<u64>
where
    C: WriteCodec + Send,
    W: AsyncWrite + Unpin + Send,
{
    let mut count = 0u64;
    while let Some(msg) = inbound.recv_until(ctx).await {
        codec.encode(&msg, writer).await?;
        count += 1;
    }
    codec.finish(writer).await?;
    writer.flush().await?;
    Ok(count)
}

/// Raw rendering of a payload without any framing
pub(crate) fn render(payload: &Payload) -> Vec<u8> {
    match payload {
        Payload::Text(s) => s.as_bytes().to_vec(),
        Payload::Bytes(b) => b.to_vec(),
        Payload::Null => b"null".to_vec(),
        Payload::Bool(b) => b.to_string().into_bytes(),
        Payload::Int(i) => i.to_string().into_bytes(),
        Payload::Float(f) => f.to_string().into_bytes(),
        Payload::Json(v) => v.to_string().into_bytes(),
    }
}
