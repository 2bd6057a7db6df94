use bytes::Bytes;
use contracts::{CancellationToken, Message, Payload, Queue, Result};
use tokio::io::{AsyncBufRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{render, ReadCodec, WriteCodec};

/// Whole input as a single message
#[derive(Debug, Clone, Copy)]
pub struct BlobCodec {
    as_text: bool,
}

impl Default for BlobCodec {
    fn default() -> Self {
        Self { as_text: true }
    }
}

impl BlobCodec {
    /// Decode to `Payload::Text` (lossy UTF-8)
    pub fn text() -> Self {
        Self { as_text: true }
    }

    /// Decode to `Payload::Bytes`
    pub fn bytes() -> Self {
        Self { as_text: false }
    }
}

impl ReadCodec for BlobCodec {
    fn name(&self) -> &'static str {
        "blob"
    }

    async fn decode<R>(&self, ctx: &CancellationToken, mut reader: R, out: &Queue) -> Result<u64>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let mut buf = Vec::new();
        tokio::select! {
            biased;
            _ = ctx.cancelled() => return Ok(0),
            res = reader.read_to_end(&mut buf) => { res?; }
        }

        let data = if self.as_text {
            Payload::Text(String::from_utf8_lossy(&buf).into_owned())
        } else {
            Payload::Bytes(Bytes::from(buf))
        };

        match out.send_until(ctx, Message::new(data)).await {
            Ok(()) => Ok(1),
            Err(_) => Ok(0),
        }
    }
}

impl WriteCodec for BlobCodec {
    fn name(&self) -> &'static str {
        "blob"
    }

    async fn encode<W>(&mut self, msg: &Message, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        writer.write_all(&render(&msg.data)).await?;
        Ok(())
    }

    async fn finish<W>(&mut self, _writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_decode_text_blob() {
        let queue = Queue::bounded(1);
        let input: &[u8] = b"line one\nline two\n";
        let count = BlobCodec::text()
            .decode(&CancellationToken::new(), input, &queue)
            .await
            .unwrap();
        assert_eq!(count, 1);
        let msg = queue.recv().await.unwrap();
        assert_eq!(msg.payload::<String>().unwrap(), "line one\nline two\n");
    }

    #[tokio::test]
    async fn test_decode_bytes_blob() {
        let queue = Queue::bounded(1);
        let input: &[u8] = &[0xff, 0x00, 0x01];
        BlobCodec::bytes()
            .decode(&CancellationToken::new(), input, &queue)
            .await
            .unwrap();
        let msg = queue.recv().await.unwrap();
        assert_eq!(msg.payload::<Bytes>().unwrap().as_ref(), &[0xff, 0x00, 0x01]);
    }

    #[tokio::test]
    async fn test_encode_back_to_back() {
        let mut codec = BlobCodec::default();
        let mut buf: Vec<u8> = Vec::new();
        codec.encode(&Message::new("ab"), &mut buf).await.unwrap();
        codec.encode(&Message::new("cd"), &mut buf).await.unwrap();
        codec.finish(&mut buf).await.unwrap();
        assert_eq!(buf, b"abcd");
    }
}
