use contracts::{CancellationToken, Message, Queue, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use super::{render, ReadCodec, WriteCodec};

/// One text message per line
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCodec;

impl LineCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ReadCodec for LineCodec {
    fn name(&self) -> &'static str {
        "lines"
    }

    async fn decode<R>(&self, ctx: &CancellationToken, reader: R, out: &Queue) -> Result<u64>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let mut lines = reader.lines();
        let mut count = 0u64;

        loop {
            let line = tokio::select! {
                biased;
                _ = ctx.cancelled() => break,
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                break;
            };

            let msg = Message::new(line);
            trace!(msg_id = %msg.id, "Parsed line");
            if out.send_until(ctx, msg).await.is_err() {
                break;
            }
            count += 1;
        }

        Ok(count)
    }
}

impl WriteCodec for LineCodec {
    fn name(&self) -> &'static str {
        "lines"
    }

    async fn encode<W>(&mut self, msg: &Message, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut line = render(&msg.data);
        line.push(b'\n');
        writer.write_all(&line).await?;
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
    use contracts::Payload;

    #[tokio::test]
    async fn test_decode_lines() {
        let queue = Queue::bounded(8);
        let input: &[u8] = b"alpha\nbeta\n\ngamma";
        let count = LineCodec
            .decode(&CancellationToken::new(), input, &queue)
            .await
            .unwrap();
        queue.close();

        assert_eq!(count, 4);
        let mut texts = Vec::new();
        while let Some(msg) = queue.recv().await {
            texts.push(msg.payload::<String>().unwrap());
        }
        assert_eq!(texts, vec!["alpha", "beta", "", "gamma"]);
    }

    #[tokio::test]
    async fn test_decode_stops_on_cancel() {
        let queue = Queue::bounded(1);
        let ctx = CancellationToken::new();
        ctx.cancel();
        let input: &[u8] = b"a\nb\n";
        let count = LineCodec.decode(&ctx, input, &queue).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_encode_appends_newline() {
        let mut codec = LineCodec;
        let mut buf: Vec<u8> = Vec::new();
        codec
            .encode(&Message::new("x"), &mut buf)
            .await
            .unwrap();
        codec
            .encode(&Message::new(Payload::Float(2.5)), &mut buf)
            .await
            .unwrap();
        codec.finish(&mut buf).await.unwrap();
        assert_eq!(buf, b"x\n2.5\n");
    }
}
