use contracts::{CancellationToken, Message, Payload, PipelineError, Queue, Result};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{ReadCodec, WriteCodec};

/// JSON framing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonMode {
    /// One document; a top-level array yields one message per element.
    /// Written as one document per line.
    #[default]
    Single,
    /// One document per line, blank lines skipped
    Lines,
    /// A top-level array is required on read; written as a single array
    Array,
}

#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    mode: JsonMode,
    buffered: Vec<Value>,
}

impl JsonCodec {
    pub fn new(mode: JsonMode) -> Self {
        Self {
            mode,
            buffered: Vec::new(),
        }
    }

    pub fn lines() -> Self {
        Self::new(JsonMode::Lines)
    }

    pub fn array() -> Self {
        Self::new(JsonMode::Array)
    }

    pub fn mode(&self) -> JsonMode {
        self.mode
    }

    fn parse(&self, raw: &str) -> Result<Value> {
        serde_json::from_str(raw).map_err(|e| PipelineError::codec("json", e.to_string()))
    }
}

async fn emit(ctx: &CancellationToken, out: &Queue, values: Vec<Value>) -> u64 {
    let mut count = 0u64;
    for value in values {
        if out
            .send_until(ctx, Message::new(Payload::from_json(value)))
            .await
            .is_err()
        {
            break;
        }
        count += 1;
    }
    count
}

impl ReadCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn decode<R>(&self, ctx: &CancellationToken, mut reader: R, out: &Queue) -> Result<u64>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        if self.mode == JsonMode::Lines {
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
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let value = self.parse(line)?;
                if out
                    .send_until(ctx, Message::new(Payload::from_json(value)))
                    .await
                    .is_err()
                {
                    break;
                }
                count += 1;
            }
            return Ok(count);
        }

        let mut raw = String::new();
        tokio::select! {
            biased;
            _ = ctx.cancelled() => return Ok(0),
            res = reader.read_to_string(&mut raw) => { res?; }
        }

        let values = match (self.parse(&raw)?, self.mode) {
            (Value::Array(items), _) => items,
            (_, JsonMode::Array) => {
                return Err(PipelineError::codec("json", "expected a top-level JSON array"));
            }
            (value, _) => vec![value],
        };
        Ok(emit(ctx, out, values).await)
    }
}

impl WriteCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn encode<W>(&mut self, msg: &Message, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let value = msg.data.to_json();
        if self.mode == JsonMode::Array {
            self.buffered.push(value);
            return Ok(());
        }

        let mut line = serde_json::to_vec(&value)
            .map_err(|e| PipelineError::codec("json", e.to_string()))?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        Ok(())
    }

    async fn finish<W>(&mut self, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        if self.mode != JsonMode::Array {
            return Ok(());
        }

        let values = std::mem::take(&mut self.buffered);
        let mut doc = serde_json::to_vec(&Value::Array(values))
            .map_err(|e| PipelineError::codec("json", e.to_string()))?;
        doc.push(b'\n');
        writer.write_all(&doc).await?;
        Ok(())
    }
}
