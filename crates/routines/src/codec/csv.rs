use contracts::{CancellationToken, Message, Payload, PipelineError, Queue, Result};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use super::{render, ReadCodec, WriteCodec};

/// CSV records, one message per row
///
/// Rows decode to `Payload::Json` arrays of strings. Lines starting with the
/// comment byte are skipped. Every row must have the same number of fields.
#[derive(Debug, Clone)]
pub struct CsvCodec {
    separator: u8,
    comment: Option<u8>,
    headers: Vec<String>,
}

impl Default for CsvCodec {
    fn default() -> Self {
        Self {
            separator: b',',
            comment: Some(b'#'),
            headers: Vec::new(),
        }
    }
}

impl CsvCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field separator (default `,`)
    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    /// Comment byte (default `#`, `None` disables comments)
    pub fn with_comment(mut self, comment: Option<u8>) -> Self {
        self.comment = comment;
        self
    }

    /// Column order used when writing JSON objects
    pub fn with_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn separator(&self) -> u8 {
        self.separator
    }

    fn row(&self, payload: &Payload) -> Vec<String> {
        match payload {
            Payload::Json(Value::Array(items)) => items.iter().map(field).collect(),
            Payload::Json(Value::Object(map)) if !self.headers.is_empty() => self
                .headers
                .iter()
                .map(|h| map.get(h).map(field).unwrap_or_default())
                .collect(),
            Payload::Json(Value::Object(map)) => map.values().map(field).collect(),
            other => vec![String::from_utf8_lossy(&render(other)).into_owned()],
        }
    }
}

fn field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn csv_error(e: csv::Error) -> PipelineError {
    PipelineError::codec("csv", e.to_string())
}

impl ReadCodec for CsvCodec {
    fn name(&self) -> &'static str {
        "csv"
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

        // parse everything up front so a malformed file sends nothing
        let mut rows = Vec::new();
        let mut parser = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(self.separator)
            .comment(self.comment)
            .from_reader(buf.as_slice());
        for record in parser.records() {
            let record = record.map_err(csv_error)?;
            rows.push(Value::Array(
                record.iter().map(|f| Value::String(f.to_string())).collect(),
            ));
        }

        let mut count = 0u64;
        for row in rows {
            let msg = Message::new(Payload::Json(row));
            trace!(msg_id = %msg.id, "Parsed csv row");
            if out.send_until(ctx, msg).await.is_err() {
                break;
            }
            count += 1;
        }
        Ok(count)
    }
}

impl WriteCodec for CsvCodec {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn encode<W>(&mut self, msg: &Message, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut line = csv::WriterBuilder::new()
            .has_headers(false)
            .delimiter(self.separator)
            .from_writer(Vec::new());
        line.write_record(self.row(&msg.data)).map_err(csv_error)?;
        let bytes = line
            .into_inner()
            .map_err(|e| PipelineError::codec("csv", e.to_string()))?;
        writer.write_all(&bytes).await?;
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
    use serde_json::json;

    async fn decode_all(codec: &CsvCodec, input: &str) -> Result<Vec<Message>> {
        let queue = Queue::bounded(16);
        codec
            .decode(&CancellationToken::new(), input.as_bytes(), &queue)
            .await?;
        queue.close();
        let mut out = Vec::new();
        while let Some(msg) = queue.recv().await {
            out.push(msg);
        }
        Ok(out)
    }

    #[tokio::test]
    async fn test_decode_rows_skipping_comments() {
        let input = "# header comment\nname,age\nada,36\n\"lovelace, a\",\"x\"\n";
        let rows: Vec<Payload> = decode_all(&CsvCodec::new(), input)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.data)
            .collect();

        assert_eq!(
            rows,
            vec![
                Payload::Json(json!(["name", "age"])),
                Payload::Json(json!(["ada", "36"])),
                Payload::Json(json!(["lovelace, a", "x"])),
            ]
        );
    }

    #[tokio::test]
    async fn test_decode_custom_separator() {
        let codec = CsvCodec::new().with_separator(b';').with_comment(None);
        let rows = decode_all(&codec, "#a;b\nc;d\n").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].data, Payload::Json(json!(["#a", "b"])));
    }

    #[tokio::test]
    async fn test_decode_ragged_rows_is_an_error() {
        let err = decode_all(&CsvCodec::new(), "a,b\nc\n").await.unwrap_err();
        assert!(matches!(err, PipelineError::Codec { .. }));
    }

    #[tokio::test]
    async fn test_encode_rows() {
        let mut codec = CsvCodec::new().with_headers(["id", "name"]);
        let mut buf: Vec<u8> = Vec::new();
        for data in [
            Payload::Json(json!(["a", 1, "x,y"])),
            Payload::Json(json!({"name": "bob", "id": 7, "extra": true})),
            Payload::Text("plain".into()),
            Payload::Int(3),
        ] {
            codec.encode(&Message::new(data), &mut buf).await.unwrap();
        }
        codec.finish(&mut buf).await.unwrap();

        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "a,1,\"x,y\"\n7,bob\nplain\n3\n"
        );
    }

    #[tokio::test]
    async fn test_rows_survive_write_then_read() {
        let mut codec = CsvCodec::new().with_separator(b'\t');
        let rows = [json!(["k", "v"]), json!(["tab\there", "quote\"d"])];
        let mut buf: Vec<u8> = Vec::new();
        for row in &rows {
            codec
                .encode(&Message::new(Payload::Json(row.clone())), &mut buf)
                .await
                .unwrap();
        }

        let text = String::from_utf8(buf).unwrap();
        let decoded = decode_all(&codec, &text).await.unwrap();
        let decoded: Vec<Payload> = decoded.into_iter().map(|m| m.data).collect();
        assert_eq!(
            decoded,
            rows.iter().cloned().map(Payload::Json).collect::<Vec<_>>()
        );
    }
}
