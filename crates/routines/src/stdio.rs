//! Standard input / output adapters

use async_trait::async_trait;
use contracts::{CancellationToken, Pipe, Result, Stage};
use tokio::io::{self, BufReader, BufWriter};
use tracing::debug;

use crate::codec::{drain_into, LineCodec, ReadCodec, WriteCodec};

/// Decode stdin into messages
#[derive(Debug, Clone)]
pub struct StdinSource<C = LineCodec> {
    codec: C,
}

impl<C: ReadCodec> StdinSource<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }
}

impl Default for StdinSource<LineCodec> {
    fn default() -> Self {
        Self::new(LineCodec)
    }
}

#[async_trait]
impl<C> Stage for StdinSource<C>
where
    C: ReadCodec + Sync + 'static,
{
    fn name(&self) -> &str {
        "stdin"
    }

    async fn run(&self, ctx: CancellationToken, pipe: Pipe) -> Result<()> {
        let reader = BufReader::new(io::stdin());
        let result = self.codec.decode(&ctx, reader, pipe.outbound()).await;
        pipe.close();
        debug!(codec = self.codec.name(), messages = ?result.as_ref().ok(), "Stdin exhausted");
        result.map(|_| ())
    }
}

/// Encode messages onto stdout
#[derive(Debug, Clone)]
pub struct StdoutSink<C = LineCodec> {
    codec: C,
}

impl<C: WriteCodec + Clone> StdoutSink<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }
}

impl Default for StdoutSink<LineCodec> {
    fn default() -> Self {
        Self::new(LineCodec)
    }
}

#[async_trait]
impl<C> Stage for StdoutSink<C>
where
    C: WriteCodec + Clone + Sync + 'static,
{
    fn name(&self) -> &str {
        "stdout"
    }

    async fn run(&self, ctx: CancellationToken, pipe: Pipe) -> Result<()> {
        let mut writer = BufWriter::new(io::stdout());
        let mut codec = self.codec.clone();
        let result = drain_into(&ctx, pipe.inbound(), &mut codec, &mut writer).await;
        pipe.close();
        result.map(|count| debug!(codec = self.codec.name(), messages = count, "Stdout drained"))
    }
}
