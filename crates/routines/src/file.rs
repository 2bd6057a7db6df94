//! File source and sink stages

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use contracts::{CancellationToken, Pipe, PipelineError, Result, Stage};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{BufReader, BufWriter};
use tracing::{debug, instrument};

use crate::codec::{drain_into, ReadCodec, WriteCodec};

/// How a [`FileSink`] opens its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileMode {
    #[default]
    Truncate,
    Append,
}

/// Decode a file into messages
///
/// Ignores its inbound queue. The pipe is closed once the file is exhausted,
/// on cancellation, and on error.
#[derive(Debug, Clone)]
pub struct FileSource<C> {
    name: String,
    path: PathBuf,
    codec: C,
}

impl<C: ReadCodec> FileSource<C> {
    pub fn new(path: impl Into<PathBuf>, codec: C) -> Self {
        let path = path.into();
        Self {
            name: format!("file_source({})", path.display()),
            path,
            codec,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self, ctx: &CancellationToken, pipe: &Pipe) -> Result<u64> {
        let file = File::open(&self.path)
            .await
            .map_err(|e| io_error(&self.name, "open", &self.path, e))?;
        self.codec
            .decode(ctx, BufReader::new(file), pipe.outbound())
            .await
    }
}

#[async_trait]
impl<C> Stage for FileSource<C>
where
    C: ReadCodec + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "file_source", skip_all, fields(path = %self.path.display(), codec = self.codec.name()))]
    async fn run(&self, ctx: CancellationToken, pipe: Pipe) -> Result<()> {
        let result = self.read(&ctx, &pipe).await;
        pipe.close();
        let count = result?;
        debug!(messages = count, "File decoded");
        Ok(())
    }
}

/// Encode messages into a file
///
/// Missing parent directories are created. Each run encodes with a fresh
/// clone of the codec.
#[derive(Debug, Clone)]
pub struct FileSink<C> {
    name: String,
    path: PathBuf,
    codec: C,
    mode: FileMode,
}

impl<C: WriteCodec + Clone> FileSink<C> {
    pub fn new(path: impl Into<PathBuf>, codec: C) -> Self {
        let path = path.into();
        Self {
            name: format!("file_sink({})", path.display()),
            path,
            codec,
            mode: FileMode::Truncate,
        }
    }

    pub fn with_mode(mut self, mode: FileMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    async fn open(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| io_error(&self.name, "create directory for", &self.path, e))?;
            }
        }

        let mut options = OpenOptions::new();
        options.create(true);
        match self.mode {
            FileMode::Truncate => options.write(true).truncate(true),
            FileMode::Append => options.append(true),
        };
        options
            .open(&self.path)
            .await
            .map_err(|e| io_error(&self.name, "open", &self.path, e))
    }

    async fn write(&self, ctx: &CancellationToken, pipe: &Pipe) -> Result<u64> {
        let mut writer = BufWriter::new(self.open().await?);
        let mut codec = self.codec.clone();
        drain_into(ctx, pipe.inbound(), &mut codec, &mut writer).await
    }
}

#[async_trait]
impl<C> Stage for FileSink<C>
where
    C: WriteCodec + Clone + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "file_sink", skip_all, fields(path = %self.path.display(), codec = self.codec.name()))]
    async fn run(&self, ctx: CancellationToken, pipe: Pipe) -> Result<()> {
        let result = self.write(&ctx, &pipe).await;
        pipe.close();
        let count = result?;
        debug!(messages = count, mode = ?self.mode, "File written");
        Ok(())
    }
}

fn io_error(stage: &str, action: &str, path: &Path, e: std::io::Error) -> PipelineError {
    PipelineError::stage(stage, format!("failed to {action} {}: {e}", path.display()))
}
