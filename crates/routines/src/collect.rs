//! Collector - in-memory sink stage

use std::sync::Arc;

use async_trait::async_trait;
use contracts::{CancellationToken, Message, Pipe, Result, Stage};
use tokio::sync::Mutex;

/// Sink that records every message it receives
#[derive(Debug, Clone)]
pub struct Collector {
    name: String,
    messages: Arc<Mutex<Vec<Message>>>,
}

/// Read side of a [`Collector`]
#[derive(Debug, Clone)]
pub struct CollectorHandle {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl Collector {
    pub fn new() -> (Self, CollectorHandle) {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let handle = CollectorHandle {
            messages: Arc::clone(&messages),
        };
        (
            Self {
                name: "collector".to_string(),
                messages,
            },
            handle,
        )
    }
}

impl CollectorHandle {
    /// Take everything recorded so far
    pub async fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.messages.lock().await)
    }

    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.lock().await.is_empty()
    }
}

#[async_trait]
impl Stage for Collector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken, pipe: Pipe) -> Result<()> {
        while let Some(msg) = pipe.inbound().recv_until(&ctx).await {
            self.messages.lock().await.push(msg);
        }
        pipe.close();
        Ok(())
    }
}
