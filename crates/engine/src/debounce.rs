//! Debounce - fixed per-message emission delay
//!
//! Every message is held for `delay` and then forwarded, one at a time.
//! Nothing is dropped and order is preserved.

use std::time::Duration;

use async_trait::async_trait;
use contracts::{CancellationToken, Pipe, Result, Stage};
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct Debounce {
    name: String,
    delay: Duration,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            name: format!("debounce({}ms)", delay.as_millis()),
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl Stage for Debounce {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "debounce_run", skip(self, ctx, pipe), fields(delay_ms = self.delay.as_millis() as u64))]
    async fn run(&self, ctx: CancellationToken, pipe: Pipe) -> Result<()> {
        let mut emitted = 0u64;

        while let Some(msg) = pipe.inbound().recv_until(&ctx).await {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => break,
                _ = tokio::time::sleep(self.delay) => {}
            }
            if pipe.outbound().send_until(&ctx, msg).await.is_err() {
                break;
            }
            emitted += 1;
        }

        pipe.close();
        debug!(emitted = emitted, "Debounce finished");
        Ok(())
    }
}
