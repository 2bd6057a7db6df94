//! Pipe - the per-stage wiring
//!
//! A stage reads from `inbound`, writes to `outbound` and announces
//! completion through `done`. Pipes are chained by splicing one pipe's
//! outbound onto the next pipe's inbound, so adjacent stages share a
//! single bounded queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::{Receiver, Sender, TrySendError};
use tokio_util::sync::CancellationToken;

use crate::{Message, PipelineError, Result};

/// Bounded MPMC message queue
///
/// Both ends are held, so the queue only closes when someone calls
/// [`Queue::close`]. Buffered messages remain receivable after close.
#[derive(Debug, Clone)]
pub struct Queue {
    tx: Sender<Message>,
    rx: Receiver<Message>,
}

impl Queue {
    /// Create a queue holding at most `capacity` messages (minimum 1)
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        Self { tx, rx }
    }

    /// Send, waiting for space
    pub async fn send(&self, msg: Message) -> Result<()> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| PipelineError::ChannelClosed)
    }

    /// Send without waiting
    pub fn try_send(&self, msg: Message) -> std::result::Result<(), TrySendError<Message>> {
        self.tx.try_send(msg)
    }

    /// Receive the next message; `None` once closed and drained
    pub async fn recv(&self) -> Option<Message> {
        self.rx.recv().await.ok()
    }

    /// Send, giving up when `ctx` is cancelled
    pub async fn send_until(&self, ctx: &CancellationToken, msg: Message) -> Result<()> {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(PipelineError::Cancelled),
            res = self.tx.send(msg) => res.map_err(|_| PipelineError::ChannelClosed),
        }
    }

    /// Receive, giving up when `ctx` is cancelled
    pub async fn recv_until(&self, ctx: &CancellationToken) -> Option<Message> {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => None,
            res = self.rx.recv() => res.ok(),
        }
    }

    /// Close the queue. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        self.tx.close()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Number of buffered messages
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(usize::MAX)
    }
}

/// One-shot completion broadcast
#[derive(Debug, Clone, Default)]
pub struct DoneSignal {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl DoneSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Returns `true` only for the first call.
    pub fn fire(&self) -> bool {
        let first = !self.fired.swap(true, Ordering::AcqRel);
        if first {
            self.token.cancel();
        }
        first
    }

    /// Wait until the signal fires
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// Stage wiring: inbound queue, outbound queue, done signal
#[derive(Debug, Clone)]
pub struct Pipe {
    inbound: Queue,
    outbound: Queue,
    done: DoneSignal,
}

impl Default for Pipe {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipe {
    /// Pipe with unit-capacity queues
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inbound: Queue::bounded(capacity),
            outbound: Queue::bounded(capacity),
            done: DoneSignal::new(),
        }
    }

    /// Queue this pipe's stage reads from
    pub fn inbound(&self) -> &Queue {
        &self.inbound
    }

    /// Queue this pipe's stage writes to
    pub fn outbound(&self) -> &Queue {
        &self.outbound
    }

    pub fn done(&self) -> &DoneSignal {
        &self.done
    }

    /// Splice this pipe's outbound onto `next`'s inbound
    pub fn chain(&mut self, next: &Pipe) {
        self.outbound = next.inbound.clone();
    }

    /// Fire `done` and close `outbound`. Returns `true` only for the first call.
    pub fn close(&self) -> bool {
        let fired = self.done.fire();
        self.outbound.close();
        fired
    }

    pub fn is_closed(&self) -> bool {
        self.done.is_fired()
    }
}
