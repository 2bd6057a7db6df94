//! Queue-to-pipe forwarding task

use contracts::{CancellationToken, Pipe, Queue};

/// Copy every message from `from` into `to.outbound()`, then close `to`
///
/// Stops early on cancellation or when the destination is closed. `to` is
/// closed on every exit path.
pub(crate) async fn forward<F>(ctx: CancellationToken, from: Queue, to: Pipe, on_message: F)
where
    F: Fn(),
{
    while let Some(msg) = from.recv_until(&ctx).await {
        if to.outbound().send_until(&ctx, msg).await.is_err() {
            break;
        }
        on_message();
    }
    to.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Message;

    #[tokio::test]
    async fn test_forward_copies_and_closes() {
        let from = Queue::bounded(4);
        for i in 0..3i64 {
            from.send(Message::with_id(i.to_string(), i)).await.unwrap();
        }
        from.close();

        let to = Pipe::with_capacity(4);
        let count = std::sync::atomic::AtomicUsize::new(0);
        forward(CancellationToken::new(), from, to.clone(), || {
            count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        })
        .await;

        assert!(to.is_closed());
        assert_eq!(count.into_inner(), 3);
        let mut ids = Vec::new();
        while let Some(msg) = to.outbound().recv().await {
            ids.push(msg.id);
        }
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    #[tokio::test]
    async fn test_forward_closes_on_cancel() {
        let from = Queue::bounded(1);
        let to = Pipe::new();
        let ctx = CancellationToken::new();
        ctx.cancel();
        forward(ctx, from, to.clone(), || {}).await;
        assert!(to.is_closed());
    }
}
