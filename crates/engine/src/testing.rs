//! Shared helpers for unit tests

use std::time::Duration;

use contracts::{stage_fn, CancellationToken, Message, Pipe, PipelineError, Stage};

/// Text messages with ids "0", "1", ...
pub(crate) fn texts(items: &[&str]) -> Vec<Message> {
    items
        .iter()
        .enumerate()
        .map(|(i, s)| Message::with_id(i.to_string(), *s))
        .collect()
}

/// Integer messages 0..n with matching ids
pub(crate) fn ints(n: i64) -> Vec<Message> {
    (0..n).map(|i| Message::with_id(i.to_string(), i)).collect()
}

/// Order-preserving text map stage
pub(crate) fn map_text(name: &str, f: fn(&str) -> String) -> impl Stage {
    stage_fn(name, move |ctx: CancellationToken, pipe: Pipe| async move {
        while let Some(msg) = pipe.inbound().recv_until(&ctx).await {
            let out = match msg.payload::<String>() {
                Some(text) => msg.map(f(&text)),
                None => msg,
            };
            if pipe.outbound().send_until(&ctx, out).await.is_err() {
                break;
            }
        }
        pipe.close();
        Ok(())
    })
}

/// Integer map stage with a per-message delay
pub(crate) fn slow_double(delay: Duration) -> impl Stage {
    stage_fn("slow_double", move |ctx: CancellationToken, pipe: Pipe| async move {
        while let Some(msg) = pipe.inbound().recv_until(&ctx).await {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            let value = msg.payload::<i64>().unwrap_or_default();
            if pipe
                .outbound()
                .send_until(&ctx, msg.map(value * 2))
                .await
                .is_err()
            {
                break;
            }
        }
        pipe.close();
        Ok(())
    })
}

/// Stage that fails immediately without closing its pipe
pub(crate) fn failing(name: &str) -> impl Stage {
    let stage = name.to_string();
    stage_fn(name, move |_ctx: CancellationToken, _pipe: Pipe| {
        let stage = stage.clone();
        async move { Err(PipelineError::stage(stage, "boom")) }
    })
}

/// Feed `inputs` into a fresh external pipe, run `stage` against it and
/// collect everything that comes out.
pub(crate) async fn drive<S: Stage>(
    stage: &S,
    ctx: CancellationToken,
    inputs: Vec<Message>,
) -> Vec<Message> {
    let ext = Pipe::new();

    let feeder = {
        let inbound = ext.inbound().clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            for msg in inputs {
                if inbound.send_until(&ctx, msg).await.is_err() {
                    break;
                }
            }
            inbound.close();
        })
    };

    let collector = {
        let outbound = ext.outbound().clone();
        tokio::spawn(async move {
            let mut out = Vec::new();
            while let Some(msg) = outbound.recv().await {
                out.push(msg);
            }
            out
        })
    };

    stage.run(ctx, ext.clone()).await.unwrap();
    assert!(ext.is_closed());
    feeder.abort();
    collector.await.unwrap()
}

pub(crate) fn payload_texts(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|m| m.payload::<String>())
        .collect()
}
