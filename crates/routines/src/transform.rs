//! Typed message stages
//!
//! Each stage is bound to one payload type at construction. Messages whose
//! payload does not match are forwarded unchanged (map, filter) or ignored
//! (reduce).

use std::marker::PhantomData;

use async_trait::async_trait;
use contracts::{CancellationToken, Message, PayloadType, Pipe, Result, Stage};
use tracing::{debug, trace};

/// Typed map stage
pub struct Transform<T, V, F> {
    name: String,
    f: F,
    _marker: PhantomData<fn(T) -> V>,
}

/// Map every `T` payload through `f`, keeping the message id
pub fn transform<T, V, F>(f: F) -> Transform<T, V, F>
where
    T: PayloadType,
    V: PayloadType,
    F: Fn(T) -> V + Send + Sync + 'static,
{
    Transform {
        name: "transform".to_string(),
        f,
        _marker: PhantomData,
    }
}

impl<T, V, F> Transform<T, V, F> {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl<T, V, F> Stage for Transform<T, V, F>
where
    T: PayloadType,
    V: PayloadType,
    F: Fn(T) -> V + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken, pipe: Pipe) -> Result<()> {
        let mut passed_through = 0u64;

        while let Some(msg) = pipe.inbound().recv_until(&ctx).await {
            let out = match T::from_payload(&msg.data) {
                Some(value) => {
                    let data = (self.f)(value).into_payload();
                    msg.map(data)
                }
                None => {
                    trace!(
                        stage = %self.name,
                        expected = T::KIND,
                        found = msg.data.kind(),
                        "Payload type mismatch, passing through"
                    );
                    passed_through += 1;
                    msg
                }
            };
            if pipe.outbound().send_until(&ctx, out).await.is_err() {
                break;
            }
        }

        pipe.close();
        if passed_through > 0 {
            debug!(stage = %self.name, passed_through, "Forwarded mismatched payloads");
        }
        Ok(())
    }
}

/// Typed filter stage
pub struct Filter<T, F> {
    name: String,
    predicate: F,
    _marker: PhantomData<fn(&T)>,
}

/// Keep `T` payloads for which `predicate` holds; other payloads pass through
pub fn filter<T, F>(predicate: F) -> Filter<T, F>
where
    T: PayloadType,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    Filter {
        name: "filter".to_string(),
        predicate,
        _marker: PhantomData,
    }
}

impl<T, F> Filter<T, F> {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl<T, F> Stage for Filter<T, F>
where
    T: PayloadType,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken, pipe: Pipe) -> Result<()> {
        while let Some(msg) = pipe.inbound().recv_until(&ctx).await {
            let keep = T::from_payload(&msg.data).is_none_or(|value| (self.predicate)(&value));
            if !keep {
                continue;
            }
            if pipe.outbound().send_until(&ctx, msg).await.is_err() {
                break;
            }
        }
        pipe.close();
        Ok(())
    }
}

/// Typed fold stage
pub struct Reduce<T, A, F> {
    name: String,
    f: F,
    init: A,
    _marker: PhantomData<fn(T)>,
}

/// Fold every `T` payload into an accumulator starting at `init`
///
/// A single message holding the accumulator is emitted once input is
/// exhausted. Nothing is emitted on cancellation.
pub fn reduce<T, A, F>(f: F, init: A) -> Reduce<T, A, F>
where
    T: PayloadType,
    A: PayloadType + Clone + Sync,
    F: Fn(A, T) -> A + Send + Sync + 'static,
{
    Reduce {
        name: "reduce".to_string(),
        f,
        init,
        _marker: PhantomData,
    }
}

impl<T, A, F> Reduce<T, A, F> {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl<T, A, F> Stage for Reduce<T, A, F>
where
    T: PayloadType,
    A: PayloadType + Clone + Sync,
    F: Fn(A, T) -> A + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken, pipe: Pipe) -> Result<()> {
        let mut acc = self.init.clone();
        let mut folded = 0u64;

        while let Some(msg) = pipe.inbound().recv_until(&ctx).await {
            if let Some(value) = T::from_payload(&msg.data) {
                acc = (self.f)(acc, value);
                folded += 1;
            }
        }

        if !ctx.is_cancelled() {
            debug!(stage = %self.name, folded, "Emitting reduced value");
            // a closed downstream just drops the result
            let _ = pipe
                .outbound()
                .send_until(&ctx, Message::new(acc.into_payload()))
                .await;
        }
        pipe.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Payload;
    use std::time::Duration;

    async fn run_with(stage: &impl Stage, inputs: Vec<Message>) -> Vec<Message> {
        let pipe = Pipe::with_capacity(inputs.len() + 1);
        for msg in inputs {
            pipe.inbound().send(msg).await.unwrap();
        }
        pipe.inbound().close();

        stage.run(CancellationToken::new(), pipe.clone()).await.unwrap();
        assert!(pipe.is_closed());

        let mut out = Vec::new();
        while let Some(msg) = pipe.outbound().recv().await {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn test_transform_maps_and_keeps_id() {
        let stage = transform(|s: String| s.len() as i64).with_name("len");
        assert_eq!(stage.name(), "len");

        let out = run_with(&stage, vec![Message::with_id("m1", "four")]).await;
        assert_eq!(out[0].id, "m1");
        assert_eq!(out[0].data, Payload::Int(4));
    }

    #[tokio::test]
    async fn test_transform_passes_mismatch_through() {
        let stage = transform(|s: String| s.to_uppercase());
        let out = run_with(
            &stage,
            vec![
                Message::with_id("a", "x"),
                Message::with_id("b", 7i64),
                Message::with_id("c", "y"),
            ],
        )
        .await;

        let data: Vec<_> = out.iter().map(|m| m.data.clone()).collect();
        assert_eq!(
            data,
            vec![
                Payload::Text("X".into()),
                Payload::Int(7),
                Payload::Text("Y".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_filter_keeps_matching_and_mismatched() {
        let stage = filter(|n: &i64| n % 2 == 0);
        let out = run_with(
            &stage,
            vec![
                Message::new(1i64),
                Message::new(2i64),
                Message::new("text"),
                Message::new(4i64),
            ],
        )
        .await;

        let data: Vec<_> = out.iter().map(|m| m.data.clone()).collect();
        assert_eq!(
            data,
            vec![Payload::Int(2), Payload::Text("text".into()), Payload::Int(4)]
        );
    }

    #[tokio::test]
    async fn test_reduce_emits_once() {
        let stage = reduce(|acc: i64, n: i64| acc + n, 0i64);
        let out = run_with(
            &stage,
            vec![Message::new(1i64), Message::new("skip"), Message::new(5i64)],
        )
        .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].data, Payload::Int(6));
    }

    #[tokio::test]
    async fn test_reduce_empty_input_emits_init() {
        let stage = reduce(|acc: String, s: String| acc + &s, String::from("init"));
        let out = run_with(&stage, Vec::new()).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload::<String>().unwrap(), "init");
    }

    #[tokio::test]
    async fn test_reduce_cancelled_emits_nothing() {
        let stage = reduce(|acc: i64, n: i64| acc + n, 0i64);
        let pipe = Pipe::with_capacity(2);
        let ctx = CancellationToken::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        stage.run(ctx, pipe.clone()).await.unwrap();
        assert!(pipe.outbound().recv().await.is_none());
    }
}
