//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 跨 crate e2e 测试 (config -> script -> files)
//! - 并发性质：顺序、完整性、取消、空输入

#[cfg(test)]
mod contract_tests {
    use contracts::{Message, Payload, Pipe};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_message_snapshot() {
        let msg = Message::with_id("m-1", "hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "m-1", "data": {"kind": "text", "value": "hello"}})
        );
        assert_eq!(msg.data, Payload::Text("hello".into()));
    }

    #[tokio::test]
    async fn test_pipe_close_is_idempotent() {
        let pipe = Pipe::new();
        assert!(pipe.close());
        assert!(!pipe.close());
        assert!(pipe.is_closed());

        // done fires once and stays fired
        tokio::time::timeout(std::time::Duration::from_millis(100), pipe.done().wait())
            .await
            .unwrap();
        assert!(pipe.outbound().is_closed());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{stage_fn, CancellationToken, Message, Pipe, PipelineError, Stage};
    use engine::{ChannelObserver, Debounce, Parallel, Pipeline, StageExt};
    use rand::Rng;
    use routines::{build_op, filter, transform, Script};
    use tempfile::TempDir;

    fn texts(items: &[&str]) -> Vec<Message> {
        items.iter().map(|s| Message::new(*s)).collect()
    }

    /// Feed `inputs` through `stage` on a fresh external pipe
    async fn drive(stage: &impl Stage, ctx: CancellationToken, inputs: Vec<Message>) -> Vec<Message> {
        let ext = Pipe::with_capacity(4);

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

    fn payload_texts(messages: &[Message]) -> Vec<String> {
        messages
            .iter()
            .filter_map(|m| m.payload::<String>())
            .collect()
    }

    /// End-to-end test: script file -> ConfigLoader -> Script -> output file
    ///
    /// 验证完整的数据流：
    /// 1. ConfigLoader 解析并校验 TOML
    /// 2. 每个 StageConfig 转换为 stage
    /// 3. Script 从文件读、写回文件
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_blueprint_pipeline() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("words.txt");
        let output = dir.path().join("out").join("words.txt");
        std::fs::write(&input, "  alpha \nbeta\n gamma\n").unwrap();

        let blueprint = ConfigLoader::load_from_str(
            r#"
[[stages]]
op = "trim"

[[stages]]
op = "uppercase"

[[stages]]
op = "prefix"
value = "> "
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let script = blueprint
            .stages
            .iter()
            .fold(Script::new().file_in(&input).file_out(&output), |s, cfg| {
                s.chain(build_op(cfg))
            });
        let snapshot = script.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(snapshot.messages_in, 3);
        assert_eq!(snapshot.messages_out, 3);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "> ALPHA\n> BETA\n> GAMMA\n"
        );
    }

    #[tokio::test]
    async fn test_pipeline_order_preserved() {
        let pipeline = Pipeline::new()
            .with_capacity(2)
            .chain(transform(|s: String| s.to_uppercase()))
            .chain(transform(|s: String| format!("{s}!")));

        let inputs: Vec<String> = (0..50).map(|i| format!("m{i}")).collect();
        let refs: Vec<&str> = inputs.iter().map(String::as_str).collect();
        let out = drive(&pipeline, CancellationToken::new(), texts(&refs)).await;

        let expected: Vec<String> = inputs.iter().map(|s| format!("{}!", s.to_uppercase())).collect();
        assert_eq!(payload_texts(&out), expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_with_random_delays_is_complete() {
        let slow_square = stage_fn("slow_square", |ctx: CancellationToken, pipe: Pipe| async move {
            while let Some(msg) = pipe.inbound().recv_until(&ctx).await {
                let jitter = rand::rng().random_range(0..3u64);
                tokio::time::sleep(Duration::from_millis(jitter)).await;
                let n = msg.payload::<i64>().unwrap_or_default();
                if pipe.outbound().send_until(&ctx, msg.map(n * n)).await.is_err() {
                    break;
                }
            }
            pipe.close();
            Ok(())
        });

        let stage = slow_square.parallel(5).with_capacity(2);
        let inputs: Vec<Message> = (0..200i64).map(Message::new).collect();
        let out = drive(&stage, CancellationToken::new(), inputs).await;

        let mut values: Vec<i64> = out.iter().filter_map(|m| m.payload::<i64>()).collect();
        values.sort_unstable();
        assert_eq!(values, (0..200i64).map(|n| n * n).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_empty_input_everywhere() {
        let pipeline = Pipeline::new()
            .chain(Parallel::new(transform(|s: String| s), 3))
            .chain(Debounce::new(Duration::from_millis(50)))
            .chain(filter(|s: &String| !s.is_empty()));

        let out = tokio::time::timeout(
            Duration::from_secs(2),
            drive(&pipeline, CancellationToken::new(), Vec::new()),
        )
        .await
        .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_debounce_in_script_timing() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.txt");
        std::fs::write(&input, "a\nb\nc\n").unwrap();

        let started = Instant::now();
        let text = Script::new()
            .file_in(&input)
            .debounce(Duration::from_millis(100))
            .to_text(&CancellationToken::new())
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(text, "a\nb\nc\n");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancellation_yields_prefix() {
        let counter = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&counter);
        let counting = transform(move |n: i64| {
            seen.fetch_add(1, Ordering::SeqCst);
            n
        });

        let pipeline = Pipeline::new()
            .chain(Debounce::new(Duration::from_millis(20)))
            .chain(counting);

        let ctx = CancellationToken::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(110)).await;
            canceller.cancel();
        });

        let inputs: Vec<Message> = (0..100i64).map(Message::new).collect();
        let started = Instant::now();
        let out = drive(&pipeline, ctx, inputs).await;

        assert!(started.elapsed() < Duration::from_secs(1));
        let values: Vec<i64> = out.iter().filter_map(|m| m.payload::<i64>()).collect();
        assert!(values.len() < 100);
        assert_eq!(values, (0..values.len() as i64).collect::<Vec<_>>());
        assert!(counter.load(Ordering::SeqCst) >= values.len() as u64);
    }

    #[tokio::test]
    async fn test_strict_failure_detection() {
        let (observer, mut failures) = ChannelObserver::new();
        let broken = stage_fn("broken", |_ctx: CancellationToken, _pipe: Pipe| async move {
            Err(PipelineError::stage("broken", "disk on fire"))
        });

        let pipeline = Pipeline::new()
            .with_observer(Arc::new(observer))
            .chain(transform(|s: String| s))
            .chain(broken);

        let out = tokio::time::timeout(
            Duration::from_secs(2),
            drive(&pipeline, CancellationToken::new(), texts(&["a", "b"])),
        )
        .await
        .unwrap();

        assert!(out.is_empty());
        let failure = failures.try_recv().unwrap();
        assert_eq!(failure.stage, "broken");
        assert!(failure.error.to_string().contains("disk on fire"));
        assert_eq!(pipeline.metrics().snapshot().stage_failures, 1);
    }

    #[tokio::test]
    async fn test_nested_pipelines() {
        let inner = Pipeline::new()
            .with_name("inner")
            .chain(transform(|s: String| s.to_uppercase()));
        let outer = Pipeline::new()
            .with_name("outer")
            .chain(inner)
            .chain(transform(|s: String| format!("<{s}>")));

        let out = drive(&outer, CancellationToken::new(), texts(&["x", "y"])).await;
        assert_eq!(payload_texts(&out), vec!["<X>", "<Y>"]);
        assert_eq!(outer.metrics().snapshot().messages_out, 2);
    }

    #[tokio::test]
    async fn test_json_config_round_trip_drives_script() {
        let blueprint = ConfigLoader::load_from_str(
            r#"{"stages": [{"op": "contains", "value": "keep"}, {"op": "suffix", "value": ";"}]}"#,
            ConfigFormat::Json,
        )
        .unwrap();
        let toml = ConfigLoader::to_toml(&blueprint).unwrap();
        let reloaded = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(reloaded.stages.len(), 2);

        let pipeline = reloaded
            .stages
            .iter()
            .fold(Pipeline::new(), |p, cfg| p.chain(build_op(cfg)));
        let out = drive(
            &pipeline,
            CancellationToken::new(),
            texts(&["keep me", "drop me", "keep too"]),
        )
        .await;
        assert_eq!(payload_texts(&out), vec!["keep me;", "keep too;"]);
    }
}
