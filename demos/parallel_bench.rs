//! Parallel Bench
//!
//! Runs the same slow stage with different worker counts and reports the
//! wall-clock time of each round.
//!
//! Run with: cargo run -p conduit_demos --bin parallel_bench --release

use std::time::{Duration, Instant};

use contracts::{stage_fn, CancellationToken, Message, Pipe};
use engine::{Pipeline, StageExt};
use observability::RunningStats;

const MESSAGES: i64 = 200;
const ROUNDS: usize = 5;
const WORK: Duration = Duration::from_millis(2);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::init_with_config(observability::ObservabilityConfig::quiet())?;

    println!("messages={MESSAGES} rounds={ROUNDS} work={}ms", WORK.as_millis());
    println!("{:>8}  {}", "workers", "round time (ms)");

    for workers in [1usize, 2, 4, 8, 16] {
        let mut stats = RunningStats::default();
        for _ in 0..ROUNDS {
            let elapsed = run_round(workers).await?;
            stats.push(elapsed.as_secs_f64() * 1000.0);
        }
        println!("{:>8}  {}", workers, stats.summary());
    }

    Ok(())
}

async fn run_round(workers: usize) -> Result<Duration, Box<dyn std::error::Error>> {
    let slow = stage_fn("slow", |ctx: CancellationToken, pipe: Pipe| async move {
        while let Some(msg) = pipe.inbound().recv_until(&ctx).await {
            tokio::time::sleep(WORK).await;
            if pipe.outbound().send_until(&ctx, msg).await.is_err() {
                break;
            }
        }
        pipe.close();
        Ok(())
    });
    let pipeline = Pipeline::new()
        .with_name("bench")
        .with_capacity(16)
        .chain(slow.parallel(workers).with_capacity(4));

    let ext = Pipe::with_capacity(16);
    let ctx = CancellationToken::new();

    let feeder = {
        let inbound = ext.inbound().clone();
        tokio::spawn(async move {
            for i in 0..MESSAGES {
                if inbound.send(Message::new(i)).await.is_err() {
                    break;
                }
            }
            inbound.close();
        })
    };
    let drain = {
        let outbound = ext.outbound().clone();
        tokio::spawn(async move {
            let mut n = 0u64;
            while outbound.recv().await.is_some() {
                n += 1;
            }
            n
        })
    };

    let started = Instant::now();
    pipeline.start(&ctx, ext).await?;
    let elapsed = started.elapsed();

    feeder.await?;
    let received = drain.await?;
    if received != MESSAGES as u64 {
        return Err(format!("lost messages: {received}/{MESSAGES}").into());
    }
    Ok(elapsed)
}
