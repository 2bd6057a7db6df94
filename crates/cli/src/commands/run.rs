//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{CancellationToken, ScriptBlueprint};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Orchestrator, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading script");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load script from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(size) = args.buffer_size {
        info!(buffer_size = size, "Overriding channel capacity from CLI");
        blueprint.runtime.channel_capacity = size;
    }
    if let Some(secs) = args.timeout {
        info!(timeout_secs = secs, "Overriding timeout from CLI");
        blueprint.runtime.timeout_secs = (secs > 0).then_some(secs);
    }
    config_loader::ConfigLoader::validate(&blueprint).context("Invalid CLI override")?;

    info!(
        source = ?blueprint.source.kind,
        sink = ?blueprint.sink.kind,
        stages = blueprint.stages.len(),
        channel_capacity = blueprint.runtime.channel_capacity,
        "Script loaded"
    );

    if args.dry_run {
        info!("Dry run mode - script is valid, exiting");
        print_script_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        timeout: blueprint.runtime.timeout_secs.map(Duration::from_secs),
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
        blueprint,
    };

    let ctx = CancellationToken::new();
    let signal_ctx = ctx.clone();
    let signal_task = tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_signal() => {
                warn!("Received shutdown signal, stopping script...");
                signal_ctx.cancel();
            }
            _ = signal_ctx.cancelled() => {}
        }
    });

    info!("Starting script...");
    let result = Orchestrator::new(pipeline_config).run(ctx.clone()).await;
    signal_task.abort();

    let stats = result.context("Script execution failed")?;
    stats.print_summary();

    if !stats.failures.is_empty() {
        return Err(CliError::StageFailures {
            count: stats.failures.len(),
        }
        .into());
    }

    info!("Conduit finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print script summary for dry-run mode
fn print_script_summary(blueprint: &ScriptBlueprint) {
    println!("\n=== Script Summary ===\n");
    println!("Runtime:");
    println!("  Channel capacity: {}", blueprint.runtime.channel_capacity);
    match blueprint.runtime.timeout_secs {
        Some(secs) => println!("  Timeout: {}s", secs),
        None => println!("  Timeout: none"),
    }

    println!("\nSource: {:?} ({:?})", blueprint.source.kind, blueprint.source.codec);
    if let Some(ref path) = blueprint.source.path {
        println!("  Path: {}", path);
    }

    println!("\nStages ({}):", blueprint.stages.len());
    for stage in &blueprint.stages {
        let mut extras = Vec::new();
        if let Some(workers) = stage.parallel {
            extras.push(format!("parallel={}", workers));
        }
        if let Some(ms) = stage.debounce_ms {
            extras.push(format!("debounce={}ms", ms));
        }
        if extras.is_empty() {
            println!("  - {} ({})", stage.display_name(), stage.op.kind());
        } else {
            println!(
                "  - {} ({}) [{}]",
                stage.display_name(),
                stage.op.kind(),
                extras.join(", ")
            );
        }
    }

    println!("\nSink: {:?} ({:?})", blueprint.sink.kind, blueprint.sink.codec);
    if let Some(ref path) = blueprint.sink.path {
        println!("  Path: {}", path);
        println!("  Append: {}", blueprint.sink.append);
    }

    println!();
}
