//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::ScriptBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Script info for JSON output
#[derive(Serialize)]
struct ScriptInfo {
    version: String,
    runtime: RuntimeInfo,
    source: EndpointInfo,
    stages: Vec<StageInfo>,
    sink: EndpointInfo,
}

#[derive(Serialize)]
struct RuntimeInfo {
    channel_capacity: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
}

#[derive(Serialize)]
struct EndpointInfo {
    kind: String,
    codec: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

#[derive(Serialize)]
struct StageInfo {
    name: String,
    op: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parallel: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    debounce_ms: Option<u64>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading script info");

    if !args.config.exists() {
        anyhow::bail!("Script file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load script from {}", args.config.display()))?;

    if args.json {
        let info = build_script_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize script info")?;
        println!("{}", json);
    } else {
        print_script_info(&blueprint);
    }

    Ok(())
}

fn build_script_info(blueprint: &ScriptBlueprint) -> ScriptInfo {
    ScriptInfo {
        version: format!("{:?}", blueprint.version),
        runtime: RuntimeInfo {
            channel_capacity: blueprint.runtime.channel_capacity,
            timeout_secs: blueprint.runtime.timeout_secs,
        },
        source: EndpointInfo {
            kind: format!("{:?}", blueprint.source.kind),
            codec: format!("{:?}", blueprint.source.codec),
            path: blueprint.source.path.clone(),
        },
        stages: blueprint
            .stages
            .iter()
            .map(|s| StageInfo {
                name: s.display_name(),
                op: s.op.kind().to_string(),
                parallel: s.parallel,
                debounce_ms: s.debounce_ms,
            })
            .collect(),
        sink: EndpointInfo {
            kind: format!("{:?}", blueprint.sink.kind),
            codec: format!("{:?}", blueprint.sink.codec),
            path: blueprint.sink.path.clone(),
        },
    }
}

fn print_script_info(blueprint: &ScriptBlueprint) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                    Conduit Script                            ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Runtime");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Channel capacity: {}", blueprint.runtime.channel_capacity);
    match blueprint.runtime.timeout_secs {
        Some(secs) => println!("   └─ Timeout: {}s", secs),
        None => println!("   └─ Timeout: none"),
    }

    println!("\n📥 Source");
    println!(
        "   └─ {:?} ({:?}){}",
        blueprint.source.kind,
        blueprint.source.codec,
        blueprint
            .source
            .path
            .as_ref()
            .map(|p| format!(" {}", p))
            .unwrap_or_default()
    );

    println!("\n🔗 Stages ({})", blueprint.stages.len());
    for (i, stage) in blueprint.stages.iter().enumerate() {
        let is_last = i == blueprint.stages.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let workers = stage
            .parallel
            .map(|n| format!(" ×{}", n))
            .unwrap_or_default();
        let delay = stage
            .debounce_ms
            .map(|ms| format!(" +{}ms", ms))
            .unwrap_or_default();
        println!(
            "   {} {} ({}){}{}",
            prefix,
            stage.display_name(),
            stage.op.kind(),
            workers,
            delay
        );
    }

    println!("\n📤 Sink");
    println!(
        "   └─ {:?} ({:?}){}{}",
        blueprint.sink.kind,
        blueprint.sink.codec,
        blueprint
            .sink
            .path
            .as_ref()
            .map(|p| format!(" {}", p))
            .unwrap_or_default(),
        if blueprint.sink.append { " [append]" } else { "" }
    );

    println!();
}
