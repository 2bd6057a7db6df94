//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{CodecKind, ScriptBlueprint, SourceKind};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ScriptSummary>,
}

#[derive(Serialize)]
struct ScriptSummary {
    version: String,
    source: String,
    sink: String,
    stage_count: usize,
    parallel_stages: usize,
    debounced_stages: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating script");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Script validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ScriptSummary {
                    version: format!("{:?}", blueprint.version),
                    source: format!("{:?}", blueprint.source.kind),
                    sink: format!("{:?}", blueprint.sink.kind),
                    stage_count: blueprint.stages.len(),
                    parallel_stages: blueprint
                        .stages
                        .iter()
                        .filter(|s| s.parallel.is_some())
                        .count(),
                    debounced_stages: blueprint
                        .stages
                        .iter()
                        .filter(|s| s.debounce_ms.is_some())
                        .count(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect non-fatal issues
fn collect_warnings(blueprint: &ScriptBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.stages.is_empty() {
        warnings.push("No stages configured - input is copied to output unchanged".to_string());
    }

    for stage in &blueprint.stages {
        if stage.parallel.is_some_and(|n| n > 1) {
            warnings.push(format!(
                "Stage '{}' runs in parallel - output order is not preserved",
                stage.display_name()
            ));
        }
    }

    if blueprint.sink.codec == CodecKind::JsonArray {
        warnings.push("json_array sink buffers every message until the run ends".to_string());
    }

    if blueprint.source.kind == SourceKind::Stdin && blueprint.runtime.timeout_secs.is_none() {
        warnings.push("stdin source without timeout - the run ends only at end of input".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Script is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Source: {}", summary.source);
            println!("  Sink: {}", summary.sink);
            println!("  Stages: {}", summary.stage_count);
            println!("  Parallel stages: {}", summary.parallel_stages);
            println!("  Debounced stages: {}", summary.debounced_stages);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Script is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
