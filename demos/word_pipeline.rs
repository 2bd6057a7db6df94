//! Word Pipeline Demo
//!
//! Builds a script from a TOML file (or a built-in one), runs it over a
//! generated word list and prints the result.
//!
//! Run with: cargo run -p conduit_demos --bin word_pipeline [script.toml]

use std::time::Duration;

use config_loader::{ConfigFormat, ConfigLoader};
use contracts::CancellationToken;
use engine::StageExt;
use routines::{build_op, Script};

const BUILTIN_SCRIPT: &str = r#"
[runtime]
channel_capacity = 8

[[stages]]
op = "trim"

[[stages]]
name = "only-a"
op = "contains"
value = "a"

[[stages]]
name = "shout"
op = "uppercase"
parallel = 4

[[stages]]
op = "prefix"
value = "* "
debounce_ms = 10
"#;

const WORDS: &[&str] = &[
    "  banana ", "cherry", "apple", "kiwi", " mango", "plum", "papaya ", "fig", "grape",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting Word Pipeline Demo");

    // ==== Stage 1: Load the script ====
    let blueprint = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading script");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        ConfigLoader::load_from_str(BUILTIN_SCRIPT, ConfigFormat::Toml)?
    };

    // ==== Stage 2: Prepare input ====
    let dir = std::env::temp_dir().join(format!("conduit-demo-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let input = dir.join("words.txt");
    std::fs::write(&input, WORDS.join("\n"))?;

    // ==== Stage 3: Assemble the script ====
    let mut script = Script::new()
        .with_name("word_demo")
        .with_capacity(blueprint.runtime.channel_capacity)
        .file_in(&input);

    for config in &blueprint.stages {
        let mut stage = build_op(config);
        if let Some(ms) = config.debounce_ms {
            stage = std::sync::Arc::new(stage.debounced(Duration::from_millis(ms)));
        }
        script = match config.parallel {
            Some(workers) => script.parallel(stage, workers),
            None => script.chain(stage),
        };
    }
    tracing::info!(script = ?script, "Script assembled");

    // ==== Stage 4: Run ====
    let ctx = CancellationToken::new();
    let messages = script.collect(&ctx).await?;

    println!("\n=== Output ({} messages) ===", messages.len());
    for msg in &messages {
        if let Some(text) = msg.payload::<String>() {
            println!("{text}");
        }
    }

    std::fs::remove_dir_all(&dir)?;
    tracing::info!("Demo finished");
    Ok(())
}
