//! 声明式 `StageOp` 到具体 stage 的映射

use std::sync::Arc;

use contracts::{Stage, StageConfig, StageOp};

use crate::transform::{filter, transform};

/// Build the text stage described by `config`
///
/// All ops work on `Text` payloads; any other payload passes through.
/// Decorators (`parallel`, `debounce_ms`) are applied by the caller.
pub fn build_op(config: &StageConfig) -> Arc<dyn Stage> {
    let name = config.display_name();
    match config.op.clone() {
        StageOp::Identity => Arc::new(transform(|s: String| s).with_name(name)),
        StageOp::Uppercase => Arc::new(transform(|s: String| s.to_uppercase()).with_name(name)),
        StageOp::Lowercase => Arc::new(transform(|s: String| s.to_lowercase()).with_name(name)),
        StageOp::Trim => Arc::new(transform(|s: String| s.trim().to_string()).with_name(name)),
        StageOp::Prefix { value } => {
            Arc::new(transform(move |s: String| format!("{value}{s}")).with_name(name))
        }
        StageOp::Suffix { value } => {
            Arc::new(transform(move |s: String| format!("{s}{value}")).with_name(name))
        }
        StageOp::Replace { from, to } => {
            Arc::new(transform(move |s: String| s.replace(&from, &to)).with_name(name))
        }
        StageOp::Contains { value } => {
            Arc::new(filter(move |s: &String| s.contains(&value)).with_name(name))
        }
    }
}
