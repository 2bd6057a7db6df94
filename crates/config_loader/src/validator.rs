//! 配置校验模块
//!
//! 校验规则：
//! - runtime.channel_capacity >= 1, timeout_secs > 0
//! - file 类型的 source/sink 必须指定 path
//! - 显式指定的 stage 名称唯一
//! - parallel >= 1, debounce_ms > 0
//! - prefix/suffix/contains 的 value 非空

use std::collections::HashSet;

use contracts::{
    PipelineError, ScriptBlueprint, SinkKind, SourceKind, StageConfig, StageOp,
};

/// 校验 ScriptBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &ScriptBlueprint) -> Result<(), PipelineError> {
    validate_runtime(blueprint)?;
    validate_source(blueprint)?;
    validate_sink(blueprint)?;
    validate_stage_names(blueprint)?;
    for (idx, stage) in blueprint.stages.iter().enumerate() {
        validate_stage(idx, stage)?;
    }
    Ok(())
}

/// 校验运行时参数
fn validate_runtime(blueprint: &ScriptBlueprint) -> Result<(), PipelineError> {
    let runtime = &blueprint.runtime;

    if runtime.channel_capacity == 0 {
        return Err(PipelineError::config_validation(
            "runtime.channel_capacity",
            "channel_capacity must be >= 1",
        ));
    }

    if runtime.timeout_secs == Some(0) {
        return Err(PipelineError::config_validation(
            "runtime.timeout_secs",
            "timeout_secs must be > 0",
        ));
    }

    Ok(())
}

/// 校验输入源
fn validate_source(blueprint: &ScriptBlueprint) -> Result<(), PipelineError> {
    let source = &blueprint.source;
    if source.kind == SourceKind::File && is_blank(source.path.as_deref()) {
        return Err(PipelineError::config_validation(
            "source.path",
            "file source requires a path",
        ));
    }
    Ok(())
}

/// 校验输出目标
fn validate_sink(blueprint: &ScriptBlueprint) -> Result<(), PipelineError> {
    let sink = &blueprint.sink;
    if sink.kind == SinkKind::File && is_blank(sink.path.as_deref()) {
        return Err(PipelineError::config_validation(
            "sink.path",
            "file sink requires a path",
        ));
    }
    if sink.kind == SinkKind::Stdout && sink.append {
        return Err(PipelineError::config_validation(
            "sink.append",
            "append only applies to file sinks",
        ));
    }
    Ok(())
}

/// 校验 stage 名称唯一性 (仅显式指定的名称)
fn validate_stage_names(blueprint: &ScriptBlueprint) -> Result<(), PipelineError> {
    let mut seen = HashSet::new();
    for (idx, stage) in blueprint.stages.iter().enumerate() {
        let Some(name) = &stage.name else {
            continue;
        };
        if name.is_empty() {
            return Err(PipelineError::config_validation(
                format!("stages[{idx}].name"),
                "stage name cannot be empty",
            ));
        }
        if !seen.insert(name) {
            return Err(PipelineError::config_validation(
                format!("stages[name={name}]"),
                "duplicate stage name",
            ));
        }
    }
    Ok(())
}

/// 校验单个 stage
fn validate_stage(idx: usize, stage: &StageConfig) -> Result<(), PipelineError> {
    if stage.parallel == Some(0) {
        return Err(PipelineError::config_validation(
            format!("stages[{idx}].parallel"),
            "parallel must be >= 1",
        ));
    }

    if stage.debounce_ms == Some(0) {
        return Err(PipelineError::config_validation(
            format!("stages[{idx}].debounce_ms"),
            "debounce_ms must be > 0",
        ));
    }

    let empty_value = match &stage.op {
        StageOp::Prefix { value } | StageOp::Suffix { value } | StageOp::Contains { value } => {
            value.is_empty()
        }
        StageOp::Replace { from, .. } => from.is_empty(),
        _ => false,
    };
    if empty_value {
        return Err(PipelineError::config_validation(
            format!("stages[{idx}].{}", stage.op.kind()),
            format!("{} requires a non-empty value", stage.op.kind()),
        ));
    }

    Ok(())
}

fn is_blank(path: Option<&str>) -> bool {
    path.map(str::trim).is_none_or(str::is_empty)
}
