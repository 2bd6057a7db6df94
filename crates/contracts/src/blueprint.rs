//! ScriptBlueprint - Config Loader 输出
//!
//! 描述一条完整的脚本：输入源、处理阶段、输出目标、运行时参数。

use serde::{Deserialize, Serialize};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的脚本配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 运行时参数
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// 输入源
    #[serde(default)]
    pub source: SourceConfig,

    /// 处理阶段 (按顺序串联)
    #[serde(default)]
    pub stages: Vec<StageConfig>,

    /// 输出目标
    #[serde(default)]
    pub sink: SinkConfig,
}

/// 运行时参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// 内部 pipe 容量，必须 >= 1
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// 整体超时 (秒)，超时后取消运行
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            timeout_secs: None,
        }
    }
}

fn default_channel_capacity() -> usize {
    1
}

/// 输入源配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// 输入类型
    #[serde(default)]
    pub kind: SourceKind,

    /// 文件路径 (kind = file 时必填)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// 解码方式
    #[serde(default)]
    pub codec: CodecKind,
}

/// 输入类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Stdin,
    File,
}

/// 输出目标配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SinkConfig {
    /// 输出类型
    #[serde(default)]
    pub kind: SinkKind,

    /// 文件路径 (kind = file 时必填)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// 编码方式
    #[serde(default)]
    pub codec: CodecKind,

    /// 追加写入 (仅 file)
    #[serde(default)]
    pub append: bool,
}

/// 输出类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    #[default]
    Stdout,
    File,
}

/// 编解码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    /// 每行一条消息
    #[default]
    Lines,
    /// 整个输入是一个 JSON 文档
    Json,
    /// 每行一个 JSON 文档
    JsonLines,
    /// 输出为 JSON 数组
    JsonArray,
    /// 整个输入作为一条消息
    Blob,
    /// CSV，每行一条消息 (JSON 字符串数组)
    Csv,
}

/// 处理阶段配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// 阶段名称 (可选，用于日志)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// 阶段操作
    #[serde(flatten)]
    pub op: StageOp,

    /// 并行 worker 数，必须 >= 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<usize>,

    /// 每条消息前的延迟 (毫秒)，必须 > 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
}

impl StageConfig {
    /// 显示名称：未指定时使用操作名
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.op.kind().to_string())
    }
}

/// 文本阶段操作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StageOp {
    /// 原样转发
    Identity,
    /// 转大写
    Uppercase,
    /// 转小写
    Lowercase,
    /// 去除首尾空白
    Trim,
    /// 添加前缀
    Prefix { value: String },
    /// 添加后缀
    Suffix { value: String },
    /// 子串替换
    Replace { from: String, to: String },
    /// 过滤：仅保留包含子串的文本
    Contains { value: String },
}

impl StageOp {
    /// 操作名
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Uppercase => "uppercase",
            Self::Lowercase => "lowercase",
            Self::Trim => "trim",
            Self::Prefix { .. } => "prefix",
            Self::Suffix { .. } => "suffix",
            Self::Replace { .. } => "replace",
            Self::Contains { .. } => "contains",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let blueprint: ScriptBlueprint = serde_json::from_str("{}").unwrap();
        assert_eq!(blueprint.version, ConfigVersion::V1);
        assert_eq!(blueprint.runtime.channel_capacity, 1);
        assert_eq!(blueprint.source.kind, SourceKind::Stdin);
        assert_eq!(blueprint.sink.kind, SinkKind::Stdout);
        assert_eq!(blueprint.sink.codec, CodecKind::Lines);
        assert!(blueprint.stages.is_empty());
    }

    #[test]
    fn test_stage_op_is_flattened() {
        let stage: StageConfig = serde_json::from_str(
            r#"{"name":"tag","op":"prefix","value":"> ","parallel":4}"#,
        )
        .unwrap();
        assert_eq!(
            stage.op,
            StageOp::Prefix {
                value: "> ".into()
            }
        );
        assert_eq!(stage.parallel, Some(4));
        assert_eq!(stage.display_name(), "tag");
    }

    #[test]
    fn test_display_name_falls_back_to_op() {
        let stage: StageConfig = serde_json::from_str(r#"{"op":"uppercase"}"#).unwrap();
        assert_eq!(stage.display_name(), "uppercase");
    }
}
