//! Layered error definitions
//!
//! Categorized by source: config / transport / payload / codec / stage

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum PipelineError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Transport Errors =====
    /// The queue was closed while a send was pending
    #[error("channel closed")]
    ChannelClosed,

    /// The surrounding context was cancelled
    #[error("operation cancelled")]
    Cancelled,

    // ===== Payload Errors =====
    /// Payload did not hold the expected variant
    #[error("payload type mismatch: expected {expected}, found {found}")]
    PayloadType {
        expected: &'static str,
        found: &'static str,
    },

    // ===== Codec Errors =====
    /// Encoding or decoding failed
    #[error("codec '{codec}' error: {message}")]
    Codec { codec: String, message: String },

    // ===== Stage Errors =====
    /// A stage failed while processing
    #[error("stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl PipelineError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create codec error
    pub fn codec(codec: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Codec {
            codec: codec.into(),
            message: message.into(),
        }
    }

    /// Create stage error
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Whether this error only reports that the context was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
