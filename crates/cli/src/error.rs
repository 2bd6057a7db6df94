//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Script file not found
    #[error("Script file not found: {path}")]
    ConfigNotFound { path: String },

    /// A source or sink needs a path the script does not give
    #[error("Missing path for {field}")]
    MissingPath { field: String },

    /// One or more stages reported an error during the run
    #[error("{count} stage(s) failed during the run")]
    StageFailures { count: usize },

    /// Pipeline execution error
    #[error("Pipeline execution failed: {message}")]
    PipelineExecution { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn missing_path(field: impl Into<String>) -> Self {
        Self::MissingPath {
            field: field.into(),
        }
    }

    pub fn pipeline_execution(message: impl Into<String>) -> Self {
        Self::PipelineExecution {
            message: message.into(),
        }
    }
}

impl From<contracts::PipelineError> for CliError {
    fn from(e: contracts::PipelineError) -> Self {
        Self::pipeline_execution(e.to_string())
    }
}
