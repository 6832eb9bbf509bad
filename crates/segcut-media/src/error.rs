//! Error types for media operations.

use std::path::PathBuf;

use segcut_models::Stage;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while preparing or running a segment job.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Folder is not writable")]
    FolderNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to clean up test file")]
    WriteTestCleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} not found in PATH", .0.label())]
    ToolNotFound(Stage),

    #[error("Error during {} processing: {source}", .stage.label())]
    Spawn {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    /// Stage exited unsuccessfully; `exit_code` is `None` when killed by a signal.
    #[error("{}", stage_failure_message(.stage, .exit_code))]
    StageFailed {
        stage: Stage,
        exit_code: Option<i32>,
    },

    #[error("{} {} stream was not captured", .stage.label(), .stream)]
    MissingStream { stage: Stage, stream: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn stage_failure_message(stage: &Stage, exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("{} process exited with code {}", stage.label(), code),
        None => format!("{} process was terminated by a signal", stage.label()),
    }
}

impl MediaError {
    /// Create a stage failure error.
    pub fn stage_failed(stage: Stage, exit_code: Option<i32>) -> Self {
        Self::StageFailed { stage, exit_code }
    }

    /// Create a spawn failure error.
    pub fn spawn(stage: Stage, source: std::io::Error) -> Self {
        Self::Spawn { stage, source }
    }

    /// Whether this error comes from the folder writability check.
    pub fn is_permission_error(&self) -> bool {
        matches!(
            self,
            MediaError::FolderNotWritable { .. } | MediaError::WriteTestCleanup { .. }
        )
    }

    /// Stage that produced the error, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            MediaError::ToolNotFound(stage)
            | MediaError::Spawn { stage, .. }
            | MediaError::StageFailed { stage, .. }
            | MediaError::MissingStream { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
