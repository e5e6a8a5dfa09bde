//! Job errors

use super::MlboxError;

/// Wraps an error raised inside a pipeline stage
pub fn stage_failed(stage: impl Into<String>, source: MlboxError) -> MlboxError {
    MlboxError::StageFailed {
        stage: stage.into(),
        source: Box::new(source),
    }
}

/// Creates an extract failed error
pub fn extract_failed(reference: impl Into<String>, reason: impl Into<String>) -> MlboxError {
    MlboxError::ExtractFailed {
        reference: reference.into(),
        reason: reason.into(),
    }
}

/// Creates a process failed error
pub fn process_failed(command: impl Into<String>, reason: impl Into<String>) -> MlboxError {
    MlboxError::ProcessFailed {
        command: command.into(),
        reason: reason.into(),
    }
}

/// Creates a handler failed error
pub fn handler_failed(reason: impl Into<String>) -> MlboxError {
    MlboxError::HandlerFailed {
        reason: reason.into(),
    }
}
