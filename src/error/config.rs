//! Configuration errors

use super::MlboxError;

/// Creates an invalid config error
pub fn invalid(message: impl Into<String>) -> MlboxError {
    MlboxError::ConfigInvalid {
        message: message.into(),
    }
}

/// Creates an unsupported platform error
pub fn unsupported_platform(message: impl Into<String>) -> MlboxError {
    MlboxError::UnsupportedPlatform {
        message: message.into(),
    }
}

/// Creates an unsupported task kind error
pub fn unsupported_task_kind(kind: impl Into<String>) -> MlboxError {
    MlboxError::UnsupportedTaskKind { kind: kind.into() }
}
