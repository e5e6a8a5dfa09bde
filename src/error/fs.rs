//! File system errors

use std::path::Path;

use super::MlboxError;

/// Creates a file not found error
pub fn not_found(path: &Path) -> MlboxError {
    MlboxError::FileNotFound {
        path: path.display().to_string(),
    }
}

/// Creates a file read failed error
pub fn read_failed(path: &Path, err: impl ToString) -> MlboxError {
    MlboxError::FileReadFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Creates a file write failed error
pub fn write_failed(path: &Path, err: impl ToString) -> MlboxError {
    MlboxError::FileWriteFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
