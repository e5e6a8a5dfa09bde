//! Manifest errors

use super::MlboxError;

/// Creates a manifest missing error
pub fn missing(path: impl Into<String>) -> MlboxError {
    MlboxError::ManifestMissing { path: path.into() }
}

/// Creates a manifest parse failed error
pub fn parse_failed(path: impl Into<String>, reason: impl Into<String>) -> MlboxError {
    MlboxError::ManifestParseFailed {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates a manifest write failed error
pub fn write_failed(path: impl Into<String>, reason: impl Into<String>) -> MlboxError {
    MlboxError::ManifestWriteFailed {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates an invalid signature entry error
pub fn invalid_signature(entry: impl Into<String>, reason: impl Into<String>) -> MlboxError {
    MlboxError::InvalidSignature {
        entry: entry.into(),
        reason: reason.into(),
    }
}

/// Creates an unsupported hash algorithm error
pub fn unsupported_algorithm(
    algorithm: impl Into<String>,
    expected: impl Into<String>,
) -> MlboxError {
    MlboxError::UnsupportedAlgorithm {
        algorithm: algorithm.into(),
        expected: expected.into(),
    }
}
