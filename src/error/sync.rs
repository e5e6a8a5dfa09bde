//! Sync errors

use super::MlboxError;

/// Creates a row sync failed error
pub fn rows_failed(bundle: impl Into<String>, reason: impl Into<String>) -> MlboxError {
    MlboxError::RowSyncFailed {
        bundle: bundle.into(),
        reason: reason.into(),
    }
}

/// Creates a transfer failed error
pub fn transfer_failed(name: impl Into<String>, reason: impl Into<String>) -> MlboxError {
    MlboxError::TransferFailed {
        name: name.into(),
        reason: reason.into(),
    }
}
