//! Theme errors

use cadence_core::StorageError;
use thiserror::Error;

/// A persistence failure absorbed by [`TernaryDarkMode`](crate::TernaryDarkMode).
///
/// The in-memory mode is left as it was; the failed setter can be retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThemeError {
    /// Writing the selected mode failed
    #[error("failed to persist theme mode: {0}")]
    Persist(#[from] StorageError),

    /// The persisted mode could not be read back
    #[error("failed to load theme mode: {0}")]
    Load(StorageError),
}

impl ThemeError {
    /// The underlying storage failure
    pub fn storage_error(&self) -> &StorageError {
        match self {
            ThemeError::Persist(err) | ThemeError::Load(err) => err,
        }
    }
}

pub type ThemeResult<T> = std::result::Result<T, ThemeError>;
