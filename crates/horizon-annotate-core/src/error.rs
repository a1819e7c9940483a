//! Error types for the core crate.

use std::fmt;

/// The main error type for core operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Store-related error.
    Store(StoreError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(err) => write!(f, "Store error: {err}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// A specialized Result type for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Store-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The state handle is invalid or has been freed.
    InvalidHandle,
    /// A patch was applied to or with a non-object value.
    NotAnObject,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle => write!(f, "Invalid or freed state handle"),
            Self::NotAnObject => {
                write!(f, "Patch requires both target and patch to be JSON objects")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// A specialized Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
