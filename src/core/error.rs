use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Record '{0}' already exists in table '{1}'")]
    AlreadyExists(String, String),

    #[error("Record '{0}' not found in table '{1}'")]
    NotFound(String, String),

    #[error("Write to table '{0}' requires a non-empty key")]
    MissingKey(String),

    #[error("No writable columns for table '{0}'")]
    NoColumns(String),

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Write rejections the caller can act on, as opposed to configuration
    /// faults and backing-store failures.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists(..) | Self::NotFound(..) | Self::MissingKey(_) | Self::NoColumns(_)
        )
    }
}

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::ConstraintViolation(message.unwrap_or_else(|| code.to_string()))
            }
            other => Self::ExecutionError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for StorageError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for StorageError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
