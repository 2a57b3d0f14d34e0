//! Storage error types

use std::fmt;

/// Category of storage failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageErrorKind {
    /// Could not reach the store
    ConnectionFailed,
    /// The store did not answer in time
    Timeout,
    /// The statement was rejected or failed while running
    QueryFailed,
    /// A returned row could not be decoded
    Serialization,
    /// No record has the requested identifier
    NotFound,
    /// A record already holds a value that must be unique
    AlreadyExists,
    /// Other unclassified error
    Other,
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::QueryFailed => write!(f, "query_failed"),
            Self::Serialization => write!(f, "serialization"),
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured storage error
///
/// # Example
///
/// ```rust
/// use food_service::storage::{StorageError, StorageErrorKind};
///
/// let error = StorageError::connection_failed("connection refused")
///     .with_context("products");
/// assert_eq!(error.kind, StorageErrorKind::ConnectionFailed);
/// assert!(error.is_retriable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    /// The category of error
    pub kind: StorageErrorKind,
    /// Human-readable error message
    pub message: String,
    /// What was being read when the error occurred, such as a table name
    pub context: Option<String>,
}

impl StorageError {
    /// Create a new storage error
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
        }
    }

    /// The store could not be reached
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::ConnectionFailed, message)
    }

    /// The store did not answer in time
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Timeout, message)
    }

    /// The statement failed
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::QueryFailed, message)
    }

    /// A row could not be decoded
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Serialization, message)
    }

    /// No record has the identifier
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::NotFound, message)
    }

    /// A unique value is already taken
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::AlreadyExists, message)
    }

    /// Anything else
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Other, message)
    }

    /// Attach what was being read
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Transient failures that may succeed on retry
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            StorageErrorKind::ConnectionFailed | StorageErrorKind::Timeout
        )
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Storage {} error: {}", self.kind, self.message)?;
        if let Some(ref context) = self.context {
            write!(f, " [{}]", context)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {}

#[cfg(feature = "database")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error;
        let message = err.to_string();
        match err {
            Error::Io(_) | Error::Tls(_) | Error::PoolClosed | Error::WorkerCrashed => {
                Self::connection_failed(message)
            }
            Error::PoolTimedOut => Self::timeout(message),
            Error::RowNotFound => Self::not_found(message),
            Error::ColumnDecode { .. } | Error::Decode(_) | Error::ColumnNotFound(_) => {
                Self::serialization(message)
            }
            Error::Database(db) if db.code().as_deref() == Some("57014") => {
                Self::timeout(message)
            }
            Error::Database(db) if db.is_unique_violation() => Self::already_exists(message),
            Error::Database(_) => Self::query_failed(message),
            _ => Self::other(message),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;
