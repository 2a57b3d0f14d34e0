//! API error types for handler operations
//!
//! Structured errors with automatic HTTP status code mapping via `IntoResponse`.
//!
//! # Example
//!
//! ```rust
//! use food_service::handlers::{ApiError, ApiErrorKind};
//!
//! let error = ApiError::not_found("Order", 42);
//! assert!(matches!(error.kind, ApiErrorKind::NotFound));
//! assert_eq!(error.entity_id, Some("42".to_string()));
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::password::PasswordError;
use crate::query::{QueryError, QueryErrorKind, QueryOperation};
use crate::storage::{StorageError, StorageErrorKind};

/// Operation being performed when the API error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Listing entities
    List,
    /// Structured filtering
    Filter,
    /// Keyword or multi-parameter search
    Search,
    /// Getting a single entity by ID
    Get,
    /// Creating a new entity
    Create,
    /// Updating an existing entity
    Update,
    /// Deleting an entity
    Delete,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Filter => write!(f, "filter"),
            Self::Search => write!(f, "search"),
            Self::Get => write!(f, "get"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

impl From<QueryOperation> for ApiOperation {
    fn from(op: QueryOperation) -> Self {
        match op {
            QueryOperation::List => Self::List,
            QueryOperation::Filter => Self::Filter,
            QueryOperation::Search => Self::Search,
            QueryOperation::ById => Self::Get,
        }
    }
}

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Entity was not found
    NotFound,
    /// Entity already exists (conflict)
    AlreadyExists,
    /// Invalid request format or parameters
    BadRequest,
    /// Internal server error
    InternalError,
    /// Service temporarily unavailable
    ServiceUnavailable,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::InternalError => write!(f, "internal_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
        }
    }
}

impl ApiErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyExists => StatusCode::CONFLICT,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error code string for this error kind
    #[must_use]
    pub fn error_code(&self) -> String {
        format!("{}", self).to_uppercase()
    }
}

/// Structured API error with operation context
///
/// # Example
///
/// ```rust
/// use food_service::handlers::{ApiError, ApiOperation};
///
/// let error = ApiError::bad_request("Query parameter 'page' must be a number")
///     .with_operation(ApiOperation::Search);
/// assert_eq!(
///     error.to_string(),
///     "API bad_request error during search: Query parameter 'page' must be a number"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The operation being performed when the error occurred
    pub operation: ApiOperation,
    /// The category of error
    pub kind: ApiErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable code; defaults to the kind's code
    pub code: Option<String>,
    /// The type of entity involved (e.g., "Order", "Product")
    pub entity_type: Option<String>,
    /// The ID of the entity involved
    pub entity_id: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(operation: ApiOperation, kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            code: None,
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl ToString) -> Self {
        Self::new(ApiOperation::Get, ApiErrorKind::NotFound, "Entity not found")
            .with_entity(entity_type, entity_id.to_string())
    }

    /// Create an "already exists" error
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Create, ApiErrorKind::AlreadyExists, message)
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::List, ApiErrorKind::BadRequest, message)
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::List, ApiErrorKind::InternalError, message)
    }

    /// Create a service unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::List, ApiErrorKind::ServiceUnavailable, message)
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Name the entity type without a specific entity
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: ApiOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Replace the kind-derived error code
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// The code sent in the response body
    pub fn error_code(&self) -> String {
        self.code.clone().unwrap_or_else(|| self.kind.error_code())
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    pub fn is_retriable(&self) -> bool {
        matches!(self.kind, ApiErrorKind::ServiceUnavailable)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.entity_type, &self.entity_id) {
            (Some(entity_type), Some(entity_id)) => write!(f, " [{}: {}]", entity_type, entity_id),
            (Some(entity_type), None) => write!(f, " [{}]", entity_type),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for ApiError {}

/// Response body for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub code: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();
        let code = self.error_code();

        match self.kind {
            ApiErrorKind::InternalError | ApiErrorKind::ServiceUnavailable => tracing::error!(
                operation = %self.operation,
                kind = %self.kind,
                entity_type = ?self.entity_type,
                entity_id = ?self.entity_id,
                retriable = self.is_retriable(),
                "API error: {}", self.message
            ),
            ApiErrorKind::NotFound | ApiErrorKind::AlreadyExists | ApiErrorKind::BadRequest => tracing::debug!(
                operation = %self.operation,
                kind = %self.kind,
                entity_type = ?self.entity_type,
                entity_id = ?self.entity_id,
                "API error: {}", self.message
            ),
        }

        let response = ApiErrorResponse {
            error: self.message,
            code,
            status: status.as_u16(),
            operation: Some(self.operation.to_string()),
            entity_type: self.entity_type,
            entity_id: self.entity_id,
        };

        (status, Json(response)).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        let operation = ApiOperation::from(err.operation);

        let kind = if err.is_validation() {
            ApiErrorKind::BadRequest
        } else if err.is_retriable() {
            ApiErrorKind::ServiceUnavailable
        } else {
            ApiErrorKind::InternalError
        };

        // Storage details stay in the logs
        let message = match kind {
            ApiErrorKind::ServiceUnavailable => "Service temporarily unavailable".to_string(),
            ApiErrorKind::InternalError => "An internal error occurred".to_string(),
            ApiErrorKind::NotFound | ApiErrorKind::AlreadyExists | ApiErrorKind::BadRequest => {
                err.message
            }
        };

        let code = match err.kind {
            QueryErrorKind::StorageFailure => None,
            other => Some(other.to_string().to_uppercase()),
        };

        Self {
            operation,
            kind,
            message,
            code,
            entity_type: err.entity.map(|e| e.type_name().to_string()),
            entity_id: None,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let kind = match err.kind {
            StorageErrorKind::NotFound => ApiErrorKind::NotFound,
            StorageErrorKind::AlreadyExists => ApiErrorKind::AlreadyExists,
            _ if err.is_retriable() => ApiErrorKind::ServiceUnavailable,
            _ => ApiErrorKind::InternalError,
        };

        let message = match kind {
            ApiErrorKind::ServiceUnavailable => "Service temporarily unavailable".to_string(),
            ApiErrorKind::InternalError => "An internal error occurred".to_string(),
            ApiErrorKind::NotFound | ApiErrorKind::AlreadyExists | ApiErrorKind::BadRequest => {
                err.message
            }
        };

        Self::new(ApiOperation::Get, kind, message)
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort(_) => {
                Self::bad_request(err.to_string()).with_code("VALIDATION_FAILED")
            }
            other => {
                tracing::error!("Password hashing failed: {}", other);
                Self::internal("An internal error occurred")
            }
        }
    }
}
