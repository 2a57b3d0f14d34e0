//! Query engine error types
//!
//! Every failure the engine can report is a [`QueryError`] carrying the
//! operation that was running, a [`QueryErrorKind`], and optional entity and
//! field context. All kinds except [`QueryErrorKind::StorageFailure`] are
//! raised before storage is consulted.
//!
//! # Example
//!
//! ```rust
//! use food_service::query::{QueryError, QueryErrorKind, QueryOperation};
//!
//! let error = QueryError::invalid_range("price", 20.0, 5.0);
//! assert_eq!(error.kind, QueryErrorKind::InvalidRange);
//! assert!(error.is_validation());
//! ```

use std::fmt;

use crate::query::schema::EntityKind;
use crate::storage::StorageError;

/// Engine operation that was running when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOperation {
    /// Unfiltered listing
    List,
    /// Conjunctive structured filter
    Filter,
    /// Disjunctive keyword search
    Search,
    /// Single entity lookup by identifier
    ById,
}

impl fmt::Display for QueryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Filter => write!(f, "filter"),
            Self::Search => write!(f, "search"),
            Self::ById => write!(f, "by_id"),
        }
    }
}

/// Category of query error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryErrorKind {
    /// Criterion names an undeclared field or carries a mismatched value
    InvalidCriterion,
    /// Range criterion with a lower bound above its upper bound
    InvalidRange,
    /// Sort key names an undeclared or non-sortable field
    UnknownSortField,
    /// Keyword search without a usable keyword
    MissingKeyword,
    /// Negative page index or page size below one
    InvalidPage,
    /// The storage collaborator failed
    StorageFailure,
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCriterion => write!(f, "invalid_criterion"),
            Self::InvalidRange => write!(f, "invalid_range"),
            Self::UnknownSortField => write!(f, "unknown_sort_field"),
            Self::MissingKeyword => write!(f, "missing_keyword"),
            Self::InvalidPage => write!(f, "invalid_page"),
            Self::StorageFailure => write!(f, "storage_failure"),
        }
    }
}

/// Structured query error with operation context
///
/// # Example
///
/// ```rust
/// use food_service::query::{EntityKind, QueryError, QueryOperation};
///
/// let error = QueryError::unknown_sort_field("colour")
///     .with_entity(EntityKind::Product)
///     .with_operation(QueryOperation::Filter);
/// println!("{}", error); // "Query unknown_sort_field error during filter: ... [product.colour]"
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryError {
    /// The operation being performed when the error occurred
    pub operation: QueryOperation,
    /// The category of error
    pub kind: QueryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The entity kind the query targeted
    pub entity: Option<EntityKind>,
    /// The field the failing criterion or sort key referred to
    pub field: Option<String>,
    /// Underlying storage failure, for [`QueryErrorKind::StorageFailure`]
    pub source: Option<StorageError>,
}

impl QueryError {
    /// Create a new query error
    pub fn new(operation: QueryOperation, kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity: None,
            field: None,
            source: None,
        }
    }

    /// Criterion refers to a field the entity kind does not declare
    pub fn undeclared_field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("Field '{field}' is not declared for this entity"),
            field: Some(field),
            ..Self::new(
                QueryOperation::Filter,
                QueryErrorKind::InvalidCriterion,
                String::new(),
            )
        }
    }

    /// Criterion value or operator does not fit the field's declared type
    pub fn invalid_criterion(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::new(
                QueryOperation::Filter,
                QueryErrorKind::InvalidCriterion,
                message,
            )
        }
    }

    /// Range with `low > high`
    pub fn invalid_range(field: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::new(
                QueryOperation::Filter,
                QueryErrorKind::InvalidRange,
                format!("Lower bound {low} is greater than upper bound {high}"),
            )
        }
    }

    /// Sort key names a field that cannot be sorted on
    pub fn unknown_sort_field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("Cannot sort by '{field}'"),
            field: Some(field),
            ..Self::new(
                QueryOperation::List,
                QueryErrorKind::UnknownSortField,
                String::new(),
            )
        }
    }

    /// Keyword search called with a blank keyword
    pub fn missing_keyword() -> Self {
        Self::new(
            QueryOperation::Search,
            QueryErrorKind::MissingKeyword,
            "Keyword must not be blank",
        )
    }

    /// Page index or size out of range
    pub fn invalid_page(message: impl Into<String>) -> Self {
        Self::new(QueryOperation::List, QueryErrorKind::InvalidPage, message)
    }

    /// Wrap a storage failure
    pub fn storage_failure(operation: QueryOperation, source: StorageError) -> Self {
        Self {
            source: Some(source.clone()),
            ..Self::new(
                operation,
                QueryErrorKind::StorageFailure,
                source.message,
            )
        }
    }

    /// Attach the entity kind the query targeted
    #[must_use]
    pub fn with_entity(mut self, entity: EntityKind) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: QueryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Whether the error was raised by input validation, before storage ran
    pub fn is_validation(&self) -> bool {
        !matches!(self.kind, QueryErrorKind::StorageFailure)
    }

    /// Check if this error is retriable (transient storage failures)
    ///
    /// # Example
    ///
    /// ```rust
    /// use food_service::query::{QueryError, QueryOperation};
    /// use food_service::storage::StorageError;
    ///
    /// let error = QueryError::storage_failure(
    ///     QueryOperation::List,
    ///     StorageError::timeout("statement timed out"),
    /// );
    /// assert!(error.is_retriable());
    /// assert!(!QueryError::missing_keyword().is_retriable());
    /// ```
    pub fn is_retriable(&self) -> bool {
        self.source.as_ref().is_some_and(StorageError::is_retriable)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Query {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.entity, &self.field) {
            (Some(entity), Some(field)) => write!(f, " [{entity}.{field}]")?,
            (Some(entity), None) => write!(f, " [{entity}]")?,
            (None, Some(field)) => write!(f, " [{field}]")?,
            (None, None) => {}
        }
        Ok(())
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

/// Result type for query engine operations
pub type QueryResult<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_operation_display() {
        assert_eq!(format!("{}", QueryOperation::List), "list");
        assert_eq!(format!("{}", QueryOperation::Filter), "filter");
        assert_eq!(format!("{}", QueryOperation::Search), "search");
        assert_eq!(format!("{}", QueryOperation::ById), "by_id");
    }

    #[test]
    fn test_query_error_kind_display() {
        assert_eq!(
            format!("{}", QueryErrorKind::InvalidCriterion),
            "invalid_criterion"
        );
        assert_eq!(format!("{}", QueryErrorKind::InvalidRange), "invalid_range");
        assert_eq!(
            format!("{}", QueryErrorKind::UnknownSortField),
            "unknown_sort_field"
        );
        assert_eq!(
            format!("{}", QueryErrorKind::MissingKeyword),
            "missing_keyword"
        );
        assert_eq!(format!("{}", QueryErrorKind::InvalidPage), "invalid_page");
        assert_eq!(
            format!("{}", QueryErrorKind::StorageFailure),
            "storage_failure"
        );
    }

    #[test]
    fn test_undeclared_field() {
        let error = QueryError::undeclared_field("colour");
        assert_eq!(error.kind, QueryErrorKind::InvalidCriterion);
        assert_eq!(error.field.as_deref(), Some("colour"));
        assert!(error.message.contains("colour"));
    }

    #[test]
    fn test_invalid_range_message() {
        let error = QueryError::invalid_range("price", 20.0, 5.0);
        assert_eq!(error.kind, QueryErrorKind::InvalidRange);
        assert_eq!(error.operation, QueryOperation::Filter);
        assert!(error.message.contains("20"));
        assert!(error.message.contains('5'));
    }

    #[test]
    fn test_with_operation_and_entity() {
        let error = QueryError::invalid_range("price", 2.0, 1.0)
            .with_operation(QueryOperation::Search)
            .with_entity(EntityKind::Product);
        assert_eq!(error.operation, QueryOperation::Search);
        assert_eq!(error.entity, Some(EntityKind::Product));
    }

    #[test]
    fn test_validation_kinds() {
        assert!(QueryError::missing_keyword().is_validation());
        assert!(QueryError::invalid_page("size must be positive").is_validation());
        assert!(QueryError::unknown_sort_field("x").is_validation());

        let storage = QueryError::storage_failure(
            QueryOperation::List,
            StorageError::query_failed("syntax error"),
        );
        assert!(!storage.is_validation());
        assert!(!storage.is_retriable());
    }

    #[test]
    fn test_storage_failure_keeps_source() {
        let error = QueryError::storage_failure(
            QueryOperation::ById,
            StorageError::connection_failed("refused"),
        );
        assert_eq!(error.kind, QueryErrorKind::StorageFailure);
        assert_eq!(error.message, "refused");
        assert!(error.is_retriable());
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_display_with_context() {
        let error = QueryError::unknown_sort_field("colour").with_entity(EntityKind::Product);
        let display = format!("{}", error);
        assert!(display.contains("unknown_sort_field"));
        assert!(display.contains("list"));
        assert!(display.contains("[product.colour]"));
    }

    #[test]
    fn test_display_without_context() {
        let display = format!("{}", QueryError::missing_keyword());
        assert!(display.contains("missing_keyword"));
        assert!(!display.contains('['));
    }
}
