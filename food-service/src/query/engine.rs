//! The query engine
//!
//! [`QueryEngine`] is the single entry point request handlers use. It
//! validates criteria, sort and paging, composes the predicate, and makes one
//! call to the storage primitive per operation.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::query::criteria::{CriteriaSet, Criterion};
use crate::query::error::{QueryError, QueryOperation, QueryResult};
use crate::query::page::{Page, PageRequest};
use crate::query::predicate::{compose, keyword_criteria, ComposedPredicate, CompositionMode};
use crate::query::schema::Record;
use crate::query::sort::{build_sort, SortSpec};
use crate::storage::Storage;

/// Filter, search and paging over one record type
///
/// The engine holds only a shared storage handle and its options; it is cheap
/// to clone and safe to share between concurrent requests.
///
/// # Example
///
/// ```rust
/// use food_service::query::{CriteriaSet, Criterion, PageRequest, QueryEngine};
/// use food_service::records::Order;
/// use food_service::storage::MemoryStorage;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let engine = QueryEngine::new(MemoryStorage::new(vec![
///     Order::new(1, 1, 2, "completed"),
///     Order::new(2, 3, 4, "pending"),
/// ]));
///
/// let criteria = CriteriaSet::new().with(Criterion::equals("status", "pending"));
/// let sort = engine.sort(&["id"], &["desc"]).unwrap();
/// let page = engine
///     .filter(&criteria, PageRequest::new(0, 10).unwrap(), sort)
///     .await
///     .unwrap();
///
/// assert_eq!(page.total_elements, 1);
/// assert_eq!(page.items[0].id, 2);
/// # }
/// ```
pub struct QueryEngine<R, S> {
    storage: Arc<S>,
    stable_ordering: bool,
    _record: PhantomData<fn() -> R>,
}

impl<R, S> Clone for QueryEngine<R, S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            stable_ordering: self.stable_ordering,
            _record: PhantomData,
        }
    }
}

impl<R, S> std::fmt::Debug for QueryEngine<R, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("stable_ordering", &self.stable_ordering)
            .finish_non_exhaustive()
    }
}

impl<R, S> QueryEngine<R, S>
where
    R: Record,
    S: Storage<R>,
{
    /// Engine owning its storage
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self::from_shared(Arc::new(storage))
    }

    /// Engine over storage shared with other owners
    #[must_use]
    pub fn from_shared(storage: Arc<S>) -> Self {
        Self {
            storage,
            stable_ordering: false,
            _record: PhantomData,
        }
    }

    /// Append `id Asc` to caller sorts that do not already order by `id`
    ///
    /// Without it, rows that tie on every caller key may come back in any order
    /// the store chooses, so they can repeat or go missing across pages.
    #[must_use]
    pub fn with_stable_ordering(mut self, enabled: bool) -> Self {
        self.stable_ordering = enabled;
        self
    }

    /// Whether the identifier tie-breaker is appended
    #[must_use]
    pub fn stable_ordering(&self) -> bool {
        self.stable_ordering
    }

    /// The storage handle
    #[must_use]
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Build a sort specification for this record type
    ///
    /// # Errors
    ///
    /// `UnknownSortField` for undeclared or list-valued fields.
    pub fn sort<F: AsRef<str>, D: AsRef<str>>(
        &self,
        fields: &[F],
        directions: &[D],
    ) -> QueryResult<SortSpec> {
        build_sort(R::KIND, fields, directions)
    }

    /// One page of all records
    ///
    /// # Errors
    ///
    /// `UnknownSortField` for a sort built for another record type, or
    /// `StorageFailure`.
    pub async fn list(&self, page: PageRequest, sort: SortSpec) -> QueryResult<Page<R>> {
        self.run(QueryOperation::List, ComposedPredicate::MatchAll, page, sort)
            .await
    }

    /// One page of records satisfying every criterion
    ///
    /// # Errors
    ///
    /// `InvalidCriterion` or `InvalidRange` before storage is called, or
    /// `StorageFailure`.
    pub async fn filter(
        &self,
        criteria: &CriteriaSet,
        page: PageRequest,
        sort: SortSpec,
    ) -> QueryResult<Page<R>> {
        let predicate = compose(R::KIND.schema(), criteria, CompositionMode::Conjunctive)
            .map_err(|e| e.with_operation(QueryOperation::Filter))?;
        self.run(QueryOperation::Filter, predicate, page, sort).await
    }

    /// One page of records where any keyword-search field contains `keyword`
    ///
    /// # Errors
    ///
    /// `MissingKeyword` for a blank keyword, or `StorageFailure`.
    pub async fn search(
        &self,
        keyword: &str,
        page: PageRequest,
        sort: SortSpec,
    ) -> QueryResult<Page<R>> {
        if keyword.trim().is_empty() {
            return Err(QueryError::missing_keyword().with_entity(R::KIND));
        }
        let schema = R::KIND.schema();
        let predicate = compose(
            schema,
            &keyword_criteria(schema, keyword),
            CompositionMode::Disjunctive,
        )
        .map_err(|e| e.with_operation(QueryOperation::Search))?;
        self.run(QueryOperation::Search, predicate, page, sort).await
    }

    /// The record with the given identifier, if any
    ///
    /// # Errors
    ///
    /// `StorageFailure`.
    pub async fn by_id(&self, id: i64) -> QueryResult<Option<R>> {
        let schema = R::KIND.schema();
        let criteria = CriteriaSet::new().with(Criterion::equals(schema.id_field().name, id));
        let predicate = compose(schema, &criteria, CompositionMode::Conjunctive)
            .map_err(|e| e.with_operation(QueryOperation::ById))?;
        let page = PageRequest::first(1).map_err(|e| e.with_operation(QueryOperation::ById))?;

        let result = self
            .run(QueryOperation::ById, predicate, page, SortSpec::by_id(R::KIND))
            .await?;
        Ok(result.items.into_iter().next())
    }

    async fn run(
        &self,
        operation: QueryOperation,
        predicate: ComposedPredicate,
        page: PageRequest,
        sort: SortSpec,
    ) -> QueryResult<Page<R>> {
        if sort.kind() != R::KIND {
            let field = sort.keys().first().map(|k| k.field.name).unwrap_or("id");
            return Err(QueryError::unknown_sort_field(field)
                .with_entity(R::KIND)
                .with_operation(operation));
        }
        let sort = if self.stable_ordering {
            sort.with_id_tie_breaker()
        } else {
            sort
        };

        tracing::debug!(
            entity = %R::KIND,
            operation = %operation,
            predicate = %predicate,
            sort = %sort,
            page_index = page.index(),
            page_size = page.size(),
            "Executing query"
        );

        let (items, total) = self
            .storage
            .execute(&predicate, &sort, &page)
            .await
            .map_err(|err| {
                tracing::warn!(
                    entity = %R::KIND,
                    operation = %operation,
                    kind = %err.kind,
                    retriable = err.is_retriable(),
                    "Storage failure: {}", err.message
                );
                QueryError::storage_failure(operation, err).with_entity(R::KIND)
            })?;

        Ok(Page::new(items, total, page))
    }
}
