//! Composable filter-and-pagination query engine
//!
//! This module turns optional, request-time criteria into a single composed
//! query over one entity kind, applies a multi-key sort, and returns one page
//! of results with total-count metadata.
//!
//! # Overview
//!
//! - [`Criterion`] / [`CriteriaSet`]: the tests a request asks for
//! - [`compose`]: validates criteria against an [`EntitySchema`] and folds them
//!   into a [`ComposedPredicate`], conjunctively or disjunctively
//! - [`build_sort`]: positional field and direction lists into a [`SortSpec`]
//! - [`PageRequest`] / [`Page`]: validated paging input and paged output
//! - [`QueryEngine`]: list, filter, search and by-id over a
//!   [`Storage`](crate::storage::Storage) collaborator
//!
//! # Example
//!
//! ```rust
//! use food_service::query::{CriteriaSet, Criterion, PageRequest, QueryEngine};
//! use food_service::records::Product;
//! use food_service::storage::MemoryStorage;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let engine: QueryEngine<Product, _> = QueryEngine::new(MemoryStorage::new(Vec::new()));
//!
//! let criteria = CriteriaSet::new()
//!     .with(Criterion::between("price", 4.0, 9.5))
//!     .with(Criterion::equals("available", true));
//! let sort = engine.sort(&["price", "name"], &["desc"]).unwrap();
//!
//! let page = engine
//!     .filter(&criteria, PageRequest::new(0, 10).unwrap(), sort)
//!     .await
//!     .unwrap();
//! assert!(page.is_empty());
//! # }
//! ```

mod criteria;
mod engine;
mod error;
mod page;
mod predicate;
mod schema;
mod sort;

pub use criteria::{CriteriaSet, Criterion, Operator, Value};
pub use engine::QueryEngine;
pub use error::{QueryError, QueryErrorKind, QueryOperation, QueryResult};
pub use page::{Page, PageRequest};
pub use predicate::{compose, keyword_criteria, ComposedPredicate, CompositionMode, Predicate};
pub use schema::{Column, EntityKind, EntitySchema, FieldDef, FieldType, FieldValue, Record};
pub use sort::{build_sort, SortDirection, SortKey, SortSpec};
