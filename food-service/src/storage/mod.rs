//! Storage collaborators
//!
//! The query engine reaches storage through exactly one primitive,
//! [`Storage::execute`]: given a composed predicate, a sort specification and
//! a page request, return the rows on that page together with the total
//! number of matching rows. [`Repository`] adds create, update and delete for
//! [`Writable`] record kinds.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryStorage`] evaluates the predicate in process; it backs tests and
//!   embedders that hold their records in memory
//! - `PgStorage` (feature `database`) renders the query as parameterised
//!   PostgreSQL

mod error;
mod memory;
#[cfg(feature = "database")]
mod postgres;
mod repository;

use std::future::Future;

pub use error::{StorageError, StorageErrorKind, StorageResult};
pub use memory::MemoryStorage;
#[cfg(feature = "database")]
pub use postgres::PgStorage;
pub use repository::{Repository, Writable};

use crate::query::{ComposedPredicate, PageRequest, Record, SortSpec};

/// Executes composed queries for one record type
///
/// # Example
///
/// ```rust,ignore
/// use food_service::query::{ComposedPredicate, PageRequest, SortSpec};
/// use food_service::storage::{Storage, StorageResult};
///
/// struct ArchiveStorage { /* ... */ }
///
/// impl Storage<Order> for ArchiveStorage {
///     async fn execute(
///         &self,
///         predicate: &ComposedPredicate,
///         sort: &SortSpec,
///         page: &PageRequest,
///     ) -> StorageResult<(Vec<Order>, u64)> {
///         // Fetch matching rows and the total count
///         todo!()
///     }
/// }
/// ```
pub trait Storage<R: Record>: Send + Sync {
    /// Return the rows on the requested page and the total matching count
    fn execute(
        &self,
        predicate: &ComposedPredicate,
        sort: &SortSpec,
        page: &PageRequest,
    ) -> impl Future<Output = StorageResult<(Vec<R>, u64)>> + Send;
}
